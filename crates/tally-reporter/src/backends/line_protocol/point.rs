//! Measurement points and their line-protocol encoding

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::Tags;

/// A field value; integers carry the `i` suffix on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(#[serde(with = "tally_core::json_float")] f64),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// One line-protocol point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    pub measurement: String,
    #[serde(default)]
    pub tags: Tags,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp: DateTime<Utc>,
}

impl MeasurementPoint {
    pub fn new(measurement: impl Into<String>, tags: Tags, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            tags,
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Encode as `measurement,tag=v field=v timestamp_ns`
    ///
    /// Tags with an empty value are left out; non-finite floats are
    /// dropped since the protocol cannot carry them.
    pub fn to_line(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            if key.is_empty() || value.is_empty() {
                continue;
            }
            let _ = write!(
                line,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            );
        }

        let fields: Vec<String> = self
            .fields
            .iter()
            .filter_map(|(name, value)| {
                let encoded = match value {
                    FieldValue::Integer(v) => format!("{}i", v),
                    FieldValue::Float(v) if v.is_finite() => format!("{}", v),
                    FieldValue::Float(_) => return None,
                };
                Some(format!("{}={}", escape(name, &[',', '=', ' ']), encoded))
            })
            .collect();
        line.push(' ');
        line.push_str(&fields.join(","));

        if let Some(nanos) = self.timestamp.timestamp_nanos_opt() {
            let _ = write!(line, " {}", nanos);
        }
        line
    }
}

fn escape(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
