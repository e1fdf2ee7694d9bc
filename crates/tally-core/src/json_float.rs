//! Serde helpers for floats that may be NaN or infinite
//!
//! JSON has no literal for non-finite numbers, so they travel as the
//! strings `"NaN"`, `"+Inf"` and `"-Inf"`. Finite values stay numbers.
//! Use the module itself with `#[serde(with = "...")]` on an `f64` field,
//! or one of its submodules for optional and repeated values.

use std::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// An `f64` with a lossless JSON encoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Float(pub f64);

impl Serialize for Float {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value == f64::INFINITY {
            serializer.serialize_str("+Inf")
        } else if value == f64::NEG_INFINITY {
            serializer.serialize_str("-Inf")
        } else {
            serializer.serialize_f64(value)
        }
    }
}

struct FloatVisitor;

impl<'de> Visitor<'de> for FloatVisitor {
    type Value = Float;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or one of \"NaN\", \"+Inf\", \"-Inf\"")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Float, E> {
        Ok(Float(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Float, E> {
        Ok(Float(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Float, E> {
        Ok(Float(value as f64))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Float, E> {
        match value {
            "NaN" => Ok(Float(f64::NAN)),
            "+Inf" | "Inf" => Ok(Float(f64::INFINITY)),
            "-Inf" => Ok(Float(f64::NEG_INFINITY)),
            other => Err(E::invalid_value(Unexpected::Str(other), &self)),
        }
    }

    // serde_json writes non-finite f64 as null
    fn visit_unit<E: de::Error>(self) -> Result<Float, E> {
        Ok(Float(f64::NAN))
    }
}

impl<'de> Deserialize<'de> for Float {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }
}

impl From<f64> for Float {
    fn from(value: f64) -> Self {
        Float(value)
    }
}

impl From<Float> for f64 {
    fn from(value: Float) -> Self {
        value.0
    }
}

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    Float(*value).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Float::deserialize(deserializer).map(f64::from)
}

/// `Option<f64>`
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        value.map(Float).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<Float>::deserialize(deserializer)?.map(f64::from))
    }
}

/// `Vec<f64>`
pub mod vec {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().copied().map(Float))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Float>::deserialize(deserializer)?;
        Ok(values.into_iter().map(f64::from).collect())
    }
}

/// `Option<Vec<(f64, u64)>>`, as used for bucket counts
pub mod option_pairs {
    use super::*;

    pub fn serialize<S: Serializer>(
        pairs: &Option<Vec<(f64, u64)>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        pairs
            .as_ref()
            .map(|pairs| pairs.iter().map(|(b, c)| (Float(*b), *c)).collect::<Vec<_>>())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<(f64, u64)>>, D::Error> {
        let pairs = Option::<Vec<(Float, u64)>>::deserialize(deserializer)?;
        Ok(pairs.map(|pairs| pairs.into_iter().map(|(b, c)| (b.0, c)).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_finite_values_become_strings() {
        assert_eq!(serde_json::to_value(Float(f64::NAN)).unwrap(), json!("NaN"));
        assert_eq!(serde_json::to_value(Float(f64::INFINITY)).unwrap(), json!("+Inf"));
        assert_eq!(serde_json::to_value(Float(f64::NEG_INFINITY)).unwrap(), json!("-Inf"));
        assert_eq!(serde_json::to_value(Float(1.5)).unwrap(), json!(1.5));
    }

    #[test]
    fn test_decoding_accepts_numbers_strings_and_null() {
        let values: Vec<Float> =
            serde_json::from_value(json!([2, 0.25, "NaN", "+Inf", "-Inf", null])).unwrap();
        assert_eq!(values[0], Float(2.0));
        assert_eq!(values[1], Float(0.25));
        assert!(values[2].0.is_nan());
        assert_eq!(values[3], Float(f64::INFINITY));
        assert_eq!(values[4], Float(f64::NEG_INFINITY));
        assert!(values[5].0.is_nan());

        assert!(serde_json::from_value::<Float>(json!("lots")).is_err());
    }
}
