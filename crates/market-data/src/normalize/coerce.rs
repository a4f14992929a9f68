// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Lenient JSON field coercion
//!
//! Upstream providers disagree on whether numbers are JSON numbers or
//! strings, and rename keys between API versions. [`FieldReader`] reads a
//! field from a list of candidate keys, coerces it, and falls back to a
//! default while remembering which fields had to be defaulted.

use serde_json::{Map, Value};

use super::Normalized;
use crate::error::SchemaMismatch;

/// Coerce a JSON number or numeric string into a finite float
pub fn as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Coerce into a non-negative finite float
pub fn as_non_negative(value: &Value) -> Option<f64> {
    as_f64(value).filter(|n| *n >= 0.0)
}

/// Coerce into an unsigned integer, rounding fractional values
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn as_u64(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let number = as_non_negative(value)?.round();
    (number <= u64::MAX as f64).then_some(number as u64)
}

/// Coerce into a `u32`, rounding fractional values
pub fn as_u32(value: &Value) -> Option<u32> {
    as_u64(value).and_then(|n| u32::try_from(n).ok())
}

/// Coerce into a signed integer, rounding fractional values
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn as_i64(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let number = as_f64(value)?.round();
    (number.abs() <= i64::MAX as f64).then_some(number as i64)
}

/// Non-blank string value
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Round to two decimal places, `None` when the result is not finite
pub fn round2(value: f64) -> Option<f64> {
    let rounded = (value * 100.0).round() / 100.0;
    rounded.is_finite().then_some(rounded)
}

/// Borrow a JSON object or report the wrong shape
///
/// # Errors
///
/// Returns [`SchemaMismatch::WrongShape`] when `value` is not an object
pub fn expect_object<'a>(
    value: &'a Value,
    path: &str,
) -> Result<&'a Map<String, Value>, SchemaMismatch> {
    value.as_object().ok_or_else(|| SchemaMismatch::WrongShape {
        path: path.to_string(),
        expected: "object",
    })
}

/// Borrow a JSON array or report the wrong shape
///
/// # Errors
///
/// Returns [`SchemaMismatch::WrongShape`] when `value` is not an array
pub fn expect_array<'a>(value: &'a Value, path: &str) -> Result<&'a [Value], SchemaMismatch> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| SchemaMismatch::WrongShape {
            path: path.to_string(),
            expected: "array",
        })
}

/// Locate the item array of a list response
///
/// Accepts a top-level array or an object wrapping it under `results`,
/// `data` or `items`.
///
/// # Errors
///
/// Returns [`SchemaMismatch::WrongShape`] when no item array is found
pub fn list_items(value: &Value) -> Result<&[Value], SchemaMismatch> {
    if let Some(items) = value.as_array() {
        return Ok(items);
    }
    ["results", "data", "items"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .ok_or_else(|| SchemaMismatch::WrongShape {
            path: "$".to_string(),
            expected: "array or object with results",
        })
}

/// Reads fields of one JSON object, tracking reads and defaults
#[derive(Debug)]
pub struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    read: usize,
    defaulted: Vec<&'static str>,
}

impl<'a> FieldReader<'a> {
    /// Wrap a JSON object
    pub fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            object,
            read: 0,
            defaulted: Vec::new(),
        }
    }

    /// Wrap `value`, which must be an object
    ///
    /// # Errors
    ///
    /// Returns [`SchemaMismatch::WrongShape`] when `value` is not an object
    pub fn object(value: &'a Value, path: &str) -> Result<Self, SchemaMismatch> {
        expect_object(value, path).map(Self::new)
    }

    /// First non-null value among the candidate keys
    pub fn lookup(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .find_map(|key| self.object.get(*key).filter(|v| !v.is_null()))
    }

    /// Read and coerce a field, substituting `default` when absent or invalid
    pub fn take<T>(
        &mut self,
        field: &'static str,
        keys: &[&str],
        default: T,
        coerce: impl Fn(&Value) -> Option<T>,
    ) -> T {
        match self.lookup(keys).and_then(coerce) {
            Some(value) => {
                self.read += 1;
                value
            }
            None => {
                self.defaulted.push(field);
                default
            }
        }
    }

    /// Count a field that was read outside of [`Self::take`]
    pub fn record_read(&mut self) {
        self.read += 1;
    }

    /// Note a field that was defaulted outside of [`Self::take`]
    pub fn record_default(&mut self, field: &'static str) {
        self.defaulted.push(field);
    }

    /// Number of fields read successfully so far
    pub fn read_count(&self) -> usize {
        self.read
    }

    /// Fields defaulted so far, consuming the reader
    pub fn into_defaulted(self) -> Vec<&'static str> {
        self.defaulted
    }

    /// Finish the part
    ///
    /// # Errors
    ///
    /// Returns [`SchemaMismatch::Unreadable`] when no field could be read
    pub fn finish<T>(self, part: &'static str, value: T) -> Result<Normalized<T>, SchemaMismatch> {
        if self.read == 0 {
            return Err(SchemaMismatch::Unreadable { part });
        }
        Ok(Normalized {
            value,
            defaulted: self.defaulted,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_and_numeric_strings() {
        assert_eq!(as_f64(&json!(1.5)), Some(1.5));
        assert_eq!(as_f64(&json!(" 2.25 ")), Some(2.25));
        assert_eq!(as_f64(&json!("NaN")), None);
        assert_eq!(as_f64(&json!("inf")), None);
        assert_eq!(as_f64(&json!("abc")), None);
        assert_eq!(as_f64(&json!(null)), None);
        assert_eq!(as_f64(&json!([1])), None);
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(as_u64(&json!(42)), Some(42));
        assert_eq!(as_u64(&json!("41.6")), Some(42));
        assert_eq!(as_u64(&json!(-1)), None);
        assert_eq!(as_u32(&json!(5_000_000_000_u64)), None);
        assert_eq!(as_i64(&json!(-7)), Some(-7));
        assert_eq!(as_i64(&json!("1730000000")), Some(1_730_000_000));
    }

    #[test]
    fn text_coercion() {
        assert_eq!(as_text(&json!("  ORDI ")), Some("ORDI".to_string()));
        assert_eq!(as_text(&json!("   ")), None);
        assert_eq!(as_text(&json!(1200)), Some("1200".to_string()));
        assert_eq!(as_text(&json!(true)), None);
    }

    #[test]
    fn round_two_places() {
        assert!((round2(29.960_317).unwrap() - 29.96).abs() < f64::EPSILON);
        assert!((round2(-1.284).unwrap() - -1.28).abs() < f64::EPSILON);
        assert_eq!(round2(f64::MAX), None);
        assert_eq!(round2(f64::NAN), None);
    }

    #[test]
    fn list_item_locations() {
        assert_eq!(list_items(&json!([1, 2])).unwrap().len(), 2);
        assert_eq!(list_items(&json!({"results": [1]})).unwrap().len(), 1);
        assert_eq!(list_items(&json!({"data": []})).unwrap().len(), 0);
        assert!(list_items(&json!({"count": 3})).is_err());
        assert!(list_items(&json!("nope")).is_err());
    }

    #[test]
    fn reader_tracks_defaults() {
        let raw = json!({"a": "3", "b": null, "c": "x"});
        let mut reader = FieldReader::object(&raw, "$").unwrap();

        assert_eq!(reader.take("a", &["a"], 0, as_u64), 3);
        assert_eq!(reader.take("b", &["b", "a"], 0, as_u64), 3);
        assert_eq!(reader.take("c", &["c"], 9, as_u64), 9);
        assert_eq!(reader.read_count(), 2);

        let normalized = reader.finish("test", ()).unwrap();
        assert_eq!(normalized.defaulted, vec!["c"]);
    }

    #[test]
    fn reader_with_nothing_read_is_unreadable() {
        let raw = json!({"unrelated": 1});
        let mut reader = FieldReader::object(&raw, "$").unwrap();
        let _ = reader.take("a", &["a"], 0, as_u64);

        assert_eq!(
            reader.finish("test", ()),
            Err(SchemaMismatch::Unreadable { part: "test" })
        );
        assert!(FieldReader::object(&json!([]), "$").is_err());
    }
}
