//! Bind parameter value representation.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use super::DataType;

/// A single named-parameter value.
///
/// `ParamValue` is the canonical parameter representation on the template
/// boundary: callers build a flat or nested map of these once, and the core
/// never needs runtime type introspection. Nested [`ParamValue::Map`] values
/// support dotted-path lookup (`emp.name`) in IF conditions and bind
/// directives; [`ParamValue::List`] values feed parenthesized IN-clause
/// expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    Utf8(String),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time, no timezone
    Timestamp(NaiveDateTime),
    /// List of values (IN-clause expansion)
    List(Vec<ParamValue>),
    /// Nested named fields (dotted-path traversal)
    Map(HashMap<String, ParamValue>),
}

impl ParamValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// Get the data type tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            ParamValue::Null => DataType::Null,
            ParamValue::Boolean(_) => DataType::Boolean,
            ParamValue::Int64(_) => DataType::Int64,
            ParamValue::Float64(_) => DataType::Float64,
            ParamValue::Utf8(_) => DataType::Utf8,
            ParamValue::Date(_) => DataType::Date,
            ParamValue::Timestamp(_) => DataType::Timestamp,
            ParamValue::List(_) => DataType::List,
            ParamValue::Map(_) => DataType::Map,
        }
    }

    /// The literal form used in diagnostic SQL: numbers render bare, null
    /// renders as the bare word `null`, everything else is single-quoted.
    pub fn literal(&self) -> String {
        match self {
            ParamValue::Null => "null".to_string(),
            ParamValue::Int64(v) => v.to_string(),
            ParamValue::Float64(v) => v.to_string(),
            _ => format!("'{}'", self.raw_text()),
        }
    }

    /// The unquoted string form, used for embedded-literal substitution.
    pub fn raw_text(&self) -> String {
        match self {
            ParamValue::Null => String::new(),
            ParamValue::Boolean(v) => v.to_string(),
            ParamValue::Int64(v) => v.to_string(),
            ParamValue::Float64(v) => v.to_string(),
            ParamValue::Utf8(v) => v.clone(),
            ParamValue::Date(v) => v.to_string(),
            ParamValue::Timestamp(v) => v.to_string(),
            ParamValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.raw_text()).collect();
                parts.join(", ")
            }
            ParamValue::Map(_) => String::new(),
        }
    }

    /// Convert a JSON value into a parameter value.
    ///
    /// JSON objects become [`ParamValue::Map`] (dotted-path addressable) and
    /// arrays become [`ParamValue::List`]. Integral JSON numbers map to
    /// `Int64`, everything else to `Float64`.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => ParamValue::Null,
            JsonValue::Bool(b) => ParamValue::Boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::Int64(i)
                } else {
                    ParamValue::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => ParamValue::Utf8(s.clone()),
            JsonValue::Array(items) => {
                ParamValue::List(items.iter().map(ParamValue::from_json).collect())
            }
            JsonValue::Object(map) => ParamValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), ParamValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Look up a field of a [`ParamValue::Map`] value.
    ///
    /// Returns `None` for non-map values and missing fields; dotted-path
    /// traversal treats both as a null result rather than an error.
    pub fn field(&self, name: &str) -> Option<&ParamValue> {
        match self {
            ParamValue::Map(fields) => fields.get(name),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.literal())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Boolean(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int64(v as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int64(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float64(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Utf8(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Utf8(v)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(v: NaiveDate) -> Self {
        ParamValue::Date(v)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(v: NaiveDateTime) -> Self {
        ParamValue::Timestamp(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => ParamValue::Null,
        }
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(v: Vec<T>) -> Self {
        ParamValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<HashMap<String, ParamValue>> for ParamValue {
    fn from(v: HashMap<String, ParamValue>) -> Self {
        ParamValue::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_quoting() {
        assert_eq!(ParamValue::Int64(42).literal(), "42");
        assert_eq!(ParamValue::Float64(1.5).literal(), "1.5");
        assert_eq!(ParamValue::Utf8("CLARK".into()).literal(), "'CLARK'");
        assert_eq!(ParamValue::Boolean(true).literal(), "'true'");
        assert_eq!(ParamValue::Null.literal(), "null");
    }

    #[test]
    fn test_raw_text() {
        assert_eq!(ParamValue::Utf8("DESC".into()).raw_text(), "DESC");
        assert_eq!(ParamValue::Int64(7).raw_text(), "7");
        assert_eq!(ParamValue::Null.raw_text(), "");
    }

    #[test]
    fn test_from_json() {
        let json: JsonValue =
            serde_json::from_str(r#"{"id": 1, "name": "Bob", "tags": ["a", "b"], "note": null}"#)
                .unwrap();
        let value = ParamValue::from_json(&json);
        assert_eq!(value.field("id"), Some(&ParamValue::Int64(1)));
        assert_eq!(value.field("name"), Some(&ParamValue::Utf8("Bob".into())));
        assert_eq!(
            value.field("tags"),
            Some(&ParamValue::List(vec![
                ParamValue::Utf8("a".into()),
                ParamValue::Utf8("b".into()),
            ]))
        );
        assert_eq!(value.field("note"), Some(&ParamValue::Null));
        assert_eq!(value.field("missing"), None);
    }

    #[test]
    fn test_option_conversion() {
        let some: ParamValue = Some(5i64).into();
        let none: ParamValue = Option::<i64>::None.into();
        assert_eq!(some, ParamValue::Int64(5));
        assert!(none.is_null());
    }
}
