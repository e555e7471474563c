//! Caller-facing named parameter sets.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use super::ParamValue;
use crate::error::{Result, TwoSqlError};

/// A set of named parameters for one render pass.
///
/// # Example
///
/// ```rust
/// use twosql::Params;
///
/// let params = Params::new()
///     .with("job", "CLERK")
///     .with("deptno", 20)
///     .with("names", vec!["CLARK", "FORD"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Params {
    args: HashMap<String, ParamValue>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Add a parameter in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.args.insert(name.into(), value.into());
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.args.get(name)
    }

    /// Number of parameters in the set.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Build a parameter set from a JSON object.
    ///
    /// Each top-level member becomes one named parameter; nested objects
    /// stay addressable through dotted paths.
    pub fn from_json_object(json: &JsonValue) -> Result<Self> {
        match json {
            JsonValue::Object(map) => Ok(Self {
                args: map
                    .iter()
                    .map(|(k, v)| (k.clone(), ParamValue::from_json(v)))
                    .collect(),
            }),
            other => Err(TwoSqlError::invalid_argument(format!(
                "expected a JSON object for parameters, got {}",
                other
            ))),
        }
    }

    /// Iterate over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.args.iter()
    }
}

impl From<HashMap<String, ParamValue>> for Params {
    fn from(args: HashMap<String, ParamValue>) -> Self {
        Self { args }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            args: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let params = Params::new().with("a", 1).with("b", "x");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("a"), Some(&ParamValue::Int64(1)));
        assert_eq!(params.get("b"), Some(&ParamValue::Utf8("x".into())));
        assert_eq!(params.get("c"), None);
    }

    #[test]
    fn test_from_json_object() {
        let json: JsonValue =
            serde_json::from_str(r#"{"deptno": 20, "emp": {"name": "SCOTT"}}"#).unwrap();
        let params = Params::from_json_object(&json).unwrap();
        assert_eq!(params.get("deptno"), Some(&ParamValue::Int64(20)));
        assert_eq!(
            params.get("emp").and_then(|v| v.field("name")),
            Some(&ParamValue::Utf8("SCOTT".into()))
        );
    }

    #[test]
    fn test_from_json_non_object() {
        let json: JsonValue = serde_json::from_str("[1, 2]").unwrap();
        assert!(Params::from_json_object(&json).is_err());
    }
}
