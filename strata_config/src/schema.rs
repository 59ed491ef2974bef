//! Pluggable validation of merged configuration.
//!
//! The loader treats a schema as an opaque validator owned by the caller: a
//! function from a key-value mapping to a validated mapping. [`KindSchema`]
//! is the standard implementation, declaring an expected [`ValueKind`] per
//! key and coercing string values into that kind.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::convert::ValueKind;
use crate::error::{StrataError, StrataResult};
use crate::load::ConfigMap;

/// Validator over a merged configuration mapping.
pub trait Schema {
    /// Keys the schema declares, used to seed the remote fetch when the
    /// caller does not pass an explicit key set. `None` when the schema does
    /// not expose a field set.
    fn declared_keys(&self) -> Option<Vec<String>> {
        None
    }

    /// Validate (and possibly coerce) the merged mapping.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Validation`] when the mapping is rejected.
    fn validate(&self, values: ConfigMap) -> StrataResult<ConfigMap>;
}

/// Adapter turning a plain function into a [`Schema`] with no declared keys.
pub struct SchemaFn<F>(
    /// The wrapped validation function.
    pub F,
);

impl<F> Schema for SchemaFn<F>
where
    F: Fn(ConfigMap) -> StrataResult<ConfigMap>,
{
    fn validate(&self, values: ConfigMap) -> StrataResult<ConfigMap> {
        (self.0)(values)
    }
}

/// Declares an expected kind per key and coerces strings accordingly.
///
/// Keys absent from the mapping are tolerated; keys the schema does not
/// declare pass through unchanged. A declared key whose value is neither of
/// the declared kind nor a string coercible into it fails validation.
///
/// ```
/// use strata_config::{KindSchema, Schema, ValueKind};
/// use std::collections::BTreeMap;
///
/// let schema = KindSchema::new([("port", ValueKind::Integer)]);
/// let mut values = BTreeMap::new();
/// values.insert("port".to_owned(), serde_json::json!("8080"));
/// let validated = schema.validate(values)?;
/// assert_eq!(validated.get("port"), Some(&serde_json::json!(8080)));
/// # Ok::<(), strata_config::StrataError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct KindSchema {
    fields: BTreeMap<String, ValueKind>,
}

impl KindSchema {
    /// Build a schema from `(key, kind)` pairs.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, ValueKind)>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(key, kind)| (key.into(), kind))
                .collect(),
        }
    }

    fn matches(kind: ValueKind, value: &Value) -> bool {
        match kind {
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Integer => value.is_i64() || value.is_u64(),
            ValueKind::Float => value.is_number(),
            ValueKind::Structured => value.is_object() || value.is_array(),
            ValueKind::Str => value.is_string(),
        }
    }
}

impl Schema for KindSchema {
    fn declared_keys(&self) -> Option<Vec<String>> {
        Some(self.fields.keys().cloned().collect())
    }

    fn validate(&self, values: ConfigMap) -> StrataResult<ConfigMap> {
        let mut validated = ConfigMap::new();
        for (key, value) in values {
            let Some(kind) = self.fields.get(&key) else {
                validated.insert(key, value);
                continue;
            };
            if Self::matches(*kind, &value) {
                validated.insert(key, value);
                continue;
            }
            let coerced = value
                .as_str()
                .and_then(|text| kind.parse(text))
                .ok_or_else(|| StrataError::Validation {
                    key: key.clone(),
                    message: format!("expected {}, got {value}", kind.tag()),
                })?;
            validated.insert(key, coerced);
        }
        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::{KindSchema, Schema, SchemaFn};
    use crate::convert::ValueKind;
    use crate::error::StrataError;
    use crate::load::ConfigMap;

    fn sample() -> KindSchema {
        KindSchema::new([
            ("my_variable", ValueKind::Str),
            ("your_variable", ValueKind::Integer),
        ])
    }

    #[test]
    fn declared_keys_expose_field_set() {
        let keys = sample().declared_keys().unwrap_or_default();
        assert_eq!(keys, vec!["my_variable".to_owned(), "your_variable".to_owned()]);
    }

    #[test]
    fn coerces_strings_into_declared_kinds() -> Result<()> {
        let mut values = ConfigMap::new();
        values.insert("my_variable".to_owned(), json!("something"));
        values.insert("your_variable".to_owned(), json!("4"));
        let validated = sample().validate(values)?;
        assert_eq!(validated.get("your_variable"), Some(&json!(4)));
        Ok(())
    }

    #[test]
    fn undeclared_keys_pass_through() -> Result<()> {
        let mut values = ConfigMap::new();
        values.insert("extra".to_owned(), json!("kept"));
        let validated = sample().validate(values)?;
        assert_eq!(validated.get("extra"), Some(&json!("kept")));
        Ok(())
    }

    #[test]
    fn function_schemas_validate_without_declaring_keys() -> Result<()> {
        let schema = SchemaFn(|values: ConfigMap| {
            if values.contains_key("required") {
                Ok(values)
            } else {
                Err(StrataError::Validation {
                    key: "required".to_owned(),
                    message: "key is missing".to_owned(),
                })
            }
        });
        let validator: &dyn Schema = &schema;
        assert!(validator.declared_keys().is_none());

        let mut values = ConfigMap::new();
        values.insert("required".to_owned(), json!(1));
        let validated = validator.validate(values)?;
        assert_eq!(validated.get("required"), Some(&json!(1)));

        let outcome = validator.validate(ConfigMap::new());
        assert!(matches!(outcome, Err(StrataError::Validation { .. })));
        Ok(())
    }

    #[test]
    fn uncoercible_value_is_rejected() {
        let mut values = ConfigMap::new();
        values.insert("your_variable".to_owned(), json!("not a number"));
        let outcome = sample().validate(values);
        assert!(matches!(outcome, Err(StrataError::Validation { .. })));
    }
}
