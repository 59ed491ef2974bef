//! Publish targets for resolved configuration.
//!
//! Loading ends by writing every resolved key into a namespace visible to
//! the application. The [`Namespace`] trait is the seam; [`ConfigNamespace`]
//! is the standard map-backed target with typed accessors.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::StrataResult;

/// A target that resolved configuration is published into, key by key.
///
/// Publishing overwrites any prior value for the same key.
pub trait Namespace {
    /// Write `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StrataError::Publish`] when the target cannot accept
    /// the write.
    fn publish(&mut self, key: &str, value: Value) -> StrataResult<()>;
}

impl Namespace for BTreeMap<String, Value> {
    fn publish(&mut self, key: &str, value: Value) -> StrataResult<()> {
        self.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Map-backed configuration namespace with typed accessors.
///
/// ```
/// use strata_config::{ConfigNamespace, Namespace};
///
/// let mut ns = ConfigNamespace::new();
/// ns.publish("PORT", serde_json::json!(8080)).ok();
/// assert_eq!(ns.get_i64("PORT"), Some(8080));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigNamespace {
    values: BTreeMap<String, Value>,
}

impl ConfigNamespace {
    /// Create an empty namespace.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// The raw value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether `key` has been published.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The string stored under `key`, when the value is a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// The integer stored under `key`, when the value is an integer.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// The float stored under `key`, when the value is numeric.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// The boolean stored under `key`, when the value is a boolean.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Number of published keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been published yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over published keys and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl Namespace for ConfigNamespace {
    fn publish(&mut self, key: &str, value: Value) -> StrataResult<()> {
        self.values.insert(key.to_owned(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::{ConfigNamespace, Namespace};

    #[test]
    fn publishes_and_reads_typed_values() -> Result<()> {
        let mut ns = ConfigNamespace::new();
        ns.publish("a", json!(true))?;
        ns.publish("b", json!(1))?;
        ns.publish("c", json!(null))?;
        ns.publish("d", json!("test"))?;

        assert_eq!(ns.get_bool("a"), Some(true));
        assert_eq!(ns.get_i64("b"), Some(1));
        assert_eq!(ns.get("c"), Some(&json!(null)));
        assert_eq!(ns.get_str("d"), Some("test"));
        assert_eq!(ns.len(), 4);
        Ok(())
    }

    #[test]
    fn later_publish_overwrites_earlier() -> Result<()> {
        let mut ns = ConfigNamespace::new();
        ns.publish("key", json!("old"))?;
        ns.publish("key", json!("new"))?;
        assert_eq!(ns.get_str("key"), Some("new"));
        Ok(())
    }
}
