//! Best-effort conversion of raw configuration payloads into typed values.
//!
//! Conversion is a deliberately forgiving operation: a payload that cannot be
//! parsed as the requested type is logged and returned unchanged, so that a
//! single malformed value never aborts configuration resolution. Only the
//! initial ASCII decode of a byte payload is fatal.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::error::{StrataError, StrataResult};

/// A raw payload retrieved from a configuration source, pre-conversion.
///
/// Environment variables arrive as text; the remote backend yields bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Textual payload, used verbatim.
    Text(String),
    /// Byte payload, decoded as ASCII before any conversion rule runs.
    Bytes(Vec<u8>),
}

impl RawValue {
    /// View the payload as text, decoding byte payloads as ASCII.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Decode`] when a byte payload contains
    /// non-ASCII data. This is the one conversion failure that is fatal
    /// rather than best-effort.
    pub fn as_text(&self) -> StrataResult<Cow<'_, str>> {
        match self {
            Self::Text(text) => Ok(Cow::Borrowed(text)),
            Self::Bytes(bytes) => {
                if !bytes.is_ascii() {
                    return Err(StrataError::Decode {
                        value: String::from_utf8_lossy(bytes).into_owned(),
                    });
                }
                std::str::from_utf8(bytes)
                    .map(Cow::Borrowed)
                    .map_err(|_| StrataError::Decode {
                        value: String::from_utf8_lossy(bytes).into_owned(),
                    })
            }
        }
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Target type for a conversion, named by a stable tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueKind {
    /// Exact-token boolean (`true`, `True`, `false`, `False`).
    Boolean,
    /// Base-10 signed integer.
    Integer,
    /// Base-10 floating-point number.
    Float,
    /// A JSON document.
    Structured,
    /// Plain text; conversion is the identity.
    Str,
}

impl ValueKind {
    /// The registry tag naming this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Structured => "structured",
            Self::Str => "string",
        }
    }

    /// Parse `text` as this kind, without the best-effort degradation of
    /// [`ValueConverter::convert_tagged`]; `None` signals a parse failure.
    #[must_use]
    pub fn parse(self, text: &str) -> Option<Value> {
        match self {
            Self::Boolean => convert_boolean(text),
            Self::Integer => convert_integer(text),
            Self::Float => convert_float(text),
            Self::Structured => convert_structured(text),
            Self::Str => convert_string(text),
        }
    }

    /// Look a kind up by its registry tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "structured" => Some(Self::Structured),
            "string" => Some(Self::Str),
            _ => None,
        }
    }
}

/// Capability interface for value conversion, so resolvers can be handed
/// alternative converter implementations.
pub trait Convert {
    /// Convert `raw` into the requested kind, degrading to the decoded text
    /// on failure.
    ///
    /// # Errors
    ///
    /// Returns an error only when a byte payload is not ASCII text.
    fn convert(&self, raw: &RawValue, kind: Option<ValueKind>) -> StrataResult<Value>;
}

/// A conversion rule: parses text into a typed value, or `None` on failure.
type ConvertRule = fn(&str) -> Option<Value>;

fn convert_boolean(text: &str) -> Option<Value> {
    match text {
        "true" | "True" => Some(Value::Bool(true)),
        "false" | "False" => Some(Value::Bool(false)),
        _ => None,
    }
}

fn convert_integer(text: &str) -> Option<Value> {
    text.parse::<i64>().ok().map(Value::from)
}

fn convert_float(text: &str) -> Option<Value> {
    let parsed = text.parse::<f64>().ok()?;
    serde_json::Number::from_f64(parsed).map(Value::Number)
}

fn convert_structured(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

fn convert_string(text: &str) -> Option<Value> {
    Some(Value::String(text.to_owned()))
}

/// The standard converter, dispatching through an explicit rule registry.
///
/// Requesting a tag with no registered rule is not an error: the value is
/// returned unchanged and the unknown tag is logged.
#[derive(Debug, Clone)]
pub struct ValueConverter {
    rules: BTreeMap<&'static str, ConvertRule>,
}

impl Default for ValueConverter {
    fn default() -> Self {
        let mut rules: BTreeMap<&'static str, ConvertRule> = BTreeMap::new();
        rules.insert(ValueKind::Boolean.tag(), convert_boolean);
        rules.insert(ValueKind::Integer.tag(), convert_integer);
        rules.insert(ValueKind::Float.tag(), convert_float);
        rules.insert(ValueKind::Structured.tag(), convert_structured);
        rules.insert(ValueKind::Str.tag(), convert_string);
        Self { rules }
    }
}

impl ValueConverter {
    /// Create a converter with the standard rule registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert `raw` according to the rule registered under `tag`.
    ///
    /// An unregistered tag leaves the value unchanged, as does a rule that
    /// fails to parse the payload; both outcomes emit a warning.
    ///
    /// # Errors
    ///
    /// Returns an error only when a byte payload is not ASCII text.
    pub fn convert_tagged(&self, raw: &RawValue, tag: &str) -> StrataResult<Value> {
        let text = raw.as_text()?;
        let Some(rule) = self.rules.get(tag) else {
            warn!(kind = tag, "no conversion rule registered, value kept as-is");
            return Ok(Value::String(text.into_owned()));
        };
        match rule(&text) {
            Some(converted) => Ok(converted),
            None => {
                warn!(value = %text, kind = tag, "value cannot be converted, keeping original");
                Ok(Value::String(text.into_owned()))
            }
        }
    }
}

impl Convert for ValueConverter {
    fn convert(&self, raw: &RawValue, kind: Option<ValueKind>) -> StrataResult<Value> {
        match kind {
            Some(kind) => self.convert_tagged(raw, kind.tag()),
            None => Ok(Value::String(raw.as_text()?.into_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use rstest::rstest;
    use serde_json::{Value, json};
    use tracing_test::traced_test;

    use super::{Convert, RawValue, ValueConverter, ValueKind};

    fn text(value: &str) -> RawValue {
        RawValue::Text(value.to_owned())
    }

    #[rstest]
    #[case::lower_true("true", json!(true))]
    #[case::upper_true("True", json!(true))]
    #[case::lower_false("false", json!(false))]
    #[case::upper_false("False", json!(false))]
    fn boolean_tokens_convert(#[case] input: &str, #[case] expected: Value) -> Result<()> {
        let converter = ValueConverter::new();
        let converted = converter.convert(&text(input), Some(ValueKind::Boolean))?;
        assert_eq!(converted, expected);
        Ok(())
    }

    #[rstest]
    #[case::integer("69", ValueKind::Integer, json!(69))]
    #[case::float("2.99", ValueKind::Float, json!(2.99))]
    #[case::structured(
        r#"{"foo":"bar", "num":3}"#,
        ValueKind::Structured,
        json!({"foo": "bar", "num": 3})
    )]
    #[case::string("foo", ValueKind::Str, json!("foo"))]
    fn parsable_values_convert(
        #[case] input: &str,
        #[case] kind: ValueKind,
        #[case] expected: Value,
    ) -> Result<()> {
        let converter = ValueConverter::new();
        assert_eq!(converter.convert(&text(input), Some(kind))?, expected);
        Ok(())
    }

    #[traced_test]
    #[rstest]
    #[case::boolean("falsey", ValueKind::Boolean)]
    #[case::integer("loo", ValueKind::Integer)]
    #[case::float("loo", ValueKind::Float)]
    #[case::structured("wannabe 3ick", ValueKind::Structured)]
    fn failed_conversion_keeps_original_and_warns(
        #[case] input: &str,
        #[case] kind: ValueKind,
    ) -> Result<()> {
        let converter = ValueConverter::new();
        let converted = converter.convert(&text(input), Some(kind))?;
        assert_eq!(converted, Value::String(input.to_owned()));
        assert!(logs_contain("cannot be converted"));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn unknown_tag_keeps_original_and_warns() -> Result<()> {
        let converter = ValueConverter::new();
        let converted = converter.convert_tagged(&text("ff33aa"), "hex")?;
        assert_eq!(converted, json!("ff33aa"));
        assert!(logs_contain("no conversion rule registered"));
        Ok(())
    }

    #[test]
    fn no_kind_returns_decoded_text() -> Result<()> {
        let converter = ValueConverter::new();
        let converted = converter.convert(&RawValue::Bytes(b"foo".to_vec()), None)?;
        assert_eq!(converted, json!("foo"));
        Ok(())
    }

    #[test]
    fn non_ascii_bytes_are_fatal() {
        let converter = ValueConverter::new();
        let outcome = converter.convert(&RawValue::Bytes(vec![0xff, 0xfe]), None);
        assert!(outcome.is_err());
    }

    #[rstest]
    #[case::boolean("boolean", Some(ValueKind::Boolean))]
    #[case::unknown("hex", None)]
    fn kind_tags_round_trip(#[case] tag: &str, #[case] expected: Option<ValueKind>) {
        assert_eq!(ValueKind::from_tag(tag), expected);
    }
}
