//! Per-key configuration resolution across environment and remote backend.
//!
//! The environment always wins: when a variable is present in the process
//! environment the remote backend is not consulted at all. Remote
//! unavailability is swallowed with a warning so that resolution degrades to
//! the fallback value instead of failing a running process.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::convert::{Convert, RawValue, ValueConverter, ValueKind};
use crate::error::StrataResult;
use crate::remote::{ConsulClient, ConsulSettings, KeyValueSource};

/// Options for a single-key lookup.
///
/// ```
/// use strata_config::{Lookup, ValueKind};
///
/// let lookup = Lookup::new("MY_FLAG")
///     .path("my_service")
///     .convert_to(ValueKind::Boolean)
///     .fallback(serde_json::json!(false));
/// # let _ = lookup;
/// ```
#[derive(Debug, Clone)]
pub struct Lookup<'a> {
    key: &'a str,
    path: Option<&'a str>,
    fallback: Option<Value>,
    convert_to: Option<ValueKind>,
    use_env: bool,
    use_remote: bool,
}

impl<'a> Lookup<'a> {
    /// Start a lookup for `key` with environment and remote sources enabled.
    #[must_use]
    pub const fn new(key: &'a str) -> Self {
        Self {
            key,
            path: None,
            fallback: None,
            convert_to: None,
            use_env: true,
            use_remote: true,
        }
    }

    /// Namespace the remote lookup under `path` (composite key `path/key`).
    #[must_use]
    pub const fn path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }

    /// Value returned when every source yields nothing.
    #[must_use]
    pub fn fallback(mut self, fallback: Value) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Convert a resolved value to `kind` (best-effort).
    #[must_use]
    pub const fn convert_to(mut self, kind: ValueKind) -> Self {
        self.convert_to = Some(kind);
        self
    }

    /// Enable or disable the environment source.
    #[must_use]
    pub const fn use_env(mut self, enabled: bool) -> Self {
        self.use_env = enabled;
        self
    }

    /// Enable or disable the remote source.
    #[must_use]
    pub const fn use_remote(mut self, enabled: bool) -> Self {
        self.use_remote = enabled;
        self
    }
}

/// The set of keys a bulk resolution should fetch.
///
/// Bare keys are kept as resolved text; typed keys are converted per key.
#[derive(Debug, Clone)]
pub enum KeySpec {
    /// Keys resolved without conversion.
    Bare(Vec<String>),
    /// Keys resolved with a per-key target kind.
    Typed(Vec<(String, ValueKind)>),
}

impl KeySpec {
    /// Build a bare key set from anything yielding string-likes.
    pub fn bare<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Bare(keys.into_iter().map(Into::into).collect())
    }

    /// Build a typed key set.
    pub fn typed<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, ValueKind)>,
        S: Into<String>,
    {
        Self::Typed(keys.into_iter().map(|(k, kind)| (k.into(), kind)).collect())
    }

    fn entries(&self) -> Vec<(&str, Option<ValueKind>)> {
        match self {
            Self::Bare(keys) => keys.iter().map(|k| (k.as_str(), None)).collect(),
            Self::Typed(keys) => keys
                .iter()
                .map(|(k, kind)| (k.as_str(), Some(*kind)))
                .collect(),
        }
    }
}

/// Resolves configuration variables across environment and remote backend.
///
/// The key-value source and the converter are injected capabilities with
/// standard defaults ([`ConsulClient`] and [`ValueConverter`]).
pub struct Resolver {
    client: Box<dyn KeyValueSource>,
    converter: Box<dyn Convert>,
}

impl Resolver {
    /// Create a resolver with an eagerly prepared Consul connection built
    /// from the current environment.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the HTTP client cannot be built.
    pub fn new() -> StrataResult<Self> {
        Self::with_settings(None)
    }

    /// Create a resolver connecting Consul with explicit `settings`.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the HTTP client cannot be built.
    pub fn with_settings(settings: Option<ConsulSettings>) -> StrataResult<Self> {
        Ok(Self::from_parts(
            ConsulClient::connected(settings)?,
            ValueConverter::new(),
        ))
    }

    /// Assemble a resolver from caller-supplied capabilities.
    pub fn from_parts<K, C>(client: K, converter: C) -> Self
    where
        K: KeyValueSource + 'static,
        C: Convert + 'static,
    {
        Self {
            client: Box::new(client),
            converter: Box::new(converter),
        }
    }

    /// Resolve a single variable.
    ///
    /// The environment is consulted first and wins outright when the key is
    /// present. Otherwise the remote backend is asked; an unreachable or
    /// unconfigured backend is logged and treated as "value absent". A value
    /// obtained from either source passes through the converter; when no
    /// source yields a value, the lookup's fallback is returned.
    ///
    /// # Errors
    ///
    /// Never errors for missing configuration or remote unavailability; the
    /// only propagated failure is a byte payload that is not ASCII text.
    pub fn get_variable(&self, lookup: &Lookup<'_>) -> StrataResult<Option<Value>> {
        let mut raw: Option<RawValue> = None;

        if lookup.use_env {
            raw = std::env::var(lookup.key).ok().map(RawValue::Text);
        }

        if raw.is_none() && lookup.use_remote {
            match self.client.fetch(lookup.key, lookup.path) {
                Ok(fetched) => raw = fetched.map(RawValue::Bytes),
                Err(err) if err.is_remote_unavailable() => {
                    let host = self
                        .client
                        .endpoint()
                        .unwrap_or_else(|| "<no connection>".to_owned());
                    warn!(
                        host = %host,
                        key = lookup.key,
                        "remote backend unavailable, check connection parameters"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        match raw {
            Some(value) => self.converter.convert(&value, lookup.convert_to).map(Some),
            None => Ok(lookup.fallback.clone()),
        }
    }

    /// Resolve a declared set of keys under a shared `path`.
    ///
    /// Each key is resolved as by [`get_variable`](Self::get_variable) with
    /// no fallback. Keys that resolve to nothing from any source are omitted
    /// from the result; callers must use containment checks rather than
    /// expect null entries.
    ///
    /// # Errors
    ///
    /// Propagates only fatal decode errors, as per-key resolution does.
    pub fn get_variables(
        &self,
        path: Option<&str>,
        keys: &KeySpec,
        use_env: bool,
        use_remote: bool,
    ) -> StrataResult<BTreeMap<String, Value>> {
        let mut resolved = BTreeMap::new();
        for (key, kind) in keys.entries() {
            let mut lookup = Lookup::new(key).use_env(use_env).use_remote(use_remote);
            if let Some(prefix) = path {
                lookup = lookup.path(prefix);
            }
            if let Some(kind) = kind {
                lookup = lookup.convert_to(kind);
            }
            if let Some(value) = self.get_variable(&lookup)? {
                resolved.insert(key.to_owned(), value);
            }
        }
        Ok(resolved)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("endpoint", &self.client.endpoint())
            .finish_non_exhaustive()
    }
}
