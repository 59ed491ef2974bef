//! Blocking client for the Consul key-value HTTP API.
//!
//! The client owns at most one connection. The connection is built lazily on
//! first use (or eagerly via [`ConsulClient::connected`]) and reused for every
//! subsequent fetch; there is no pooling, retry or timeout policy beyond what
//! the transport enforces.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use tracing::warn;

use crate::error::{StrataError, StrataResult};

/// Default host consulted when `CONSUL_HOST` is unset.
pub const DEFAULT_HOST: &str = "consul";
/// Default port consulted when `CONSUL_PORT` is unset.
pub const DEFAULT_PORT: u16 = 8500;
/// Default scheme consulted when `CONSUL_SCHEME` is unset.
pub const DEFAULT_SCHEME: &str = "http";

/// Connection parameters for the Consul backend.
///
/// Defaults are sourced from the environment at call time, never at program
/// start, so tests and long-lived processes always observe the current
/// environment snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsulSettings {
    /// Backend host name or address.
    pub host: String,
    /// Backend TCP port.
    pub port: u16,
    /// URL scheme, `http` unless overridden.
    pub scheme: String,
    /// Optional ACL token, forwarded as a query parameter.
    pub token: Option<String>,
    /// Optional datacenter, forwarded as a query parameter.
    pub datacenter: Option<String>,
}

impl Default for ConsulSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            scheme: DEFAULT_SCHEME.to_owned(),
            token: None,
            datacenter: None,
        }
    }
}

impl ConsulSettings {
    /// Build settings from the current process environment.
    ///
    /// Reads `CONSUL_HOST`, `CONSUL_PORT`, `CONSUL_SCHEME`, `CONSUL_TOKEN`
    /// and `CONSUL_DC`, falling back to the documented defaults for any
    /// variable that is unset. An unparsable port falls back to the default
    /// with a warning rather than failing resolution.
    #[must_use]
    pub fn from_env() -> Self {
        let port = std::env::var("CONSUL_PORT")
            .ok()
            .map_or(DEFAULT_PORT, |raw| {
                raw.parse().unwrap_or_else(|_| {
                    warn!(value = %raw, "CONSUL_PORT is not a valid port, using default");
                    DEFAULT_PORT
                })
            });
        Self {
            host: std::env::var("CONSUL_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned()),
            port,
            scheme: std::env::var("CONSUL_SCHEME").unwrap_or_else(|_| DEFAULT_SCHEME.to_owned()),
            token: std::env::var("CONSUL_TOKEN").ok(),
            datacenter: std::env::var("CONSUL_DC").ok(),
        }
    }

    fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// A single record returned by the key-value endpoint.
///
/// Consul encodes stored payloads as base64 in the `Value` field; a key that
/// exists with an empty payload carries `null`.
#[derive(Debug, Deserialize)]
struct KvRecord {
    #[serde(rename = "Value")]
    value: Option<String>,
}

/// A live handle to the Consul HTTP API.
#[derive(Debug)]
pub struct Connection {
    http: reqwest::blocking::Client,
    settings: ConsulSettings,
}

impl Connection {
    fn open(settings: ConsulSettings) -> StrataResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|err| StrataError::transport(settings.host.clone(), err))?;
        Ok(Self { http, settings })
    }

    /// Host this connection is addressed to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.settings.host
    }

    /// Fetch the raw payload stored under `key_path`, blocking until the
    /// round trip completes.
    ///
    /// A 404 or an empty record set is an absent value, not an error.
    fn kv_get(&self, key_path: &str) -> StrataResult<Option<Vec<u8>>> {
        let url = format!("{}/v1/kv/{}", self.settings.base_url(), key_path);
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(token) = self.settings.token.as_deref() {
            query.push(("token", token));
        }
        if let Some(dc) = self.settings.datacenter.as_deref() {
            query.push(("dc", dc));
        }
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .map_err(|err| StrataError::transport(self.settings.host.clone(), err))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let records: Vec<KvRecord> = response
            .error_for_status()
            .and_then(reqwest::blocking::Response::json)
            .map_err(|err| StrataError::transport(self.settings.host.clone(), err))?;
        let Some(record) = records.first() else {
            return Ok(None);
        };
        record
            .value
            .as_deref()
            .map(|encoded| {
                BASE64.decode(encoded).map_err(|err| {
                    StrataError::transport(self.settings.host.clone(), err)
                })
            })
            .transpose()
    }
}

/// Compose the lookup key from a bare key and an optional path prefix.
fn compose_key(key: &str, path: Option<&str>) -> String {
    path.map_or_else(|| key.to_owned(), |prefix| format!("{prefix}/{key}"))
}

/// Capability interface for fetching raw values from a key-value backend.
///
/// The resolver depends on this seam rather than on [`ConsulClient`]
/// directly, so alternative backends can be injected.
pub trait KeyValueSource {
    /// Fetch the raw payload for `key`, optionally namespaced under `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UndefinedConnection`] when no connection
    /// exists and [`StrataError::Transport`] when the backend cannot be
    /// reached. A missing key is `Ok(None)`.
    fn fetch(&self, key: &str, path: Option<&str>) -> StrataResult<Option<Vec<u8>>>;

    /// Host the source would contact, for diagnostics; `None` before a
    /// connection exists.
    fn endpoint(&self) -> Option<String>;
}

/// Client for the Consul key-value backend.
///
/// Holds at most one [`Connection`]. Repeated calls to
/// [`create_connection`](Self::create_connection) are idempotent: the first
/// call's connection wins and later settings are ignored.
#[derive(Debug, Default)]
pub struct ConsulClient {
    connection: Option<Connection>,
}

impl ConsulClient {
    /// Create a client without a connection.
    #[must_use]
    pub const fn new() -> Self {
        Self { connection: None }
    }

    /// Create a client with an eagerly prepared connection.
    ///
    /// With `settings` of `None`, connection parameters are read from the
    /// environment via [`ConsulSettings::from_env`].
    ///
    /// # Errors
    ///
    /// Returns a transport error when the HTTP client cannot be built.
    pub fn connected(settings: Option<ConsulSettings>) -> StrataResult<Self> {
        let mut client = Self::new();
        client.create_connection(settings)?;
        Ok(client)
    }

    /// Create the connection if none exists yet, returning the live handle.
    ///
    /// When a connection already exists it is returned unchanged and
    /// `settings` is ignored; the client never reconnects implicitly.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the HTTP client cannot be built.
    pub fn create_connection(
        &mut self,
        settings: Option<ConsulSettings>,
    ) -> StrataResult<&Connection> {
        if self.connection.is_none() {
            let settings = settings.unwrap_or_else(ConsulSettings::from_env);
            self.connection = Some(Connection::open(settings)?);
        }
        self.connection
            .as_ref()
            .ok_or(StrataError::UndefinedConnection)
    }

    /// The current connection, if one exists.
    #[must_use]
    pub const fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    /// Fetch the raw payload for `key`, optionally namespaced under `path`.
    ///
    /// The lookup key is `path/key` when a path is supplied and the bare
    /// `key` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UndefinedConnection`] when no connection has
    /// been created, or [`StrataError::Transport`] for backend failures. A
    /// key the backend does not hold is `Ok(None)`.
    pub fn get_raw_value(&self, key: &str, path: Option<&str>) -> StrataResult<Option<Vec<u8>>> {
        let connection = self
            .connection
            .as_ref()
            .ok_or(StrataError::UndefinedConnection)?;
        connection.kv_get(&compose_key(key, path))
    }
}

impl KeyValueSource for ConsulClient {
    fn fetch(&self, key: &str, path: Option<&str>) -> StrataResult<Option<Vec<u8>>> {
        self.get_raw_value(key, path)
    }

    fn endpoint(&self) -> Option<String> {
        self.connection.as_ref().map(|c| c.host().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::compose_key;

    #[rstest]
    #[case::namespaced(Some("svc"), "svc/x")]
    #[case::bare(None, "x")]
    fn composes_lookup_keys(#[case] path: Option<&str>, #[case] expected: &str) {
        assert_eq!(compose_key("x", path), expected);
    }
}
