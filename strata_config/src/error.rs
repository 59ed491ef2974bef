//! Error types produced by the configuration engine.

use thiserror::Error;

/// Convenience alias for results carrying a [`StrataError`].
pub type StrataResult<T> = Result<T, StrataError>;

/// Errors that can occur while resolving or loading configuration.
///
/// Value-level conversion failures are deliberately absent: a value that
/// cannot be converted is logged and kept verbatim rather than surfaced as an
/// error. Only decoding failures, connection problems and whole-load failures
/// reach callers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StrataError {
    /// A key-value operation was attempted before a connection existed.
    #[error("remote backend connection is not defined")]
    UndefinedConnection,

    /// The remote backend could not be reached or answered abnormally.
    #[error("remote backend transport failure against '{host}': {source}")]
    Transport {
        /// Host the request was addressed to, kept for diagnostics.
        host: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A raw payload could not be decoded as ASCII text.
    #[error("payload is not valid ASCII text: {value}")]
    Decode {
        /// Lossy rendering of the offending payload.
        value: String,
    },

    /// Error originating from a local configuration file.
    #[error("configuration file error in '{path}': {source}")]
    File {
        /// Path that triggered the failure.
        path: std::path::PathBuf,
        /// Underlying error reported while reading or parsing the file.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error while merging configuration layers.
    #[error("failed to merge configuration layers: {0}")]
    Gathering(#[from] Box<figment::Error>),

    /// A schema rejected the merged configuration.
    #[error("validation failed for '{key}': {message}")]
    Validation {
        /// Configuration key that failed validation.
        key: String,
        /// Human-readable explanation of the failure.
        message: String,
    },

    /// Writing a resolved value into the target namespace failed.
    #[error("failed to publish '{key}': {message}")]
    Publish {
        /// Key that could not be published.
        key: String,
        /// Human-readable explanation of the failure.
        message: String,
    },
}

impl StrataError {
    /// Construct a transport error from any underlying failure.
    pub fn transport(
        host: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            host: host.into(),
            source: source.into(),
        }
    }

    /// Construct a file error for a configuration path.
    pub fn file(
        path: impl Into<std::path::PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::File {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Construct a merge error from a [`figment::Error`].
    #[must_use]
    pub fn gathering(source: figment::Error) -> Self {
        Self::Gathering(Box::new(source))
    }

    /// Returns `true` when the error represents remote-backend
    /// unavailability, which per-key resolution treats as "value absent".
    #[must_use]
    pub const fn is_remote_unavailable(&self) -> bool {
        matches!(self, Self::UndefinedConnection | Self::Transport { .. })
    }
}
