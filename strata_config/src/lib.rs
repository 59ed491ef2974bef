//! Layered configuration resolution for applications.
//!
//! `strata_config` retrieves configuration values from three sources — the
//! process environment, a local JSON file and a Consul key-value backend —
//! merges them by precedence, optionally validates the result against a
//! schema, and publishes it into a namespace visible to application code.
//!
//! Two entry points with deliberately different policies:
//!
//! - [`Resolver`] answers single-key lookups. The environment wins over the
//!   remote backend, conversion is best-effort, and remote unavailability
//!   degrades to the fallback value. A running process never crashes on a
//!   bad or missing value.
//! - [`load_and_validate`] loads a whole configuration at startup. Layers
//!   merge remote-first with the environment overriding, and every failure
//!   is fatal: no partial configuration is ever published.
//!
//! ```no_run
//! use strata_config::{ConfigNamespace, LoadOptions, Resolver};
//!
//! # fn main() -> strata_config::StrataResult<()> {
//! let resolver = Resolver::new()?;
//! let mut config = ConfigNamespace::new();
//! strata_config::load_and_validate(&resolver, &mut config, "MYAPP", &LoadOptions::default())?;
//! # Ok(())
//! # }
//! ```

mod convert;
mod dedup;
mod error;
mod load;
mod namespace;
mod remote;
mod resolve;
mod schema;

pub use convert::{Convert, RawValue, ValueConverter, ValueKind};
pub use dedup::DedupFilter;
pub use error::{StrataError, StrataResult};
pub use load::{
    ConfigMap, LoadOptions, load_and_validate, load_from_config_server, load_from_env,
    load_from_json,
};
pub use namespace::{ConfigNamespace, Namespace};
pub use remote::{
    Connection, ConsulClient, ConsulSettings, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SCHEME,
    KeyValueSource,
};
pub use resolve::{KeySpec, Lookup, Resolver};
pub use schema::{KindSchema, Schema, SchemaFn};
