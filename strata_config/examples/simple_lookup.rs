//! Resolves a handful of variables from the environment and, when one is
//! reachable, a local Consul agent.
//!
//! ```sh
//! MY_BOOL=False MY_NAME=demo cargo run --example simple_lookup
//! ```

use serde_json::json;
use strata_config::{DedupFilter, Lookup, Resolver, ValueKind};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{Layer as _, fmt};

fn main() -> strata_config::StrataResult<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(DedupFilter::default()))
        .init();

    let resolver = Resolver::new()?;

    let name = resolver.get_variable(
        &Lookup::new("MY_NAME").fallback(json!("anonymous")),
    )?;
    let flag = resolver.get_variable(
        &Lookup::new("MY_BOOL")
            .convert_to(ValueKind::Boolean)
            .fallback(json!(false)),
    )?;

    info!(?name, ?flag, "resolved");
    Ok(())
}
