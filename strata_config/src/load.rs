//! Whole-configuration loading across remote, file and environment layers.
//!
//! Layer precedence here is fixed and differs from single-key resolution on
//! purpose: the remote layer is gathered first and the environment layer
//! last, each later layer overriding the previous on key collision. Loading
//! is fail-fast — any error in the sequence aborts the load and nothing is
//! published — in contrast to the best-effort per-value policy of the
//! resolver.

use std::collections::BTreeMap;
use std::path::Path;

use figment::Figment;
use figment::providers::Serialized;
use serde_json::Value;
use tracing::{error, warn};

use crate::error::{StrataError, StrataResult};
use crate::namespace::Namespace;
use crate::resolve::{KeySpec, Resolver};
use crate::schema::Schema;

/// A partial configuration contributed by one source layer.
pub type ConfigMap = BTreeMap<String, Value>;

/// Load a configuration layer from a JSON file.
///
/// The file's path is taken from the environment variable named `env_var`.
/// An unset variable or a missing file yields an empty layer with a warning;
/// those are routine deployment states, not errors.
///
/// # Errors
///
/// Returns [`StrataError::File`] when the file exists but cannot be read or
/// does not parse as a JSON object.
pub fn load_from_json(env_var: &str) -> StrataResult<ConfigMap> {
    let Ok(configured) = std::env::var(env_var) else {
        warn!(env_var, "config path variable unset, unable to load file layer");
        return Ok(ConfigMap::new());
    };
    let path = Path::new(&configured);
    if !path.is_file() {
        warn!(path = %path.display(), "config file does not exist, unable to load file layer");
        return Ok(ConfigMap::new());
    }
    let data = std::fs::read_to_string(path).map_err(|err| StrataError::file(path, err))?;
    let document: ConfigMap =
        serde_json::from_str(&data).map_err(|err| StrataError::file(path, err))?;
    Ok(document)
}

/// Load a configuration layer from prefixed environment variables.
///
/// A variable named `PREFIX_SUFFIX` contributes the key `suffix`
/// (lowercased). A variable named exactly `PREFIX` is excluded, as are
/// variables whose names are not valid Unicode.
#[must_use]
pub fn load_from_env(prefix: &str) -> ConfigMap {
    let marker = format!("{prefix}_");
    std::env::vars_os()
        .filter_map(|(name, value)| {
            let name = name.into_string().ok()?;
            let value = value.into_string().ok()?;
            let suffix = name.strip_prefix(&marker)?;
            if suffix.is_empty() {
                return None;
            }
            Some((suffix.to_lowercase(), Value::String(value)))
        })
        .collect()
}

/// Load a configuration layer from the remote backend under `namespace`.
///
/// Environment lookup is disabled for this layer: it contributes remote
/// values only, so the loader can apply its own env-last precedence.
///
/// # Errors
///
/// Propagates fatal decode errors from resolution.
pub fn load_from_config_server(
    resolver: &Resolver,
    namespace: &str,
    keys: &KeySpec,
) -> StrataResult<ConfigMap> {
    resolver.get_variables(Some(namespace), keys, false, true)
}

/// Options for [`load_and_validate`].
#[derive(Default)]
pub struct LoadOptions<'a> {
    /// Validator applied to the merged mapping; failures abort the load.
    pub schema: Option<&'a dyn Schema>,
    /// Keys to fetch from the remote layer. When `None`, the schema's
    /// declared keys are used; with neither, the remote layer is empty.
    pub keys: Option<KeySpec>,
    /// Upper-case every layer's keys before merging.
    pub uppercase: bool,
}

impl std::fmt::Debug for LoadOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("schema", &self.schema.map(|_| "<schema>"))
            .field("keys", &self.keys)
            .field("uppercase", &self.uppercase)
            .finish()
    }
}

fn uppercase_keys(layer: ConfigMap) -> ConfigMap {
    layer
        .into_iter()
        .map(|(key, value)| (key.to_uppercase(), value))
        .collect()
}

/// Collapse layers into one mapping, later layers winning per key.
///
/// A colliding key replaces the previous value wholesale, objects included;
/// figment extracts the combined mapping but must not deep-merge the layers.
fn merge_layers(layers: Vec<ConfigMap>, uppercase: bool) -> StrataResult<ConfigMap> {
    let mut combined = ConfigMap::new();
    for layer in layers {
        let layer = if uppercase { uppercase_keys(layer) } else { layer };
        combined.extend(layer);
    }
    Figment::from(Serialized::defaults(combined))
        .extract()
        .map_err(StrataError::gathering)
}

fn run_load(
    resolver: &Resolver,
    target: &mut dyn Namespace,
    source_name: &str,
    options: &LoadOptions<'_>,
) -> StrataResult<()> {
    let keys = options.keys.clone().or_else(|| {
        options
            .schema
            .and_then(Schema::declared_keys)
            .map(KeySpec::Bare)
    });

    let remote = keys
        .as_ref()
        .map(|keys| load_from_config_server(resolver, source_name, keys))
        .transpose()?
        .unwrap_or_default();
    let file = load_from_json(source_name)?;
    let env = load_from_env(source_name);

    let merged = merge_layers(vec![remote, file, env], options.uppercase)?;

    let validated = match options.schema {
        Some(schema) => schema.validate(merged)?,
        None => merged,
    };

    for (key, value) in validated {
        target.publish(&key, value)?;
    }
    Ok(())
}

/// Load configuration for `source_name`, validate it and publish it.
///
/// Builds three layers — remote backend (namespaced under `source_name`),
/// JSON file (path named by the `source_name` environment variable) and
/// prefixed environment variables — merges them with the environment layer
/// winning, optionally validates the result against a schema, and publishes
/// every resolved key into `target`.
///
/// # Errors
///
/// Fail-fast: file parse failures, layer merge failures, schema rejection
/// and publish failures are all logged at error severity and returned.
/// Callers should abort startup rather than proceed with partial
/// configuration.
pub fn load_and_validate(
    resolver: &Resolver,
    target: &mut dyn Namespace,
    source_name: &str,
    options: &LoadOptions<'_>,
) -> StrataResult<()> {
    run_load(resolver, target, source_name, options).inspect_err(|err| {
        error!(source = source_name, error = %err, "configuration load failed");
    })
}
