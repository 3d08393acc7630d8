//! Loading and layering: defaults, TOML file, environment overrides.

use crate::{validate, AppConfig};
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::debug;

/// Where environment overrides come from. Production uses [`StdEnv`]; tests
/// substitute a map.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct StdEnv;

impl EnvSource for StdEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for std::collections::BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        std::collections::BTreeMap::get(self, key).cloned()
    }
}

/// Load configuration: defaults, then the optional file, then process
/// environment overrides, then validation.
pub fn load(config_file: Option<&Path>) -> Result<AppConfig> {
    let mut config = match config_file {
        Some(path) => load_from_file(path)?,
        None => AppConfig::default(),
    };
    apply_env_overrides(&mut config, &StdEnv)?;
    validate(&config)?;
    Ok(config)
}

pub fn load_from_file(path: &Path) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config = toml::from_str(&raw)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

pub fn apply_env_overrides(config: &mut AppConfig, env: &dyn EnvSource) -> Result<()> {
    if let Some(value) = env.get("STACKFORGE_ENVIRONMENT") {
        config.environment.name = value;
    }
    if let Some(value) = env.get("STACKFORGE_ACCOUNT") {
        config.environment.account = value;
    }
    if let Some(value) = env.get("STACKFORGE_REGION") {
        config.environment.region = value;
    }
    if let Some(value) = env.get("STACKFORGE_NBC_ENVIRONMENT") {
        config.environment.nbc_environment = parse_bool("STACKFORGE_NBC_ENVIRONMENT", &value)?;
    }
    if let Some(value) = env.get("STACKFORGE_CLUSTER_NAME") {
        config.service.cluster_name = value;
    }
    if let Some(value) = env.get("STACKFORGE_IMAGE_URI") {
        config.service.image_uri = value;
    }
    if let Some(value) = env.get("STACKFORGE_REPOSITORY") {
        config.pipeline.repository = value;
    }
    if let Some(value) = env.get("STACKFORGE_BRANCH") {
        config.pipeline.branch = value;
    }
    if let Some(value) = env.get("STACKFORGE_PROMOTION_ENABLED") {
        config.pipeline.promotion.enabled = parse_bool("STACKFORGE_PROMOTION_ENABLED", &value)?;
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => bail!("{key} must be a boolean, got `{other}`"),
    }
}
