use anyhow::Result;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::compiler::variables::is_identifier;

pub const CONFIG_FILE: &str = "customui.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Overrides applied to every compile unless `--var` replaces them
    #[serde(default)]
    pub variables: IndexMap<String, String>,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub check: CheckConfig,
}

#[derive(Debug, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl WatchConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn default_shutdown_timeout_ms() -> u64 {
    500
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingSection {
    /// `env_logger` filter, e.g. "warn" or "customui=debug"
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["html".to_string(), "cui".to_string()]
}

/// Load and parse a customui.toml. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("no {} found, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(e) => anyhow::bail!("failed to read `{}`: {}", path.display(), e),
    };

    let mut config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse `{}`: {}", path.display(), e))?;

    validate_variables(&config.variables)?;
    config.check.extensions = normalize_extensions(&config.check.extensions)?;

    Ok(config)
}

fn validate_variables(variables: &IndexMap<String, String>) -> Result<()> {
    for name in variables.keys() {
        if !is_identifier(name) {
            anyhow::bail!(
                "Invalid variable name '{}' in [variables]. Use letters, digits and underscores",
                name
            );
        }
    }
    Ok(())
}

/// ".HTML" → "html"
fn normalize_extensions(extensions: &[String]) -> Result<Vec<String>> {
    if extensions.is_empty() {
        anyhow::bail!("[check] extensions must list at least one extension");
    }
    Ok(extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .collect())
}
