//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, SynthConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/synthbot/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("synthbot/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("synthbot.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file, over the defaults.
pub fn load_from_file(path: &Path) -> Result<SynthConfig, ConfigError> {
    merge_layer(SynthConfig::default(), read_layer(path)?, path)
}

/// Read a TOML file as a raw table, keeping only the keys it sets.
pub fn read_layer(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_layer(&contents, path)
}

fn parse_layer(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    toml::from_str(contents).map_err(|e: toml::de::Error| parse_error(path, e))
}

/// Parse config from TOML string. Missing sections and keys take defaults.
#[cfg(test)]
fn parse_toml(contents: &str, path: &Path) -> Result<SynthConfig, ConfigError> {
    merge_layer(SynthConfig::default(), parse_layer(contents, path)?, path)
}

fn parse_error(path: &Path, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Overlay a file layer onto `base`.
///
/// Every key present in `layer` wins, including keys set back to their
/// default value; absent keys keep the value from `base`.
pub fn merge_layer(
    base: SynthConfig,
    layer: toml::Table,
    path: &Path,
) -> Result<SynthConfig, ConfigError> {
    let mut merged = match toml::Value::try_from(&base).map_err(|e| parse_error(path, e))? {
        toml::Value::Table(table) => table,
        _ => toml::Table::new(),
    };
    merge_tables(&mut merged, layer);

    toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut SynthConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |name| env::var(name).ok());
}

/// Apply `SYNTHBOT_*` / `RUST_LOG` overrides read through `lookup`.
///
/// `RUST_LOG` is applied last, so it beats `SYNTHBOT_LOG_LEVEL`.
pub fn apply_overrides_from(
    config: &mut SynthConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("SYNTHBOT_SLOP_MS") {
        if let Ok(ms) = v.parse() {
            config.playback.release_slop_ms = ms;
            sources.env_overrides.push("SYNTHBOT_SLOP_MS".to_string());
        }
    }
    if let Some(v) = lookup("SYNTHBOT_LEAD_IN_MS") {
        if let Ok(ms) = v.parse() {
            config.playback.lead_in_ms = ms;
            sources.env_overrides.push("SYNTHBOT_LEAD_IN_MS".to_string());
        }
    }
    if let Some(v) = lookup("SYNTHBOT_STRICT") {
        if let Some(strict) = parse_bool(&v) {
            config.playback.strict = strict;
            sources.env_overrides.push("SYNTHBOT_STRICT".to_string());
        }
    }
    if let Some(v) = lookup("SYNTHBOT_LOUD_THRESHOLD") {
        if let Ok(threshold) = v.parse() {
            config.classifier.loud_threshold = threshold;
            sources.env_overrides.push("SYNTHBOT_LOUD_THRESHOLD".to_string());
        }
    }
    if let Some(v) = lookup("SYNTHBOT_SINK") {
        config.output.sink = v;
        sources.env_overrides.push("SYNTHBOT_SINK".to_string());
    }
    if let Some(v) = lookup("SYNTHBOT_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("SYNTHBOT_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
