//! Configuration loading for synthbot.
//!
//! # Config File Locations
//!
//! Files are loaded in order; any key a later file sets wins, even when it
//! restores the default:
//! 1. `/etc/synthbot/config.toml` (system)
//! 2. `~/.config/synthbot/config.toml` (user)
//! 3. `./synthbot.toml` (local override, or a path given on the command line)
//! 4. Environment variables (`SYNTHBOT_*`)
//!
//! # Example Config
//!
//! ```toml
//! [playback]
//! release_slop_ms = 10
//! lead_in_ms = 5000
//! strict = false
//!
//! [classifier]
//! loud_threshold = 0.75
//!
//! [output]
//! sink = "keyboard"
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use settings::{ClassifierConfig, OutputConfig, PlaybackConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete synthbot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SynthConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl SynthConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` replace `./synthbot.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = SynthConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let layer = loader::read_layer(&path)?;
            config = loader::merge_layer(config, layer, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# synthbot configuration\n\n");

        output.push_str("[playback]\n");
        output.push_str(&format!(
            "release_slop_ms = {}\n",
            self.playback.release_slop_ms
        ));
        output.push_str(&format!("lead_in_ms = {}\n", self.playback.lead_in_ms));
        output.push_str(&format!("strict = {}\n", self.playback.strict));

        output.push_str("\n[classifier]\n");
        output.push_str(&format!(
            "loud_threshold = {:?}\n",
            self.classifier.loud_threshold
        ));

        output.push_str("\n[output]\n");
        output.push_str(&format!("sink = \"{}\"\n", self.output.sink));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.telemetry.log_level
        ));

        output
    }
}
