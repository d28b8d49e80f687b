//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Playback timing and failure policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Milliseconds shaved off every hold so repeated notes re-trigger.
    /// Default: 10
    #[serde(default = "PlaybackConfig::default_release_slop_ms")]
    pub release_slop_ms: u64,

    /// Wait before the first note, to focus the synth window.
    /// Default: 5000
    #[serde(default = "PlaybackConfig::default_lead_in_ms")]
    pub lead_in_ms: u64,

    /// Abort on the first malformed segment instead of skipping it.
    /// Default: false
    #[serde(default)]
    pub strict: bool,
}

impl PlaybackConfig {
    fn default_release_slop_ms() -> u64 {
        10
    }

    fn default_lead_in_ms() -> u64 {
        5000
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            release_slop_ms: Self::default_release_slop_ms(),
            lead_in_ms: Self::default_lead_in_ms(),
            strict: false,
        }
    }
}

/// Segment classification tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Confidence at or above which a pitch class counts as loud.
    /// Default: 0.75
    #[serde(default = "ClassifierConfig::default_loud_threshold")]
    pub loud_threshold: f64,
}

impl ClassifierConfig {
    fn default_loud_threshold() -> f64 {
        0.75
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            loud_threshold: Self::default_loud_threshold(),
        }
    }
}

/// Where key signals go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Key sink: "log", "dry" or "keyboard".
    /// Default: log
    #[serde(default = "OutputConfig::default_sink")]
    pub sink: String,
}

impl OutputConfig {
    fn default_sink() -> String {
        "log".to_string()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink: Self::default_sink(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let playback = PlaybackConfig::default();
        assert_eq!(playback.release_slop_ms, 10);
        assert_eq!(playback.lead_in_ms, 5000);
        assert!(!playback.strict);

        assert_eq!(ClassifierConfig::default().loud_threshold, 0.75);
        assert_eq!(OutputConfig::default().sink, "log");
        assert_eq!(TelemetryConfig::default().log_level, "info");
    }
}
