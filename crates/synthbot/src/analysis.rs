//! Loading of audio-analysis documents.
//!
//! Only the per-segment fields the classifier reads are kept; everything
//! else the provider sends (`bars`, `beats`, `timbre`, loudness...) is
//! dropped during deserialization.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One analysis segment as delivered, before any validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Seconds from track start.
    pub start: f64,
    /// Seconds.
    pub duration: f64,
    /// Chroma confidences, one per pitch class.
    pub pitches: Vec<f64>,
}

impl Segment {
    pub fn new(start: f64, duration: f64, pitches: impl Into<Vec<f64>>) -> Self {
        Self {
            start,
            duration,
            pitches: pitches.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDocument {
    pub segments: Vec<Segment>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to read analysis {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid analysis JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub fn parse_analysis(json: &str) -> Result<AnalysisDocument, AnalysisError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_analysis(path: &Path) -> Result<AnalysisDocument, AnalysisError> {
    let contents = std::fs::read_to_string(path).map_err(|e| AnalysisError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_analysis(&contents)
}
