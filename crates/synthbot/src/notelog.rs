//! Diagnostic record of the note events a session played.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::note::NoteEvent;

/// Receives every event after the player has acted on it.
pub trait NoteLog {
    fn record(&mut self, index: usize, event: &NoteEvent);
}

impl<F> NoteLog for F
where
    F: FnMut(usize, &NoteEvent),
{
    fn record(&mut self, index: usize, event: &NoteEvent) {
        self(index, event)
    }
}

/// Collects events in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryNoteLog {
    events: Vec<NoteEvent>,
}

impl MemoryNoteLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn into_document(self) -> NoteLogDocument {
        NoteLogDocument { notes: self.events }
    }
}

impl NoteLog for MemoryNoteLog {
    fn record(&mut self, _index: usize, event: &NoteEvent) {
        self.events.push(event.clone());
    }
}

/// Emits one `info` record per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNoteLog;

impl NoteLog for TracingNoteLog {
    fn record(&mut self, index: usize, event: &NoteEvent) {
        info!(
            segment = index,
            time = event.time,
            duration = event.duration,
            value = %event.value,
            "note"
        );
    }
}

/// On-disk shape: `{"notes": [{"note_time": .., "note_duration": .., "note_value": ..}]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteLogDocument {
    pub notes: Vec<NoteEvent>,
}

#[derive(Debug, thiserror::Error)]
pub enum NoteLogError {
    #[error("Failed to access note log {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid note log JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn write_json(path: &Path, document: &NoteLogDocument) -> Result<(), NoteLogError> {
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json).map_err(|e| NoteLogError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn load_note_log(path: &Path) -> Result<NoteLogDocument, NoteLogError> {
    let contents = std::fs::read_to_string(path).map_err(|e| NoteLogError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&contents)?)
}
