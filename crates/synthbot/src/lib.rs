//! Plays per-segment pitch analysis on a keyboard-bound synth.
//!
//! Each analysis segment is classified into a single note, a chord, or
//! silence, then played as timed key presses on twelve keys, one per pitch
//! class. Playback is strictly sequential: a segment's keys are released
//! before the next segment's keys go down.
//!
//! # Example
//!
//! ```
//! use synthbot::{classify, NoteValue, Segment};
//!
//! let mut pitches = vec![0.1; 12];
//! pitches[3] = 1.0;
//! let event = classify(&Segment::new(1.0, 0.4, pitches)).unwrap();
//! assert_eq!(event.value, NoteValue::Single(3));
//! ```

pub mod analysis;
pub mod classify;
pub mod keymap;
pub mod midi_export;
pub mod note;
pub mod notelog;
pub mod player;
pub mod session;
pub mod sink;

pub use analysis::{load_analysis, parse_analysis, AnalysisDocument, AnalysisError, Segment};
pub use classify::{classify, classify_with, is_silence_marker, ClassifierParams, SegmentError};
pub use keymap::{key_for, PitchClass, KEY_TABLE};
pub use midi_export::{events_to_midi, ExportOptions};
pub use note::{NoteEvent, NoteValue};
pub use notelog::{load_note_log, MemoryNoteLog, NoteLog, NoteLogDocument, NoteLogError, TracingNoteLog};
pub use player::{PlayError, PlayOutcome, Player, PlayerConfig};
pub use session::{PlaybackError, PlaybackReport, Session, SessionConfig, SkippedSegment};
pub use sink::{HeldKeys, KeySignal, KeySink, LoggingKeySink, RecordingKeySink, SinkError};

#[cfg(feature = "keyboard")]
pub use sink::EnigoKeySink;
