//! Classified note events and their note-log JSON shape.
//!
//! `note_value` is `-1` for silence, a pitch index for a single note, or an
//! array of pitch indices for a chord.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel written to note logs for a silent segment.
pub const SILENCE_SENTINEL: i64 = -1;

/// What sounds during one segment.
///
/// Single notes and chords both carry pitch-class indices (0..12), never
/// confidence magnitudes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValue {
    Silence,
    Single(u8),
    /// Ascending, distinct pitch indices.
    Chord(Vec<u8>),
}

impl NoteValue {
    /// Pitch indices to press, empty for silence.
    pub fn pitches(&self) -> &[u8] {
        match self {
            Self::Silence => &[],
            Self::Single(pitch) => std::slice::from_ref(pitch),
            Self::Chord(pitches) => pitches,
        }
    }

    pub fn is_silence(&self) -> bool {
        matches!(self, Self::Silence)
    }
}

impl std::fmt::Display for NoteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Silence => f.write_str("silence"),
            Self::Single(pitch) => write!(f, "{}", pitch),
            Self::Chord(pitches) => {
                let joined: Vec<String> = pitches.iter().map(|p| p.to_string()).collect();
                write!(f, "[{}]", joined.join(", "))
            }
        }
    }
}

impl Serialize for NoteValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Silence => serializer.serialize_i64(SILENCE_SENTINEL),
            Self::Single(pitch) => serializer.serialize_u8(*pitch),
            Self::Chord(pitches) => pitches.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NoteValueRepr {
    Index(i64),
    Chord(Vec<i64>),
}

fn pitch_index<E: serde::de::Error>(raw: i64) -> Result<u8, E> {
    u8::try_from(raw).map_err(|_| E::custom(format!("invalid pitch index {}", raw)))
}

impl<'de> Deserialize<'de> for NoteValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NoteValueRepr::deserialize(deserializer)? {
            NoteValueRepr::Index(SILENCE_SENTINEL) => Ok(Self::Silence),
            NoteValueRepr::Index(raw) => pitch_index(raw).map(Self::Single),
            NoteValueRepr::Chord(raw) if raw.is_empty() => {
                Err(D::Error::custom("chord must contain at least one pitch"))
            }
            NoteValueRepr::Chord(raw) => {
                let mut pitches = raw
                    .into_iter()
                    .map(pitch_index)
                    .collect::<Result<Vec<u8>, D::Error>>()?;
                pitches.sort_unstable();
                pitches.dedup();
                Ok(Self::Chord(pitches))
            }
        }
    }
}

/// One segment's classified note(s) with timing, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Segment start, informational only.
    #[serde(rename = "note_time")]
    pub time: f64,
    #[serde(rename = "note_duration")]
    pub duration: f64,
    #[serde(rename = "note_value")]
    pub value: NoteValue,
}
