//! Fixed pitch-class to key table.
//!
//! The analysis source reports chroma for a single octave, so the synth is
//! bound to twelve keys: the bottom letter row plus `a` and `s`.

use serde::{Deserialize, Serialize};

/// Key symbol for each pitch class, indexed by chroma (0 = C).
pub const KEY_TABLE: [char; 12] = ['z', 'x', 'c', 'v', 'b', 'n', 'm', ',', '.', '/', 'a', 's'];

const PITCH_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// A pitch class (chroma) in `0..12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PitchClass(u8);

impl PitchClass {
    pub const COUNT: usize = 12;

    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < Self::COUNT).then_some(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        PITCH_NAMES[usize::from(self.0)]
    }

    pub fn key(self) -> char {
        KEY_TABLE[usize::from(self.0)]
    }

    pub fn all() -> impl Iterator<Item = PitchClass> {
        (0..Self::COUNT as u8).map(PitchClass)
    }
}

impl TryFrom<u8> for PitchClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("pitch class {} out of range 0..12", value))
    }
}

impl From<PitchClass> for u8 {
    fn from(pitch: PitchClass) -> Self {
        pitch.0
    }
}

impl std::fmt::Display for PitchClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Key bound to a raw pitch index, `None` outside the table.
pub fn key_for(pitch: u8) -> Option<char> {
    PitchClass::new(pitch).map(PitchClass::key)
}

/// Reverse lookup, used when reading back key-signal traces.
pub fn pitch_for(key: char) -> Option<PitchClass> {
    KEY_TABLE
        .iter()
        .position(|&k| k == key)
        .and_then(|i| PitchClass::new(i as u8))
}
