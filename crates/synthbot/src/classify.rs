//! Segment classification: chroma confidences to a single note, a chord,
//! or silence.
//!
//! Priority order:
//! 1. Silence marker (pitch classes 0 and 1 both at exactly 1.0 and nothing
//!    else loud).
//! 2. Chord, when more than one pitch class is loud.
//! 3. Single note at the pitch class normalized to exactly 1.0.

use crate::analysis::Segment;
use crate::note::{NoteEvent, NoteValue};

/// Confidence at or above which a pitch class counts as loud.
pub const LOUD_THRESHOLD: f64 = 0.75;

/// The analysis normalizes each segment so the strongest pitch class is 1.0.
const DOMINANT_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierParams {
    pub loud_threshold: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            loud_threshold: LOUD_THRESHOLD,
        }
    }
}

/// Why a segment could not be classified.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SegmentError {
    #[error("expected 12 pitch confidences, got {0}")]
    WrongLength(usize),

    #[error("pitch {pitch} confidence {value} is outside [0, 1]")]
    OutOfRange { pitch: usize, value: f64 },

    #[error("duration {0} is not positive")]
    NonPositiveDuration(f64),

    #[error("no pitch confidence equals 1.0")]
    NoDominantPitch,
}

/// Check the segment's shape and return its chroma as a fixed array.
pub fn validate(segment: &Segment) -> Result<[f64; 12], SegmentError> {
    let pitches: [f64; 12] = segment
        .pitches
        .as_slice()
        .try_into()
        .map_err(|_| SegmentError::WrongLength(segment.pitches.len()))?;

    if let Some((pitch, &value)) = pitches
        .iter()
        .enumerate()
        .find(|(_, v)| !(0.0..=1.0).contains(*v))
    {
        return Err(SegmentError::OutOfRange { pitch, value });
    }

    // NaN fails the comparison too
    if !(segment.duration > 0.0 && segment.duration.is_finite()) {
        return Err(SegmentError::NonPositiveDuration(segment.duration));
    }

    Ok(pitches)
}

/// Pitch classes at or above `threshold`, ascending.
pub fn loud_pitches(pitches: &[f64; 12], threshold: f64) -> Vec<u8> {
    pitches
        .iter()
        .enumerate()
        .filter(|&(_, &confidence)| confidence >= threshold)
        .map(|(i, _)| i as u8)
        .collect()
}

/// The analysis marks "no detected pitch" by pinning pitch classes 0 and 1
/// to full confidence.
pub fn is_silence_marker(pitches: &[f64; 12]) -> bool {
    pitches[0] == DOMINANT_CONFIDENCE && pitches[1] == DOMINANT_CONFIDENCE
}

/// First pitch class whose confidence is exactly 1.0.
pub fn dominant_pitch(pitches: &[f64; 12]) -> Option<u8> {
    pitches
        .iter()
        .position(|&confidence| confidence == DOMINANT_CONFIDENCE)
        .map(|i| i as u8)
}

/// Classify with the default 0.75 loudness threshold.
pub fn classify(segment: &Segment) -> Result<NoteEvent, SegmentError> {
    classify_with(segment, &ClassifierParams::default())
}

pub fn classify_with(segment: &Segment, params: &ClassifierParams) -> Result<NoteEvent, SegmentError> {
    let pitches = validate(segment)?;
    let loud = loud_pitches(&pitches, params.loud_threshold);

    let value = if is_silence_marker(&pitches) && loud.iter().all(|&p| p < 2) {
        NoteValue::Silence
    } else if loud.len() > 1 {
        NoteValue::Chord(loud)
    } else {
        dominant_pitch(&pitches)
            .map(NoteValue::Single)
            .ok_or(SegmentError::NoDominantPitch)?
    };

    Ok(NoteEvent {
        time: segment.start,
        duration: segment.duration,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chroma(base: f64, set: &[(usize, f64)]) -> Vec<f64> {
        let mut pitches = vec![base; 12];
        for &(i, v) in set {
            pitches[i] = v;
        }
        pitches
    }

    #[test]
    fn single_dominant_pitch() {
        let segment = Segment::new(1.0, 0.4, chroma(0.1, &[(3, 1.0)]));
        assert_eq!(
            classify(&segment).unwrap(),
            NoteEvent {
                time: 1.0,
                duration: 0.4,
                value: NoteValue::Single(3),
            }
        );
    }

    #[test]
    fn two_loud_pitches_make_a_chord_of_indices() {
        let segment = Segment::new(2.0, 0.5, chroma(0.2, &[(2, 0.9), (7, 0.9)]));
        let event = classify(&segment).unwrap();
        assert_eq!(event.value, NoteValue::Chord(vec![2, 7]));
    }

    #[test]
    fn chord_includes_dominant_and_threshold_pitches() {
        let segment = Segment::new(0.0, 0.3, chroma(0.0, &[(4, 1.0), (9, 0.75), (11, 0.74)]));
        assert_eq!(classify(&segment).unwrap().value, NoteValue::Chord(vec![4, 9]));
    }

    #[test]
    fn silence_marker_yields_silence() {
        let segment = Segment::new(0.0, 0.2, chroma(0.05, &[(0, 1.0), (1, 1.0)]));
        assert_eq!(classify(&segment).unwrap().value, NoteValue::Silence);
    }

    #[test]
    fn silence_marker_with_other_loud_pitches_is_a_chord() {
        let segment = Segment::new(0.0, 0.2, chroma(0.05, &[(0, 1.0), (1, 1.0), (5, 0.8)]));
        assert_eq!(classify(&segment).unwrap().value, NoteValue::Chord(vec![0, 1, 5]));
    }

    #[test]
    fn pitch_zero_alone_is_a_note() {
        let segment = Segment::new(0.0, 0.2, chroma(0.05, &[(0, 1.0)]));
        assert_eq!(classify(&segment).unwrap().value, NoteValue::Single(0));
    }

    #[test]
    fn missing_dominant_pitch_is_an_error() {
        let segment = Segment::new(0.0, 0.2, chroma(0.1, &[(6, 0.95)]));
        assert_eq!(classify(&segment), Err(SegmentError::NoDominantPitch));
    }

    #[test]
    fn shape_errors() {
        assert_eq!(
            classify(&Segment::new(0.0, 0.2, vec![1.0, 1.0])),
            Err(SegmentError::WrongLength(2))
        );
        assert_eq!(
            classify(&Segment::new(0.0, 0.2, chroma(0.1, &[(3, 1.0), (8, 1.5)]))),
            Err(SegmentError::OutOfRange { pitch: 8, value: 1.5 })
        );
        assert_eq!(
            classify(&Segment::new(0.0, 0.0, chroma(0.1, &[(3, 1.0)]))),
            Err(SegmentError::NonPositiveDuration(0.0))
        );
    }

    #[test]
    fn nan_confidence_is_out_of_range() {
        let err = classify(&Segment::new(0.0, 0.2, chroma(0.1, &[(2, f64::NAN)]))).unwrap_err();
        assert!(matches!(err, SegmentError::OutOfRange { pitch: 2, .. }));
    }

    #[test]
    fn classification_is_pure() {
        let segment = Segment::new(3.5, 0.25, chroma(0.3, &[(10, 1.0)]));
        assert_eq!(classify(&segment), classify(&segment));
    }

    #[test]
    fn custom_threshold() {
        let segment = Segment::new(0.0, 0.2, chroma(0.1, &[(2, 1.0), (7, 0.8)]));
        let strict = ClassifierParams { loud_threshold: 0.85 };
        assert_eq!(classify_with(&segment, &strict).unwrap().value, NoteValue::Single(2));
    }

    #[test]
    fn loud_pitches_sorted() {
        let pitches: [f64; 12] = chroma(0.0, &[(11, 0.9), (1, 0.8)]).try_into().unwrap();
        assert_eq!(loud_pitches(&pitches, LOUD_THRESHOLD), vec![1, 11]);
    }
}
