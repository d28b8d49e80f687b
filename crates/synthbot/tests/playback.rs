//! End-to-end playback tests against a recorded key trace.

use std::path::Path;
use std::time::Duration;

use pretty_assertions::assert_eq;
use synthbot::{
    load_analysis, KeySignal, KeySink, MemoryNoteLog, NoteValue, PlaybackError, Player,
    PlayerConfig, RecordingKeySink, Segment, Session, SessionConfig, SinkError,
};
use tokio_util::sync::CancellationToken;

/// Scheduler jitter allowance for wall-clock assertions.
const TOLERANCE: Duration = Duration::from_millis(40);

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.json", name))
}

fn recording_session(config: SessionConfig) -> (Session<RecordingKeySink>, RecordingKeySink) {
    let sink = RecordingKeySink::new();
    let player = Player::new(sink.clone(), PlayerConfig::default());
    (Session::new(player, config), sink)
}

fn single(start: f64, duration: f64, pitch: usize) -> Segment {
    let mut pitches = vec![0.1; 12];
    pitches[pitch] = 1.0;
    Segment::new(start, duration, pitches)
}

#[test]
fn fixture_phrase_plays_in_order() {
    let document = load_analysis(&fixture("short_phrase")).unwrap();
    let (mut session, sink) = recording_session(SessionConfig::default());
    let mut log = MemoryNoteLog::new();

    let report = session
        .run(&document.segments, &mut log, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.total_segments(), 5);
    assert_eq!(report.played, 4);
    assert_eq!(report.silences, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 3);
    assert!(!report.cancelled);

    let values: Vec<NoteValue> = log.events().iter().map(|e| e.value.clone()).collect();
    assert_eq!(
        values,
        vec![
            NoteValue::Single(3),
            NoteValue::Chord(vec![2, 7]),
            NoteValue::Silence,
            NoteValue::Single(11),
        ]
    );

    let signals: Vec<KeySignal> = sink.signals().iter().map(|s| s.signal).collect();
    assert_eq!(
        signals,
        vec![
            KeySignal::Down('v'),
            KeySignal::Up('v'),
            KeySignal::Down('c'),
            KeySignal::Down(','),
            KeySignal::Up('c'),
            KeySignal::Up(','),
            KeySignal::Down('s'),
            KeySignal::Up('s'),
        ]
    );
}

#[test]
fn hold_time_matches_duration_minus_slop() {
    let (mut session, sink) = recording_session(SessionConfig::default());

    session
        .run(&[single(1.0, 0.4, 3)], &mut MemoryNoteLog::new(), &CancellationToken::new())
        .unwrap();

    let signals = sink.signals();
    assert_eq!(signals[0].signal, KeySignal::Down('v'));
    assert_eq!(signals[1].signal, KeySignal::Up('v'));

    let held = signals[1].at.duration_since(signals[0].at);
    let expected = Duration::from_millis(389);
    assert!(held >= expected, "held {:?}, expected at least {:?}", held, expected);
    assert!(held < expected + TOLERANCE, "held {:?}, expected about {:?}", held, expected);
}

#[test]
fn next_note_waits_for_previous_release() {
    let (mut session, sink) = recording_session(SessionConfig::default());
    let segments = vec![single(0.0, 0.2, 0), single(0.2, 0.3, 5)];

    session
        .run(&segments, &mut MemoryNoteLog::new(), &CancellationToken::new())
        .unwrap();

    let signals = sink.signals();
    assert_eq!(signals.len(), 4);
    let first_up = signals[1];
    let second_down = signals[2];
    assert_eq!(first_up.signal, KeySignal::Up('z'));
    assert_eq!(second_down.signal, KeySignal::Down('n'));
    assert!(second_down.at >= first_up.at);

    // Second note starts roughly 0.19s after the first key went down
    let gap = second_down.at.duration_since(signals[0].at);
    assert!(gap >= Duration::from_millis(189));
}

#[test]
fn every_press_has_a_release() {
    let (mut session, sink) = recording_session(SessionConfig::default());
    let mut chord = vec![0.2; 12];
    chord[0] = 0.8;
    chord[4] = 1.0;
    chord[7] = 0.95;
    let segments = vec![
        single(0.0, 0.001, 9),
        Segment::new(0.001, 0.002, chord),
        single(0.003, 0.004, 9),
    ];

    session
        .run(&segments, &mut MemoryNoteLog::new(), &CancellationToken::new())
        .unwrap();

    let signals = sink.signals();
    let downs = signals.iter().filter(|s| matches!(s.signal, KeySignal::Down(_))).count();
    let ups = signals.iter().filter(|s| matches!(s.signal, KeySignal::Up(_))).count();
    assert_eq!(downs, 5);
    assert_eq!(ups, downs);
}

/// Refuses every key after the first `budget` signals.
struct DisconnectingSink {
    budget: usize,
    released: Vec<char>,
}

impl KeySink for DisconnectingSink {
    fn press(&mut self, key: char) -> Result<(), SinkError> {
        if self.budget == 0 {
            return Err(SinkError::Unavailable(format!("display gone before '{}'", key)));
        }
        self.budget -= 1;
        Ok(())
    }

    fn release(&mut self, key: char) -> Result<(), SinkError> {
        self.released.push(key);
        Ok(())
    }
}

#[test]
fn sink_failure_halts_with_segment_position() {
    let sink = DisconnectingSink {
        budget: 1,
        released: Vec::new(),
    };
    let mut session = Session::new(
        Player::new(sink, PlayerConfig::default()),
        SessionConfig::default(),
    );
    let segments = vec![single(0.0, 0.02, 0), single(0.75, 0.02, 1), single(0.9, 0.02, 2)];

    let err = session
        .run(&segments, &mut MemoryNoteLog::new(), &CancellationToken::new())
        .unwrap_err();

    match err {
        PlaybackError::SinkUnavailable { index, start, .. } => {
            assert_eq!(index, 1);
            assert_eq!(start, 0.75);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Only the key that actually went down was released
    let sink = session.into_player().into_sink();
    assert_eq!(sink.released, vec!['z']);
}
