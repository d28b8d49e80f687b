//! Recording a session to disk and playing it back.

use pretty_assertions::assert_eq;
use synthbot::notelog::write_json;
use synthbot::{
    load_note_log, KeySignal, MemoryNoteLog, NoteValue, PlaybackError, Player, PlayerConfig,
    RecordingKeySink, Segment, Session, SessionConfig,
};
use tokio_util::sync::CancellationToken;

fn segments() -> Vec<Segment> {
    let mut low = vec![0.05; 12];
    low[0] = 1.0;
    let mut chord = vec![0.05; 12];
    chord[4] = 1.0;
    chord[9] = 0.8;
    let mut rest = vec![0.4; 12];
    rest[0] = 1.0;
    rest[1] = 1.0;
    vec![
        Segment::new(0.0, 0.03, low),
        Segment::new(0.03, 0.03, chord),
        Segment::new(0.06, 0.02, rest),
    ]
}

fn trace(sink: &RecordingKeySink) -> Vec<KeySignal> {
    sink.signals().iter().map(|s| s.signal).collect()
}

#[test]
fn recorded_log_replays_the_same_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");

    let live = RecordingKeySink::new();
    let mut session = Session::new(
        Player::new(live.clone(), PlayerConfig::default()),
        SessionConfig::default(),
    );
    let mut log = MemoryNoteLog::new();
    session
        .run(&segments(), &mut log, &CancellationToken::new())
        .unwrap();
    write_json(&path, &log.into_document()).unwrap();

    let document = load_note_log(&path).unwrap();
    assert_eq!(document.notes.len(), 3);
    assert_eq!(document.notes[1].value, NoteValue::Chord(vec![4, 9]));
    assert_eq!(document.notes[2].value, NoteValue::Silence);

    let replayed = RecordingKeySink::new();
    let mut session = Session::new(
        Player::new(replayed.clone(), PlayerConfig::default()),
        SessionConfig::default(),
    );
    let report = session
        .replay(&document.notes, &mut MemoryNoteLog::new(), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.played, 3);
    assert_eq!(report.silences, 1);
    assert_eq!(trace(&replayed), trace(&live));
}

#[test]
fn hand_edited_log_with_unknown_pitch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edited.json");
    std::fs::write(
        &path,
        r#"{"notes": [
            {"note_time": 0.0, "note_duration": 0.02, "note_value": 14},
            {"note_time": 0.02, "note_duration": 0.02, "note_value": 6}
        ]}"#,
    )
    .unwrap();
    let document = load_note_log(&path).unwrap();

    let sink = RecordingKeySink::new();
    let mut session = Session::new(
        Player::new(sink.clone(), PlayerConfig::default()),
        SessionConfig::default(),
    );
    let report = session
        .replay(&document.notes, &mut MemoryNoteLog::new(), &CancellationToken::new())
        .unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(trace(&sink), vec![KeySignal::Down('m'), KeySignal::Up('m')]);

    let strict = SessionConfig {
        strict: true,
        ..SessionConfig::default()
    };
    let mut session = Session::new(
        Player::new(RecordingKeySink::new(), PlayerConfig::default()),
        strict,
    );
    let err = session
        .replay(&document.notes, &mut MemoryNoteLog::new(), &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(
        err,
        PlaybackError::UnmappedPitch { index: 0, pitch: 14, .. }
    ));
}
