//! Render a played note log as a Standard MIDI File.
//!
//! Pitch classes land in a single octave starting at `base_note`; silences
//! produce no events.

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};

use crate::keymap::PitchClass;
use crate::note::NoteEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Default: 480
    pub ticks_per_beat: u16,
    /// Default: 120
    pub beats_per_minute: u32,
    /// MIDI note for pitch class 0. Default: 60 (middle C)
    pub base_note: u8,
    /// Default: 80
    pub velocity: u8,
    /// Default: 0
    pub channel: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ticks_per_beat: 480,
            beats_per_minute: 120,
            base_note: 60,
            velocity: 80,
            channel: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AbsoluteEvent {
    tick: u32,
    key: u8,
    on: bool,
}

/// Note on/off pairs at absolute ticks, note-offs first on shared ticks so
/// repeated notes retrigger.
fn absolute_events(events: &[NoteEvent], options: &ExportOptions) -> Vec<AbsoluteEvent> {
    let ticks_per_second =
        f64::from(options.ticks_per_beat.min(0x7FFF)) * f64::from(options.beats_per_minute.max(4)) / 60.0;
    let to_tick = |seconds: f64| (seconds.max(0.0) * ticks_per_second).round() as u32;
    let top = 127 - (PitchClass::COUNT as u8 - 1);
    let base = options.base_note.min(top);

    let mut absolute = Vec::new();
    for event in events {
        let start = to_tick(event.time);
        let end = to_tick(event.time + event.duration).max(start);
        for pitch in event.value.pitches().iter().filter_map(|&p| PitchClass::new(p)) {
            let key = base + pitch.index();
            absolute.push(AbsoluteEvent { tick: start, key, on: true });
            absolute.push(AbsoluteEvent { tick: end, key, on: false });
        }
    }

    absolute.sort_by_key(|e| (e.tick, e.on));
    absolute
}

/// Largest delta-time a track event can carry.
const MAX_DELTA: u32 = (1 << 28) - 1;

/// Encode events as a format-0 MIDI file.
///
/// Fails with `InvalidData` when a gap between events is too long to encode
/// as a single delta-time.
pub fn events_to_midi(events: &[NoteEvent], options: &ExportOptions) -> std::io::Result<Vec<u8>> {
    let channel = u4::new(options.channel.min(15));
    let vel = u7::new(options.velocity.min(127));

    let mut track = Track::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(
            (60_000_000 / options.beats_per_minute.max(4)).min(0xFF_FFFF),
        ))),
    });

    let mut last_tick = 0u32;
    for event in absolute_events(events, options) {
        let key = u7::new(event.key);
        let message = if event.on {
            MidiMessage::NoteOn { key, vel }
        } else {
            MidiMessage::NoteOff { key, vel }
        };
        let delta = event.tick - last_tick;
        if delta > MAX_DELTA {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("gap of {} ticks before tick {} exceeds the MIDI delta range", delta, event.tick),
            ));
        }
        track.push(TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = event.tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(options.ticks_per_beat.min(0x7FFF))),
    ));
    smf.tracks.push(track);

    let mut buffer = Vec::new();
    smf.write_std(&mut buffer)?;
    Ok(buffer)
}
