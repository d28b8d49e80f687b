//! Note player: presses the keys for one note event, holds them for the
//! event's duration, then releases them.
//!
//! Playback is blocking. The hold is what paces the whole performance: the
//! listener hears press length as note length, so the next event must not
//! start until this one has been released.

use std::thread;
use std::time::Duration;

use synthconf::SynthConfig;
use tracing::{debug, trace};

use crate::keymap::key_for;
use crate::note::NoteEvent;
use crate::sink::{HeldKeys, KeySink, SinkError};

/// Gap left before the next key-down so repeated notes re-trigger.
pub const DEFAULT_RELEASE_SLOP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub release_slop: Duration,
}

impl PlayerConfig {
    pub fn from_config(config: &SynthConfig) -> Self {
        Self {
            release_slop: Duration::from_millis(config.playback.release_slop_ms),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            release_slop: DEFAULT_RELEASE_SLOP,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    #[error("pitch {0} has no key")]
    UnmappedPitch(u8),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// What a single `play` call did.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOutcome {
    pub keys: Vec<char>,
    pub held_for: Duration,
}

pub struct Player<S: KeySink> {
    sink: S,
    config: PlayerConfig,
}

impl<S: KeySink> Player<S> {
    pub fn new(sink: S, config: PlayerConfig) -> Self {
        Self { sink, config }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Event duration minus the release slop, never negative.
    ///
    /// Durations too long for `Duration` saturate at `Duration::MAX`.
    pub fn hold_duration(&self, event: &NoteEvent) -> Duration {
        let seconds = event.duration - self.config.release_slop.as_secs_f64();
        if seconds.is_nan() || seconds <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }

    /// Play one event, blocking for its hold time.
    ///
    /// Every pitch is resolved before any key goes down, so an unmapped
    /// pitch leaves the keyboard untouched. Silence presses nothing but
    /// still holds, keeping later notes on time.
    pub fn play(&mut self, event: &NoteEvent) -> Result<PlayOutcome, PlayError> {
        let keys = event
            .value
            .pitches()
            .iter()
            .map(|&pitch| key_for(pitch).ok_or(PlayError::UnmappedPitch(pitch)))
            .collect::<Result<Vec<char>, PlayError>>()?;

        let hold = self.hold_duration(event);

        let mut held = HeldKeys::new(&mut self.sink);
        for &key in &keys {
            held.press(key)?;
        }

        debug!(
            time = event.time,
            keys = ?keys,
            hold_ms = hold.as_millis() as u64,
            "holding"
        );
        thread::sleep(hold);

        held.release_all()?;
        trace!(keys = ?keys, "released");

        Ok(PlayOutcome {
            keys,
            held_for: hold,
        })
    }
}
