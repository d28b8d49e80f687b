//! Playback session: drives segments through the classifier and player,
//! one at a time, in analysis order.
//!
//! The session owns the key sink for its whole lifetime. Cancellation is
//! checked before each segment; the player never leaves keys down on any
//! exit path, so stopping between notes cannot strand a held key.

use std::thread;
use std::time::{Duration, Instant};

use synthconf::SynthConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analysis::Segment;
use crate::classify::{classify_with, ClassifierParams, SegmentError};
use crate::note::NoteEvent;
use crate::notelog::NoteLog;
use crate::player::{PlayError, Player};
use crate::sink::{KeySink, SinkError};

/// Granularity of cancellation checks during the lead-in wait.
const LEAD_IN_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Abort on the first bad segment instead of skipping it.
    pub strict: bool,
    /// Wait before the first note.
    pub lead_in: Duration,
    pub classifier: ClassifierParams,
}

impl SessionConfig {
    pub fn from_config(config: &SynthConfig) -> Self {
        Self {
            strict: config.playback.strict,
            lead_in: Duration::from_millis(config.playback.lead_in_ms),
            classifier: ClassifierParams {
                loud_threshold: config.classifier.loud_threshold,
            },
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strict: false,
            lead_in: Duration::ZERO,
            classifier: ClassifierParams::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("segment {index} at {start:.3}s is malformed: {source}")]
    MalformedSegment {
        index: usize,
        start: f64,
        source: SegmentError,
    },

    #[error("segment {index} at {start:.3}s: pitch {pitch} has no key")]
    UnmappedPitch { index: usize, start: f64, pitch: u8 },

    #[error("key sink failed during segment {index} at {start:.3}s: {source}")]
    SinkUnavailable {
        index: usize,
        start: f64,
        source: SinkError,
    },
}

/// A segment that was reported and passed over.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSegment {
    pub index: usize,
    pub start: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackReport {
    /// Events handed to the player, silences included.
    pub played: usize,
    pub silences: usize,
    pub skipped: Vec<SkippedSegment>,
    /// Stopped by the cancellation token before the end.
    pub cancelled: bool,
}

impl PlaybackReport {
    pub fn total_segments(&self) -> usize {
        self.played + self.skipped.len()
    }
}

pub struct Session<S: KeySink> {
    player: Player<S>,
    config: SessionConfig,
}

impl<S: KeySink> Session<S> {
    pub fn new(player: Player<S>, config: SessionConfig) -> Self {
        Self { player, config }
    }

    pub fn player(&self) -> &Player<S> {
        &self.player
    }

    pub fn into_player(self) -> Player<S> {
        self.player
    }

    /// Classify and play every segment in order.
    pub fn run(
        &mut self,
        segments: &[Segment],
        log: &mut dyn NoteLog,
        cancel: &CancellationToken,
    ) -> Result<PlaybackReport, PlaybackError> {
        let mut report = PlaybackReport::default();
        info!(segments = segments.len(), "starting playback");

        if !self.lead_in(cancel) {
            report.cancelled = true;
            return Ok(report);
        }

        for (index, segment) in segments.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(index, "playback cancelled");
                report.cancelled = true;
                break;
            }

            match classify_with(segment, &self.config.classifier) {
                Ok(event) => self.perform(index, &event, log, &mut report)?,
                Err(source) => {
                    if self.config.strict {
                        return Err(PlaybackError::MalformedSegment {
                            index,
                            start: segment.start,
                            source,
                        });
                    }
                    warn!(
                        index,
                        start = segment.start,
                        error = %source,
                        "skipping malformed segment"
                    );
                    report.skipped.push(SkippedSegment {
                        index,
                        start: segment.start,
                        reason: source.to_string(),
                    });
                }
            }
        }

        info!(
            total = report.total_segments(),
            played = report.played,
            skipped = report.skipped.len(),
            "playback finished"
        );
        Ok(report)
    }

    /// Play already-classified events, e.g. from a recorded note log.
    pub fn replay(
        &mut self,
        events: &[NoteEvent],
        log: &mut dyn NoteLog,
        cancel: &CancellationToken,
    ) -> Result<PlaybackReport, PlaybackError> {
        let mut report = PlaybackReport::default();
        info!(events = events.len(), "starting replay");

        if !self.lead_in(cancel) {
            report.cancelled = true;
            return Ok(report);
        }

        for (index, event) in events.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(index, "replay cancelled");
                report.cancelled = true;
                break;
            }
            self.perform(index, event, log, &mut report)?;
        }

        Ok(report)
    }

    fn perform(
        &mut self,
        index: usize,
        event: &NoteEvent,
        log: &mut dyn NoteLog,
        report: &mut PlaybackReport,
    ) -> Result<(), PlaybackError> {
        match self.player.play(event) {
            Ok(_) => {
                report.played += 1;
                if event.value.is_silence() {
                    report.silences += 1;
                }
                log.record(index, event);
                Ok(())
            }
            Err(PlayError::UnmappedPitch(pitch)) => {
                if self.config.strict {
                    return Err(PlaybackError::UnmappedPitch {
                        index,
                        start: event.time,
                        pitch,
                    });
                }
                warn!(index, start = event.time, pitch, "skipping unmapped pitch");
                report.skipped.push(SkippedSegment {
                    index,
                    start: event.time,
                    reason: format!("pitch {} has no key", pitch),
                });
                Ok(())
            }
            Err(PlayError::Sink(source)) => Err(PlaybackError::SinkUnavailable {
                index,
                start: event.time,
                source,
            }),
        }
    }

    /// Returns false if cancelled while waiting.
    fn lead_in(&self, cancel: &CancellationToken) -> bool {
        if self.config.lead_in.is_zero() {
            return !cancel.is_cancelled();
        }

        info!(
            lead_in_ms = self.config.lead_in.as_millis() as u64,
            "waiting before first note"
        );
        let deadline = Instant::now() + self.config.lead_in;
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            thread::sleep(remaining.min(LEAD_IN_POLL));
        }
    }
}
