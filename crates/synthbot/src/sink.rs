//! Key injection sinks.
//!
//! A sink turns symbolic key-down/key-up signals into whatever the listener
//! hears: real OS input events, log records, or an in-memory trace.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, warn};

/// Error type for key signal delivery
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    #[error("Key sink unavailable: {0}")]
    Unavailable(String),

    #[error("Key '{key}' rejected: {reason}")]
    Rejected { key: char, reason: String },
}

/// Destination for key-down/key-up signals.
///
/// Calls are serialized through `&mut self`; a sink shared between playback
/// streams must be wrapped in a lock by the caller.
pub trait KeySink {
    fn press(&mut self, key: char) -> Result<(), SinkError>;

    fn release(&mut self, key: char) -> Result<(), SinkError>;
}

impl<S: KeySink + ?Sized> KeySink for &mut S {
    fn press(&mut self, key: char) -> Result<(), SinkError> {
        (**self).press(key)
    }

    fn release(&mut self, key: char) -> Result<(), SinkError> {
        (**self).release(key)
    }
}

impl<S: KeySink + ?Sized> KeySink for Box<S> {
    fn press(&mut self, key: char) -> Result<(), SinkError> {
        (**self).press(key)
    }

    fn release(&mut self, key: char) -> Result<(), SinkError> {
        (**self).release(key)
    }
}

/// Keys pressed through one sink, released when the guard goes away.
///
/// Only keys pressed through the guard are released, so other input on the
/// same keyboard is left alone.
pub struct HeldKeys<'a, S: KeySink + ?Sized> {
    sink: &'a mut S,
    held: Vec<char>,
}

impl<'a, S: KeySink + ?Sized> HeldKeys<'a, S> {
    pub fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            held: Vec::new(),
        }
    }

    pub fn press(&mut self, key: char) -> Result<(), SinkError> {
        self.sink.press(key)?;
        self.held.push(key);
        Ok(())
    }

    pub fn held(&self) -> &[char] {
        &self.held
    }

    /// Release every held key, attempting all of them even if one fails.
    ///
    /// Returns the first failure.
    pub fn release_all(mut self) -> Result<(), SinkError> {
        self.release_held()
    }

    fn release_held(&mut self) -> Result<(), SinkError> {
        let mut first_error = None;
        for key in self.held.drain(..) {
            if let Err(e) = self.sink.release(key) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<S: KeySink + ?Sized> Drop for HeldKeys<'_, S> {
    fn drop(&mut self) {
        if self.held.is_empty() {
            return;
        }
        if let Err(e) = self.release_held() {
            warn!("Failed to release held keys: {}", e);
        }
    }
}

/// Sink that only logs signals (default when no keyboard is attached)
pub struct LoggingKeySink;

impl KeySink for LoggingKeySink {
    fn press(&mut self, key: char) -> Result<(), SinkError> {
        debug!(key = %key, "key down");
        Ok(())
    }

    fn release(&mut self, key: char) -> Result<(), SinkError> {
        debug!(key = %key, "key up");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySignal {
    Down(char),
    Up(char),
}

impl KeySignal {
    pub fn key(self) -> char {
        match self {
            Self::Down(key) | Self::Up(key) => key,
        }
    }
}

/// A key signal with the instant it reached the sink
#[derive(Debug, Clone, Copy)]
pub struct RecordedSignal {
    pub signal: KeySignal,
    pub at: Instant,
}

/// In-memory sink; clones share one trace.
#[derive(Debug, Clone, Default)]
pub struct RecordingKeySink {
    trace: Arc<Mutex<Vec<RecordedSignal>>>,
}

impl RecordingKeySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every signal received so far, in arrival order.
    pub fn signals(&self) -> Vec<RecordedSignal> {
        self.trace
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.trace
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, signal: KeySignal) {
        self.trace
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedSignal {
                signal,
                at: Instant::now(),
            });
    }
}

impl KeySink for RecordingKeySink {
    fn press(&mut self, key: char) -> Result<(), SinkError> {
        self.push(KeySignal::Down(key));
        Ok(())
    }

    fn release(&mut self, key: char) -> Result<(), SinkError> {
        self.push(KeySignal::Up(key));
        Ok(())
    }
}

#[cfg(feature = "keyboard")]
pub use self::keyboard::EnigoKeySink;

#[cfg(feature = "keyboard")]
mod keyboard {
    use enigo::{Direction, Enigo, Key, Keyboard, Settings};
    use tracing::info;

    use super::{KeySink, SinkError};

    /// OS-level key injection through enigo
    pub struct EnigoKeySink {
        enigo: Enigo,
    }

    impl EnigoKeySink {
        pub fn connect() -> Result<Self, SinkError> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| SinkError::Unavailable(e.to_string()))?;
            info!("Connected to OS keyboard");
            Ok(Self { enigo })
        }

        fn send(&mut self, key: char, direction: Direction) -> Result<(), SinkError> {
            self.enigo
                .key(Key::Unicode(key), direction)
                .map_err(|e| SinkError::Unavailable(e.to_string()))
        }
    }

    impl KeySink for EnigoKeySink {
        fn press(&mut self, key: char) -> Result<(), SinkError> {
            self.send(key, Direction::Press)
        }

        fn release(&mut self, key: char) -> Result<(), SinkError> {
            self.send(key, Direction::Release)
        }
    }
}
