//! Performance recorder
//!
//! Captures live key presses or pad hits with their wall-clock offsets so
//! they can be saved and played back as a sequence.

use std::sync::Arc;

use tracing::info;

use super::clock::Clock;
use crate::sequence::{Event, Sequence, SequenceKind};

/// Records events against a wall clock
pub struct Recorder {
    clock: Arc<dyn Clock>,
    kind: SequenceKind,
    recording: bool,
    started_ms: f64,
    events: Vec<Event>,
}

impl Recorder {
    /// Create a recorder whose output sequences have the given kind
    pub fn new(clock: Arc<dyn Clock>, kind: SequenceKind) -> Self {
        Self {
            clock,
            kind,
            recording: false,
            started_ms: 0.0,
            events: Vec::new(),
        }
    }

    /// Clear the buffer and start recording from now
    pub fn start(&mut self) {
        self.events.clear();
        self.started_ms = self.clock.now_ms();
        self.recording = true;
        info!(kind = ?self.kind, "Recording started");
    }

    /// Append `key` at the current offset. Ignored when not recording.
    pub fn log_event(&mut self, key: &str) {
        if !self.recording {
            return;
        }
        let offset = (self.clock.now_ms() - self.started_ms).max(0.0);
        self.events.push(Event::new(key, offset.round() as u64));
    }

    /// Stop recording and return what was captured. The buffer is kept.
    pub fn stop(&mut self) -> Sequence {
        if self.recording {
            info!(events = self.events.len(), "Recording stopped");
        }
        self.recording = false;
        Sequence::new(self.kind.clone(), self.events.clone())
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Change the kind of future output, e.g. after a kit or tone change
    pub fn set_kind(&mut self, kind: SequenceKind) {
        self.kind = kind;
    }
}
