//! Pad practice: listen to a short random pattern, then play it back

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::sequence::{Event, Sequence};
use crate::synth::Pad;

/// Pads a practice pattern is drawn from
pub const PRACTICE_PADS: [Pad; 5] = [Pad::Kick, Pad::Snare, Pad::HiHat, Pad::TomHigh, Pad::Clap];

/// Pattern lengths offered as difficulty levels
pub const PRACTICE_LEVELS: [usize; 3] = [4, 8, 12];

/// Gap between hits in the demo
pub const DEMO_SPACING_MS: u64 = 500;

/// Result of one hit during practice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Right pad, more to go
    Advanced,
    /// Right pad, pattern complete
    Perfect,
    /// Wrong pad; start over from the first hit
    Mistake,
    /// The session already ended
    Ignored,
}

/// One practice round
#[derive(Debug, Clone)]
pub struct PracticeSession {
    pattern: Vec<Pad>,
    index: usize,
    active: bool,
}

impl PracticeSession {
    /// Draw a random pattern of `length` hits
    pub fn new<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Self {
        let pattern = (0..length)
            .filter_map(|_| PRACTICE_PADS.choose(rng).copied())
            .collect();
        Self::from_pattern(pattern)
    }

    pub fn from_pattern(pattern: Vec<Pad>) -> Self {
        info!(length = pattern.len(), "Practice started");
        Self {
            active: !pattern.is_empty(),
            pattern,
            index: 0,
        }
    }

    pub fn pattern(&self) -> &[Pad] {
        &self.pattern
    }

    /// How many hits have been matched so far
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The pattern as a percussive sequence, one hit every half second
    pub fn demo_sequence(&self) -> Sequence {
        let events = self
            .pattern
            .iter()
            .enumerate()
            .map(|(i, pad)| Event::new(pad.id(), i as u64 * DEMO_SPACING_MS))
            .collect();
        Sequence::percussive(None, events).with_title("Practice")
    }

    /// Check the next hit. `key` accepts any pad alias.
    pub fn check(&mut self, key: &str) -> Attempt {
        if !self.active {
            return Attempt::Ignored;
        }

        let expected = self.pattern.get(self.index).copied();
        if expected.is_some() && Pad::from_key(key) == expected {
            self.index += 1;
            if self.index >= self.pattern.len() {
                info!(length = self.pattern.len(), "Practice perfect");
                self.active = false;
                return Attempt::Perfect;
            }
            return Attempt::Advanced;
        }

        debug!(key, position = self.index, "Practice mistake");
        self.index = 0;
        Attempt::Mistake
    }

    /// End the round early
    pub fn stop(&mut self) {
        self.active = false;
        self.index = 0;
    }
}
