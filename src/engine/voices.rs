//! Held notes of the live keyboard
//!
//! At most one voice sounds per key. Pressing a key that is already held
//! cuts the old voice before the new one starts.

use std::collections::HashMap;

use tracing::trace;

use super::{Engine, NodeId};

/// Release length without sustain
const RELEASE: f64 = 0.1;
/// Release length with sustain
const SUSTAIN_RELEASE: f64 = 1.0;
/// Level the release ramps down to
const RELEASE_FLOOR: f64 = 0.001;
/// Time between the end of the release and the node stop
const RELEASE_TAIL: f64 = 0.1;

/// A sounding key
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub key: String,
    pub node: NodeId,
    /// Audio-clock time the voice started
    pub started_at: f64,
}

/// Voices keyed by note name
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: HashMap<String, Voice>,
    sustain: bool,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a voice for `key` using `start`, stopping any voice already
    /// held on that key first.
    pub fn note_on<F>(&mut self, engine: &mut Engine, key: &str, start: F) -> NodeId
    where
        F: FnOnce(&mut Engine) -> NodeId,
    {
        if let Some(old) = self.voices.remove(key) {
            engine.stop_node(old.node);
        }

        let started_at = engine.current_time();
        let node = start(engine);
        trace!(key, %node, "Voice on");
        self.voices.insert(
            key.to_string(),
            Voice {
                key: key.to_string(),
                node,
                started_at,
            },
        );
        node
    }

    /// Release the voice on `key`. Returns false when nothing was held.
    pub fn note_off(&mut self, engine: &mut Engine, key: &str) -> bool {
        let Some(voice) = self.voices.remove(key) else {
            return false;
        };

        let now = engine.current_time();
        let release_end = now + self.release_time();
        if let Some(gain) = engine.gain_param_mut(voice.node) {
            gain.hold_at(now).exponential_ramp_to(RELEASE_FLOOR, release_end);
        }
        engine.stop_node_at(voice.node, release_end + RELEASE_TAIL);
        trace!(key, node = %voice.node, "Voice off");
        true
    }

    /// Cut every voice immediately
    pub fn stop_all(&mut self, engine: &mut Engine) {
        for (_, voice) in self.voices.drain() {
            engine.stop_node(voice.node);
        }
    }

    /// Only affects releases that happen after the change
    pub fn set_sustain(&mut self, sustain: bool) {
        self.sustain = sustain;
    }

    pub fn sustain(&self) -> bool {
        self.sustain
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.voices.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Voice> {
        self.voices.get(key)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    fn release_time(&self) -> f64 {
        if self.sustain {
            SUSTAIN_RELEASE
        } else {
            RELEASE
        }
    }
}
