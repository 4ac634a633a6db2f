//! Tonal note synthesis
//!
//! Sequenced notes get a short attack and an exponential decay to the
//! end of the note. Live keys attack faster and ring until released.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::note::Tuning;
use super::oscillator::Waveform;
use crate::engine::{Engine, NodeId, SoundNode};

/// Attack time of a sequenced note
const ATTACK: f64 = 0.05;
/// Peak gain of a sequenced note
const PEAK: f64 = 0.3;
/// Gain a sequenced note decays to
const FLOOR: f64 = 0.01;
/// Extra time after the decay before the node is stopped
const TAIL: f64 = 0.1;

const KEY_ATTACK: f64 = 0.02;
const KEY_PEAK: f64 = 0.5;

/// Instrument voice for melodic playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToneKind {
    #[default]
    Default,
    Piano,
    Flute,
    Synth,
}

impl ToneKind {
    /// Parse a tone name, case-insensitively. Unknown names give `Default`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "piano" => ToneKind::Piano,
            "flute" => ToneKind::Flute,
            "synth" => ToneKind::Synth,
            _ => ToneKind::Default,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToneKind::Default => "DEFAULT",
            ToneKind::Piano => "PIANO",
            ToneKind::Flute => "FLUTE",
            ToneKind::Synth => "SYNTH",
        }
    }

    pub fn waveform(&self) -> Waveform {
        match self {
            ToneKind::Default | ToneKind::Piano => Waveform::Triangle,
            ToneKind::Flute => Waveform::Sine,
            ToneKind::Synth => Waveform::Sawtooth,
        }
    }
}

impl From<String> for ToneKind {
    fn from(name: String) -> Self {
        ToneKind::from_name(&name)
    }
}

impl From<ToneKind> for String {
    fn from(tone: ToneKind) -> Self {
        tone.name().to_string()
    }
}

impl fmt::Display for ToneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Produces tonal nodes on an engine
#[derive(Debug, Clone, Copy, Default)]
pub struct ToneSynth {
    tuning: Tuning,
}

impl ToneSynth {
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> Tuning {
        self.tuning
    }

    /// Schedule one note at `start` lasting `duration` seconds.
    ///
    /// A malformed note name plays at 440 Hz.
    pub fn synthesize(
        &self,
        engine: &mut Engine,
        note: &str,
        start: f64,
        duration: f64,
        tone: ToneKind,
    ) -> NodeId {
        let frequency = self.tuning.frequency_of(note);
        let duration = duration.max(0.0);
        let attack_end = start + ATTACK;
        let decay_end = (start + duration).max(attack_end);

        let mut node = SoundNode::oscillator(tone.waveform(), frequency, engine.sample_rate(), start)
            .with_stop(start + duration + TAIL);
        node.gain_mut()
            .set_value_at(0.0, start)
            .linear_ramp_to(PEAK, attack_end)
            .exponential_ramp_to(FLOOR, decay_end);

        engine.schedule(node)
    }

    /// Start a live key at the engine's current time.
    ///
    /// The note decays on its own (slowly when `sustain` is on) but has no
    /// stop time; the caller releases it.
    pub fn key_down(&self, engine: &mut Engine, note: &str, tone: ToneKind, sustain: bool) -> NodeId {
        let frequency = self.tuning.frequency_of(note);
        let start = engine.current_time();

        let mut node = SoundNode::oscillator(tone.waveform(), frequency, engine.sample_rate(), start);
        let gain = node.gain_mut();
        gain.set_value_at(0.0, start).linear_ramp_to(KEY_PEAK, start + KEY_ATTACK);
        if sustain {
            gain.exponential_ramp_to(0.3, start + 2.0);
        } else {
            gain.exponential_ramp_to(0.001, start + 0.5);
        }

        engine.schedule(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 1000.0;

    #[test]
    fn test_tone_kind_parsing() {
        assert_eq!(ToneKind::from_name("PIANO"), ToneKind::Piano);
        assert_eq!(ToneKind::from_name("flute"), ToneKind::Flute);
        assert_eq!(ToneKind::from_name(" Synth "), ToneKind::Synth);
        assert_eq!(ToneKind::from_name("kazoo"), ToneKind::Default);
        assert_eq!(ToneKind::from_name(""), ToneKind::Default);
    }

    #[test]
    fn test_tone_waveforms() {
        assert_eq!(ToneKind::Default.waveform(), Waveform::Triangle);
        assert_eq!(ToneKind::Piano.waveform(), Waveform::Triangle);
        assert_eq!(ToneKind::Flute.waveform(), Waveform::Sine);
        assert_eq!(ToneKind::Synth.waveform(), Waveform::Sawtooth);
    }

    #[test]
    fn test_synthesize_envelope_and_stop() {
        let mut engine = Engine::new(SR);
        let synth = ToneSynth::default();
        let id = synth.synthesize(&mut engine, "A4", 1.0, 0.3, ToneKind::Piano);

        let node = engine.node(id).unwrap();
        assert_eq!(node.start(), 1.0);
        assert!((node.stop_time().unwrap() - 1.4).abs() < 1e-9);

        let gain = node.gain();
        assert_eq!(gain.value_at(1.0), 0.0);
        assert!((gain.value_at(1.05) - 0.3).abs() < 1e-9);
        assert!((gain.value_at(1.3) - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_note_plays() {
        let mut engine = Engine::new(SR);
        let synth = ToneSynth::default();
        synth.synthesize(&mut engine, "", 0.0, 0.3, ToneKind::Default);
        synth.synthesize(&mut engine, "H9", 0.0, 0.3, ToneKind::Default);
        assert_eq!(engine.active_node_count(), 2);
    }

    #[test]
    fn test_key_down_has_no_stop() {
        let mut engine = Engine::new(SR);
        engine.advance(0.25);
        let synth = ToneSynth::new(Tuning::KEYBOARD);
        let id = synth.key_down(&mut engine, "C4", ToneKind::Flute, false);

        let node = engine.node(id).unwrap();
        assert_eq!(node.stop_time(), None);
        assert!((node.start() - 0.25).abs() < 1e-9);
        assert!((node.gain().value_at(0.27) - 0.5).abs() < 1e-9);
        assert!((node.gain().value_at(0.75) - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_key_down_sustain_decays_slowly() {
        let mut engine = Engine::new(SR);
        let synth = ToneSynth::new(Tuning::KEYBOARD);
        let id = synth.key_down(&mut engine, "C4", ToneKind::Piano, true);

        let gain = engine.node(id).unwrap().gain();
        assert!(gain.value_at(1.0) > 0.3);
        assert!((gain.value_at(2.0) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_tone_kind_serde() {
        let tone: ToneKind = serde_json::from_str("\"SYNTH\"").unwrap();
        assert_eq!(tone, ToneKind::Synth);
        assert_eq!(serde_json::to_string(&ToneKind::Flute).unwrap(), "\"FLUTE\"");
    }
}
