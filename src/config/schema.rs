//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::synth::{Kit, ToneKind, DEFAULT_KIT};

/// Main configuration for tonebox
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToneboxConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Master output level
    #[serde(default)]
    pub master: MasterConfig,

    /// Instrument selections
    #[serde(default)]
    pub instrument: InstrumentConfig,

    /// Sequence playback
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Multi-track mixer
    #[serde(default)]
    pub mixer: MixerConfig,

    /// Extra drum kits on top of the presets
    #[serde(default)]
    pub kits: Vec<Kit>,
}

impl ToneboxConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.buffer_size < 64 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }

        if !(0.0..=1.0).contains(&self.master.volume) {
            bail!("Master volume must be between 0.0 and 1.0");
        }

        if self.playback.tick_interval_ms < 1 || self.playback.tick_interval_ms > 1000 {
            bail!("Tick interval must be between 1 and 1000 ms");
        }
        if self.playback.melody_note_ms == 0 {
            bail!("Melody note length must be positive");
        }

        if !(self.mixer.loop_duration_secs > 0.0) {
            bail!("Mixer loop duration must be positive");
        }

        let mut names = HashSet::new();
        for kit in &self.kits {
            if kit.name.trim().is_empty() {
                bail!("Kit names must not be empty");
            }
            if !names.insert(kit.name.to_ascii_uppercase()) {
                bail!("Kit '{}' is defined more than once", kit.name);
            }
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Buffer size in samples (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            device: None,
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> u32 { 512 }

/// Master settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 0.8)
    #[serde(default = "default_volume")]
    pub volume: f64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self { volume: default_volume() }
    }
}

fn default_volume() -> f64 { 0.8 }

/// Which kit and tone the instruments start with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Drum kit name (default: STANDARD)
    #[serde(default = "default_kit")]
    pub kit: String,

    /// Keyboard tone (default: PIANO)
    #[serde(default = "default_tone")]
    pub tone: ToneKind,

    /// Long releases on the keyboard
    #[serde(default)]
    pub sustain: bool,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            kit: default_kit(),
            tone: default_tone(),
            sustain: false,
        }
    }
}

fn default_kit() -> String { DEFAULT_KIT.to_string() }
fn default_tone() -> ToneKind { ToneKind::Piano }

/// Sequence playback timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Progress tick period (default: 50)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Length of melodic notes that carry no duration (default: 300)
    #[serde(default = "default_melody_note")]
    pub melody_note_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            melody_note_ms: default_melody_note(),
        }
    }
}

fn default_tick_interval() -> u64 { 50 }
fn default_melody_note() -> u64 { 300 }

/// Mixer transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Transport loop length (default: 8.0)
    #[serde(default = "default_loop_duration")]
    pub loop_duration_secs: f64,

    /// Tracks created up front (default: 4)
    #[serde(default = "default_tracks")]
    pub tracks: usize,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            loop_duration_secs: default_loop_duration(),
            tracks: default_tracks(),
        }
    }
}

fn default_loop_duration() -> f64 { 8.0 }
fn default_tracks() -> usize { 4 }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::Pad;

    #[test]
    fn test_default_audio_config() {
        let yaml = "sample_rate: 48000";
        let config: AudioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 512); // default
    }

    #[test]
    fn test_instrument_config() {
        let yaml = "kit: TECHNO\ntone: flute\nsustain: true";
        let config: InstrumentConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kit, "TECHNO");
        assert_eq!(config.tone, ToneKind::Flute);
        assert!(config.sustain);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ToneboxConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.master.volume, 0.8);
        assert_eq!(config.instrument.tone, ToneKind::Piano);
        assert_eq!(config.playback.tick_interval_ms, 50);
        assert_eq!(config.mixer.loop_duration_secs, 8.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ToneboxConfig::default();
        assert!(config.validate().is_ok());

        config.master.volume = 1.5;
        assert!(config.validate().is_err());

        config.master.volume = 0.5;
        config.playback.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        config.playback.tick_interval_ms = 50;
        config.mixer.loop_duration_secs = 0.0;
        assert!(config.validate().is_err());

        config.mixer.loop_duration_secs = 4.0;
        config.audio.buffer_size = 32;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_kits_rejected() {
        let mut config = ToneboxConfig::default();
        config.kits = vec![Kit::new("LOFI"), Kit::new("lofi")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_kit() {
        let yaml = r#"
kits:
  - name: LOFI
    labels: [A, B, C, D, E, F, G, H]
    pads:
      kick: { frequency: 60.0 }
"#;
        let config: ToneboxConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kits[0].params(Pad::Kick).frequency, Some(60.0));
        assert!(config.validate().is_ok());
    }
}
