//! Audio clips for the mixer
//!
//! Clips are immutable sample buffers shared by reference. They come from
//! WAV files or from the procedural default library.

use std::f64::consts::PI;
use std::path::Path;
use std::sync::Arc;

use hound::{SampleFormat, WavReader};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Length of the fade applied to the end of generated clips
const FADE_OUT: f64 = 0.1;

/// Mono samples at a fixed rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: f64,
    samples: Arc<[f32]>,
}

impl AudioBuffer {
    pub fn new(sample_rate: f64, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples: samples.into(),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Shared handle to the samples
    pub fn samples(&self) -> Arc<[f32]> {
        self.samples.clone()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Read a WAV file, mixing all channels down to mono
    pub fn load_wav(path: &Path) -> Result<Self> {
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<Vec<f32>, hound::Error>>()?
            }
        };

        if interleaved.is_empty() {
            return Err(Error::InvalidClip(format!("{} has no samples", path.display())));
        }

        let mono = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self::new(spec.sample_rate as f64, mono))
    }
}

/// Character of a generated clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipKind {
    Drum,
    Bass,
    Chord,
    Lead,
}

impl ClipKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClipKind::Drum => "drum",
            ClipKind::Bass => "bass",
            ClipKind::Chord => "chord",
            ClipKind::Lead => "lead",
        }
    }

    /// Render `duration` seconds of this kind of sound
    pub fn render(&self, sample_rate: f64, duration: f64, seed: u64) -> AudioBuffer {
        let frames = (sample_rate * duration).max(0.0) as usize;
        let mut rng = StdRng::seed_from_u64(seed);

        let samples = (0..frames)
            .map(|i| {
                let t = i as f64 / sample_rate;
                let raw = match self {
                    // Falling sine, a kick-like thump
                    ClipKind::Drum => {
                        let freq = 150.0 * (-10.0 * t).exp();
                        (2.0 * PI * freq * t).sin()
                    }
                    // 55 Hz sawtooth
                    ClipKind::Bass => ((t * 55.0) % 1.0) * 2.0 - 1.0,
                    ClipKind::Chord | ClipKind::Lead => rng.gen_range(-1.0..1.0) * 0.5,
                };
                let fade = if t > duration - FADE_OUT {
                    ((duration - t) / FADE_OUT).max(0.0)
                } else {
                    1.0
                };
                (raw * fade) as f32
            })
            .collect();

        AudioBuffer::new(sample_rate, samples)
    }
}

/// A built-in clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LibraryEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ClipKind,
    pub duration_secs: f64,
}

impl LibraryEntry {
    pub fn render(&self, sample_rate: f64) -> AudioBuffer {
        // Stable per-entry seed so the noise clips sound the same every run
        let seed = self.id.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        self.kind.render(sample_rate, self.duration_secs, seed)
    }
}

/// The clips every mixer starts with
pub static DEFAULT_LIBRARY: [LibraryEntry; 5] = [
    LibraryEntry {
        id: "kick1",
        name: "Kick Drum (4/4)",
        kind: ClipKind::Drum,
        duration_secs: 2.0,
    },
    LibraryEntry {
        id: "snare1",
        name: "Snare Snap",
        kind: ClipKind::Drum,
        duration_secs: 2.0,
    },
    LibraryEntry {
        id: "bass1",
        name: "Wobble Bass",
        kind: ClipKind::Bass,
        duration_secs: 4.0,
    },
    LibraryEntry {
        id: "pad1",
        name: "Ethereal Pad",
        kind: ClipKind::Chord,
        duration_secs: 8.0,
    },
    LibraryEntry {
        id: "lead1",
        name: "Acid Lead",
        kind: ClipKind::Lead,
        duration_secs: 4.0,
    },
];

/// Find a library entry by id or display name
pub fn library_entry(name: &str) -> Option<&'static LibraryEntry> {
    DEFAULT_LIBRARY
        .iter()
        .find(|e| e.id.eq_ignore_ascii_case(name) || e.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::NamedTempFile;

    #[test]
    fn test_library_lengths() {
        for entry in DEFAULT_LIBRARY.iter() {
            let buffer = entry.render(8000.0);
            assert_eq!(buffer.len(), (8000.0 * entry.duration_secs) as usize);
            assert!((buffer.duration_secs() - entry.duration_secs).abs() < 1e-9);
        }
    }

    #[test]
    fn test_generated_clips_fade_out() {
        let buffer = ClipKind::Bass.render(1000.0, 1.0, 0);
        let samples = buffer.samples();
        let tail = &samples[samples.len() - 5..];
        assert!(tail.iter().all(|s| s.abs() < 0.06));
    }

    #[test]
    fn test_render_is_deterministic() {
        let entry = library_entry("pad1").unwrap();
        assert_eq!(entry.render(1000.0), entry.render(1000.0));
    }

    #[test]
    fn test_library_lookup() {
        assert_eq!(library_entry("Wobble Bass").map(|e| e.id), Some("bass1"));
        assert_eq!(library_entry("KICK1").map(|e| e.kind), Some(ClipKind::Drum));
        assert!(library_entry("tuba").is_none());
    }

    #[test]
    fn test_load_stereo_int_wav() {
        let file = NamedTempFile::new().unwrap();
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        {
            let mut writer = WavWriter::create(file.path(), spec).unwrap();
            for _ in 0..100 {
                writer.write_sample(16384i16).unwrap();
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let buffer = AudioBuffer::load_wav(file.path()).unwrap();
        assert_eq!(buffer.sample_rate(), 22050.0);
        assert_eq!(buffer.len(), 100);
        assert!((buffer.samples()[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(AudioBuffer::load_wav(Path::new("/nonexistent/clip.wav")).is_err());
    }
}
