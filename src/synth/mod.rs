//! Synthesis for tonebox
//!
//! DSP building blocks (oscillators, filters, automation, noise) and the
//! two instruments built on them: tonal notes and drum pads.

mod envelope;
mod filter;
pub mod kit;
mod noise;
pub mod note;
mod oscillator;
pub mod percussion;
mod tone;

pub use envelope::{Curve, Envelope};
pub use filter::{Filter, FilterKind};
pub use kit::{Kit, KitLibrary, Pad, PadParams, DEFAULT_KIT};
pub use noise::{NoiseCache, NOISE_SECONDS};
pub use note::{keyboard_notes, Note, Tuning, DEFAULT_FREQUENCY};
pub use oscillator::{Oscillator, Waveform};
pub use tone::{ToneKind, ToneSynth};
