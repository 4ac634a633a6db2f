//! tonebox - playback and synthesis for toy instruments
//!
//! A keyboard, an eight-pad drum machine and a loop remixer share one
//! audio engine. Saved performances are sequences of timed events that
//! play back through the matching instrument.

pub mod config;
pub mod engine;
pub mod error;
pub mod practice;
pub mod sequence;
pub mod studio;
pub mod synth;

pub use config::ToneboxConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use sequence::Sequence;
pub use studio::{drive, play_and_drive, Input, Studio};
