//! Error types for tonebox

use thiserror::Error;

/// Errors raised at the fallible edges of the engine.
///
/// Playback itself never fails: unknown notes fall back to a default
/// pitch and unknown pads are ignored. These variants cover parsing,
/// file I/O and invalid handles.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid note name: {0:?}")]
    InvalidNote(String),

    #[error("unknown mixer track: {0}")]
    UnknownTrack(usize),

    #[error("invalid clip: {0}")]
    InvalidClip(String),

    #[error("failed to parse sequence: {0}")]
    Sequence(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
