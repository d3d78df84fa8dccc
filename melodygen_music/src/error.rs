// Errors raised by the I/O adapters (config, MIDI, CLI input).
//
// The engine itself is infallible: empty or degenerate melodies produce
// empty results or failing checks, never errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MelodyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MIDI error: {0}")]
    Midi(#[from] midly::Error),
    #[error("no notes found in {0}")]
    NoNotes(String),
    #[error("unknown interpolation method '{0}' (expected dtw, contour, or feature)")]
    UnknownMethod(String),
    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, MelodyError>;
