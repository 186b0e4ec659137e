use std::error::Error;
use std::io;
use symphonia::core::errors::Error as SymphoniaError;

/// Error types specific to decoding and playing clips.
#[derive(Debug)]
pub enum AudioError {
    AlsaError(String),
    DecodingError(String),
    SymphoniaError(SymphoniaError),
    IoError(io::Error),
    InvalidState(String),
    UnsupportedFormat(String),
    MissingCodecParams(&'static str),
    EmptyClip,
    DeviceUnavailable(String),
    InitializationError(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::AlsaError(e) => write!(f, "ALSA error: {}", e),
            AudioError::DecodingError(e) => write!(f, "Decoding error: {}", e),
            AudioError::SymphoniaError(e) => write!(f, "Symphonia error: {}", e),
            AudioError::IoError(e) => write!(f, "I/O error: {}", e),
            AudioError::InvalidState(s) => write!(f, "Invalid state: {}", s),
            AudioError::UnsupportedFormat(s) => write!(f, "Unsupported format: {}", s),
            AudioError::MissingCodecParams(s) => write!(f, "Missing codec parameters: {}", s),
            AudioError::EmptyClip => write!(f, "Clip contains no playable audio"),
            AudioError::DeviceUnavailable(s) => write!(f, "Playback device unavailable: {}", s),
            AudioError::InitializationError(e) => write!(f, "Initialization error: {}", e),
        }
    }
}

impl Error for AudioError {}

impl From<alsa::Error> for AudioError {
    fn from(e: alsa::Error) -> Self {
        AudioError::AlsaError(e.to_string())
    }
}

impl From<SymphoniaError> for AudioError {
    fn from(e: SymphoniaError) -> Self {
        AudioError::SymphoniaError(e)
    }
}

impl From<io::Error> for AudioError {
    fn from(e: io::Error) -> Self {
        AudioError::IoError(e)
    }
}
