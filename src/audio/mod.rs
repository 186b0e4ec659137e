//! Audio collaborators: clip decoding and single-stream output

mod alsa_handler;
mod decoder;
mod device;
pub mod error;
#[cfg(test)]
mod tests;

pub use decoder::{ClipDecoder, DecodedClip, SymphoniaClipDecoder};
pub use device::{AlsaDevice, PlaybackDevice, SilentDevice};
pub use error::AudioError;
