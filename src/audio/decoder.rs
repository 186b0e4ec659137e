use crate::audio::error::AudioError;
use std::io::{self, Cursor};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument, trace, warn};

const LOG_TARGET: &str = "r_voiceline::audio::decoder";

/// A fully decoded clip, ready for the device.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedClip {
    /// Interleaved S16 samples.
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration: Duration,
}

impl DecodedClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }
}

/// Turns a chunk payload into playable audio and its duration.
pub trait ClipDecoder: Send + Sync {
    fn decode(&self, payload: &[u8]) -> Result<DecodedClip, AudioError>;
}

/// Decodes whole in-memory clips with Symphonia. Chunks from the agent are WAV,
/// so probing is hinted towards it, but any enabled container/codec works.
#[derive(Debug, Clone)]
pub struct SymphoniaClipDecoder {
    extension_hint: Option<String>,
}

impl SymphoniaClipDecoder {
    pub fn new() -> Self {
        Self {
            extension_hint: Some("wav".to_string()),
        }
    }

    /// Probes without any extension hint.
    pub fn unhinted() -> Self {
        Self { extension_hint: None }
    }
}

impl Default for SymphoniaClipDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipDecoder for SymphoniaClipDecoder {
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    fn decode(&self, payload: &[u8]) -> Result<DecodedClip, AudioError> {
        if payload.is_empty() {
            return Err(AudioError::EmptyClip);
        }

        let mut hint = Hint::new();
        if let Some(ext) = &self.extension_hint {
            hint.with_extension(ext);
        }
        let mss = MediaSourceStream::new(Box::new(Cursor::new(payload.to_vec())), Default::default());
        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(AudioError::UnsupportedFormat("No suitable audio track found".to_string()))?
            .clone();
        let sample_rate = track.codec_params.sample_rate.ok_or(AudioError::MissingCodecParams("sample rate"))?;
        if sample_rate == 0 {
            return Err(AudioError::DecodingError("Sample rate is zero".to_string()));
        }
        let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;
        debug!(target: LOG_TARGET, "Decoding clip: track={}, codec={:?}, rate={}", track.id, track.codec_params.codec, sample_rate);

        let mut samples: Vec<i16> = Vec::new();
        let mut channels: Option<u16> = track.codec_params.channels.map(|c| c.count() as u16);

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    trace!(target: LOG_TARGET, "End of clip reached.");
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!(target: LOG_TARGET, "Decoder reset required mid-clip, stopping early.");
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track.id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels.get_or_insert(spec.channels.count() as u16);
                    let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buffer.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet; the rest of the clip may still be fine.
                    warn!(target: LOG_TARGET, "Skipping undecodable packet: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let channels = channels.ok_or(AudioError::MissingCodecParams("channels map"))?;
        if channels == 0 || samples.is_empty() {
            return Err(AudioError::EmptyClip);
        }
        let frames = samples.len() / usize::from(channels);
        let duration = Duration::from_nanos(frames as u64 * 1_000_000_000 / u64::from(sample_rate));
        debug!(target: LOG_TARGET, "Decoded {} frames ({:?}) at {} Hz, {} channels.", frames, duration, sample_rate, channels);

        Ok(DecodedClip {
            samples,
            sample_rate,
            channels,
            duration,
        })
    }
}
