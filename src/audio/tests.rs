//! Tests for clip decoding and the silent device

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::io::Cursor;
    use std::time::Duration;

    fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).expect("wav writer");
            for i in 0..frames * usize::from(channels) {
                writer.write_sample((i % 128) as i16 * 64).expect("write sample");
            }
            writer.finalize().expect("finalize wav");
        }
        bytes
    }

    #[test]
    fn test_decode_mono_wav_duration() {
        let decoder = SymphoniaClipDecoder::new();
        let clip = decoder.decode(&wav_bytes(16_000, 1, 32_000)).expect("decode");

        assert_eq!(clip.sample_rate, 16_000);
        assert_eq!(clip.channels, 1);
        assert_eq!(clip.frames(), 32_000);
        assert_eq!(clip.duration, Duration::from_secs(2));
    }

    #[test]
    fn test_decode_stereo_wav_counts_frames_not_samples() {
        let decoder = SymphoniaClipDecoder::unhinted();
        let clip = decoder.decode(&wav_bytes(8_000, 2, 4_000)).expect("decode");

        assert_eq!(clip.channels, 2);
        assert_eq!(clip.samples.len(), 8_000);
        assert_eq!(clip.frames(), 4_000);
        assert_eq!(clip.duration, Duration::from_millis(500));
    }

    #[test]
    fn test_decode_empty_payload() {
        let decoder = SymphoniaClipDecoder::default();
        assert!(matches!(decoder.decode(&[]), Err(AudioError::EmptyClip)));
    }

    #[test]
    fn test_decode_garbage_payload() {
        let decoder = SymphoniaClipDecoder::new();
        let result = decoder.decode(b"definitely not a riff container");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_header_only_wav_is_empty() {
        let decoder = SymphoniaClipDecoder::new();
        let result = decoder.decode(&wav_bytes(16_000, 1, 0));
        assert!(result.is_err());
    }

    #[test]
    fn test_silent_device_busy_for_clip_duration() {
        let mut device = SilentDevice::new();
        assert!(!device.is_playing());

        let clip = DecodedClip {
            samples: vec![0; 16],
            sample_rate: 16_000,
            channels: 1,
            duration: Duration::from_secs(60),
        };
        device.play(clip).expect("silent play");
        assert!(device.is_playing());

        device.stop();
        assert!(!device.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_device_follows_tokio_clock() {
        let mut device = SilentDevice::new();
        let clip = DecodedClip {
            samples: vec![0; 16],
            sample_rate: 16_000,
            channels: 1,
            duration: Duration::from_millis(500),
        };
        device.play(clip).expect("silent play");

        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(device.is_playing());
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(!device.is_playing());
    }

    #[test]
    fn test_silent_device_zero_duration_never_busy() {
        let mut device = SilentDevice::new();
        let clip = DecodedClip {
            samples: Vec::new(),
            sample_rate: 16_000,
            channels: 1,
            duration: Duration::ZERO,
        };
        device.play(clip).expect("silent play");
        assert!(!device.is_playing());
    }

    #[test]
    fn test_alsa_device_creation() {
        // Creation opens nothing, so it works without audio hardware
        let device = AlsaDevice::new("default");
        assert!(!device.is_playing());
    }

    #[test]
    fn test_audio_error_display() {
        let alsa_error = AudioError::AlsaError("Test ALSA error".to_string());
        let decoding_error = AudioError::DecodingError("Test decoding error".to_string());
        let missing = AudioError::MissingCodecParams("sample rate");

        assert_eq!(format!("{}", alsa_error), "ALSA error: Test ALSA error");
        assert_eq!(format!("{}", decoding_error), "Decoding error: Test decoding error");
        assert_eq!(format!("{}", missing), "Missing codec parameters: sample rate");
        assert_eq!(format!("{}", AudioError::EmptyClip), "Clip contains no playable audio");
    }
}
