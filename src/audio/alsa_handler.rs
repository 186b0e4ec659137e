use crate::audio::error::AudioError;
use alsa::nix::errno::Errno;
use alsa::pcm::{Access, Format, HwParams, State as PcmState, PCM};
use alsa::{Direction, ValueOr};
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::instrument;
use tracing::{debug, error, info, warn};

const LOG_TARGET: &str = "r_voiceline::audio::alsa_handler";
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Manages the ALSA PCM device for one clip's output.
pub struct AlsaPcmHandler {
    device_name: String,
    pcm: Option<PCM>,
    period_frames: usize,
}

impl AlsaPcmHandler {
    pub fn new(device_name: &str) -> Self {
        debug!(target: LOG_TARGET, "Creating AlsaPcmHandler for device: {}", device_name);
        AlsaPcmHandler {
            device_name: device_name.to_string(),
            pcm: None,
            period_frames: 0,
        }
    }

    /// Opens the PCM for interleaved S16 output at (or near) the given rate.
    #[instrument(skip(self), fields(device = %self.device_name))]
    pub fn initialize(&mut self, rate: u32, channels: u16) -> Result<(), AudioError> {
        self.close();

        let device = CString::new(self.device_name.clone())
            .map_err(|e| AudioError::InitializationError(format!("Invalid device name: {}", e)))?;
        let pcm = PCM::open(&device, Direction::Playback, false)
            .map_err(|e| AudioError::DeviceUnavailable(format!("{}: {}", self.device_name, e)))?;

        {
            let hwp = HwParams::any(&pcm)?;
            hwp.set_access(Access::RWInterleaved)?;
            hwp.set_format(Format::s16())?;
            hwp.set_channels(u32::from(channels))?;
            hwp.set_rate_near(rate, ValueOr::Nearest)?;
            let actual_rate = hwp.get_rate()?;
            if actual_rate != rate {
                // Clips are not resampled; they will play slightly fast or slow.
                warn!(target: LOG_TARGET, "ALSA rate negotiation: requested={}, actual={}", rate, actual_rate);
            }
            pcm.hw_params(&hwp)?;

            let swp = pcm.sw_params_current()?;
            let buffer_size = hwp.get_buffer_size()?;
            let period_size = hwp.get_period_size()?;
            swp.set_start_threshold(buffer_size - period_size)?;
            pcm.sw_params(&swp)?;
            self.period_frames = usize::try_from(period_size).unwrap_or(1024).max(1);
            debug!(target: LOG_TARGET, "ALSA parameters applied (buffer={}, period={}).", buffer_size, period_size);
        }

        self.pcm = Some(pcm);
        info!(target: LOG_TARGET, "ALSA initialized: rate={}, channels={}", rate, channels);
        Ok(())
    }

    /// Frames per hardware period; callers write in slices of this size.
    pub fn period_frames(&self) -> usize {
        self.period_frames
    }

    /// Writes interleaved S16 samples, recovering from underruns.
    /// Returns Ok(0) when an underrun was recovered and the write must be retried.
    pub fn write_s16_buffer(&self, buffer: &[i16]) -> Result<usize, AudioError> {
        let pcm = self.pcm.as_ref().ok_or(AudioError::InvalidState("PCM not initialized for writing".to_string()))?;
        let io = pcm.io_i16()?;

        match io.writei(buffer) {
            Ok(frames_written) => Ok(frames_written),
            Err(e) if e.errno() == Errno::EPIPE => {
                warn!(target: LOG_TARGET, "ALSA buffer underrun (EPIPE), recovering.");
                pcm.recover(libc::EPIPE, true)
                    .map(|()| 0)
                    .map_err(|recover_err| AudioError::AlsaError(format!("ALSA recovery failed: {}", recover_err)))
            }
            Err(e) => {
                error!(target: LOG_TARGET, "ALSA write error: {}", e);
                Err(AudioError::AlsaError(e.to_string()))
            }
        }
    }

    /// Waits for queued audio to play out, checking `stop` between polls.
    /// Returns false when stopped early; the queued audio is then dropped.
    pub fn drain_until(&self, stop: &AtomicBool) -> Result<bool, AudioError> {
        let Some(pcm) = &self.pcm else {
            return Ok(true);
        };
        loop {
            if stop.load(Ordering::SeqCst) {
                if let Err(e) = pcm.drop() {
                    warn!(target: LOG_TARGET, "Error dropping ALSA buffer on stop (ignored): {}", e);
                }
                return Ok(false);
            }
            match pcm.state() {
                // Short clips never reach the start threshold on their own.
                PcmState::Prepared => pcm.start()?,
                PcmState::Running => {
                    if pcm.delay()? <= 0 {
                        break;
                    }
                    thread::sleep(DRAIN_POLL_INTERVAL);
                }
                _ => break,
            }
        }
        self.drain()?;
        Ok(true)
    }

    /// Lets queued audio finish. Blocks until the buffer is empty.
    pub fn drain(&self) -> Result<(), AudioError> {
        match &self.pcm {
            Some(pcm) if matches!(pcm.state(), PcmState::Running | PcmState::Prepared) => {
                pcm.drain()?;
                debug!(target: LOG_TARGET, "ALSA drain successful.");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Closes the PCM, discarding any queued audio immediately.
    pub fn close(&mut self) {
        if let Some(pcm) = self.pcm.take() {
            if matches!(pcm.state(), PcmState::Running | PcmState::Prepared) {
                if let Err(e) = pcm.drop() {
                    warn!(target: LOG_TARGET, "Error dropping ALSA buffer during close (ignored): {}", e);
                }
            }
            debug!(target: LOG_TARGET, "ALSA PCM closed.");
        }
        self.period_frames = 0;
    }
}

impl Drop for AlsaPcmHandler {
    fn drop(&mut self) {
        self.close();
    }
}
