use crate::audio::alsa_handler::AlsaPcmHandler;
use crate::audio::decoder::DecodedClip;
use crate::audio::error::AudioError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

const LOG_TARGET: &str = "r_voiceline::audio::device";

/// Single-stream audio output. Calls come only from the tick context and must not block.
pub trait PlaybackDevice: Send {
    /// Starts outputting the clip, replacing anything still playing.
    fn play(&mut self, clip: DecodedClip) -> Result<(), AudioError>;

    /// Stops output immediately.
    fn stop(&mut self);

    /// True while the device is still outputting audio.
    fn is_playing(&self) -> bool;
}

/// Worker thread writing one clip to ALSA.
struct ClipWorker {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
}

impl ClipWorker {
    /// Asks the worker to stop without waiting for it.
    fn signal_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }
}

/// Plays clips on an ALSA PCM from a background thread.
///
/// Neither `play` nor `stop` waits on the PCM. A stopped worker is handed to
/// its successor, which joins it before opening the device.
pub struct AlsaDevice {
    device_name: String,
    worker: Option<ClipWorker>,
    stopping: Option<JoinHandle<()>>,
}

impl AlsaDevice {
    pub fn new(device_name: &str) -> Self {
        info!(target: LOG_TARGET, "Creating ALSA playback device: {}", device_name);
        Self {
            device_name: device_name.to_string(),
            worker: None,
            stopping: None,
        }
    }

    /// Signals the current worker and parks its handle for the next worker to reap.
    fn retire_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.signal_stop();
            if self.stopping.replace(worker.handle).is_some() {
                // Detached; it has already been signalled and exits on its own.
                debug!(target: LOG_TARGET, "Detaching an unreaped ALSA worker.");
            }
        }
    }

    fn write_clip(device_name: &str, clip: &DecodedClip, stop: &AtomicBool) -> Result<(), AudioError> {
        let mut handler = AlsaPcmHandler::new(device_name);
        handler.initialize(clip.sample_rate, clip.channels)?;
        let channels = usize::from(clip.channels.max(1));
        let period_samples = handler.period_frames() * channels;

        let mut offset = 0;
        while offset < clip.samples.len() {
            if stop.load(Ordering::SeqCst) {
                debug!(target: LOG_TARGET, "Stop requested, abandoning clip at sample {}.", offset);
                handler.close();
                return Ok(());
            }
            let end = (offset + period_samples).min(clip.samples.len());
            let frames = handler.write_s16_buffer(&clip.samples[offset..end])?;
            offset += frames * channels;
        }
        if handler.drain_until(stop)? {
            trace!(target: LOG_TARGET, "Clip fully written and drained.");
        } else {
            debug!(target: LOG_TARGET, "Stop requested while draining, queued audio dropped.");
        }
        Ok(())
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!(target: LOG_TARGET, "ALSA playback worker panicked.");
    }
}

impl PlaybackDevice for AlsaDevice {
    #[instrument(skip(self, clip), fields(device = %self.device_name, duration = ?clip.duration))]
    fn play(&mut self, clip: DecodedClip) -> Result<(), AudioError> {
        self.retire_worker();

        let stop = Arc::new(AtomicBool::new(false));
        let playing = Arc::new(AtomicBool::new(true));
        let device_name = self.device_name.clone();
        let predecessor = self.stopping.take();
        let worker_stop = stop.clone();
        let worker_playing = playing.clone();

        let handle = thread::Builder::new()
            .name("alsa-clip".to_string())
            .spawn(move || {
                if let Some(previous) = predecessor {
                    join_worker(previous);
                }
                if let Err(e) = Self::write_clip(&device_name, &clip, &worker_stop) {
                    warn!(target: LOG_TARGET, "Clip playback failed: {}", e);
                }
                worker_playing.store(false, Ordering::SeqCst);
            })
            .map_err(|e| AudioError::InitializationError(format!("Failed to spawn playback worker: {}", e)))?;

        self.worker = Some(ClipWorker { handle, stop, playing });
        Ok(())
    }

    fn stop(&mut self) {
        debug!(target: LOG_TARGET, "Stopping ALSA playback.");
        self.retire_worker();
    }

    fn is_playing(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| worker.playing.load(Ordering::SeqCst))
    }
}

impl Drop for AlsaDevice {
    fn drop(&mut self) {
        self.retire_worker();
        if let Some(handle) = self.stopping.take() {
            join_worker(handle);
        }
    }
}

/// Outputs nothing but reports busy for each clip's duration, so scheduling
/// behaves as it would with real hardware.
#[derive(Debug, Default)]
pub struct SilentDevice {
    busy_until: Option<Instant>,
}

impl SilentDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackDevice for SilentDevice {
    fn play(&mut self, clip: DecodedClip) -> Result<(), AudioError> {
        trace!(target: LOG_TARGET, "Silently playing clip of {:?}.", clip.duration);
        self.busy_until = Some(Instant::now() + clip.duration);
        Ok(())
    }

    fn stop(&mut self) {
        self.busy_until = None;
    }

    fn is_playing(&self) -> bool {
        self.busy_until.is_some_and(|until| Instant::now() < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    /// A worker stuck inside a blocking PCM call until `release` fires.
    fn stuck_worker(release: mpsc::Receiver<()>) -> ClipWorker {
        let stop = Arc::new(AtomicBool::new(false));
        let playing = Arc::new(AtomicBool::new(true));
        let handle = thread::spawn(move || {
            let _ = release.recv();
        });
        ClipWorker { handle, stop, playing }
    }

    #[test]
    fn test_stop_does_not_wait_for_draining_worker() {
        let (release_tx, release_rx) = mpsc::channel();
        let mut device = AlsaDevice::new("default");
        device.worker = Some(stuck_worker(release_rx));
        assert!(device.is_playing());

        let (done_tx, done_rx) = mpsc::channel();
        let stopper = thread::spawn(move || {
            device.stop();
            let stopped = !device.is_playing();
            done_tx.send(()).unwrap();
            (device, stopped)
        });

        let returned = done_rx.recv_timeout(Duration::from_secs(2)).is_ok();
        release_tx.send(()).unwrap();
        let (device, stopped) = stopper.join().unwrap();
        assert!(returned, "stop() blocked on the worker");
        assert!(stopped);
        assert!(device.stopping.is_some());
        drop(device);
    }
}
