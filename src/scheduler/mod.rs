//! Utterance playback scheduling: ingress queue, admission ledger, countdown
//! clock and cancellation, driven by a periodic tick.

use crate::audio::{ClipDecoder, PlaybackDevice};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

mod cancellation;
mod clock;
mod events;
mod handle;
mod ingress;
mod ledger;
mod run_loop;
mod state;

pub use clock::{ClockError, UtteranceClock};
pub use events::{FnListener, SpeechEvent, SpeechListener};
pub use handle::{HandleError, SchedulerHandle};
pub use ingress::{BackpressurePolicy, ChunkIngress, IngressError};
pub use ledger::InteractionLedger;
pub use run_loop::{elapsed_from_secs, run_scheduler_loop, spawn_scheduler};
pub use state::{AudioChunk, PacketId, SchedulerCommand, SchedulerSnapshot, SchedulerState};

const SCHEDULER_LOG_TARGET: &str = "r_voiceline::scheduler";

/// Reference cadence for both the tick driver and queue polling.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Plays queued utterances one at a time and tracks their lifecycle.
///
/// Every method runs on the tick context; none of them block.
pub struct PlaybackScheduler {
    character_id: String,
    ingress: Arc<ChunkIngress>,
    ledger: InteractionLedger,
    clock: UtteranceClock,
    decoder: Option<Box<dyn ClipDecoder>>,
    device: Option<Box<dyn PlaybackDevice>>,
    listener: Arc<dyn SpeechListener>,
    poll_period: Duration,
    since_last_poll: Duration,
}

impl PlaybackScheduler {
    /// Creates a scheduler with no decoder or device attached.
    pub fn new(
        character_id: impl Into<String>,
        ingress: Arc<ChunkIngress>,
        listener: Arc<dyn SpeechListener>,
    ) -> Self {
        Self {
            character_id: character_id.into(),
            ingress,
            ledger: InteractionLedger::new(),
            clock: UtteranceClock::new(),
            decoder: None,
            device: None,
            listener,
            poll_period: DEFAULT_TICK_PERIOD,
            since_last_poll: Duration::ZERO,
        }
    }

    pub fn with_decoder(mut self, decoder: Box<dyn ClipDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn with_device(mut self, device: Box<dyn PlaybackDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_poll_period(mut self, poll_period: Duration) -> Self {
        self.poll_period = poll_period;
        self
    }

    /// Swaps the output device. Detaching stops anything playing on the old one.
    pub fn set_device(&mut self, device: Option<Box<dyn PlaybackDevice>>) {
        if let Some(mut old) = self.device.take() {
            old.stop();
        }
        self.device = device;
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    pub fn ingress(&self) -> &Arc<ChunkIngress> {
        &self.ingress
    }

    pub fn state(&self) -> SchedulerState {
        if self.clock.is_running() {
            SchedulerState::Playing
        } else {
            SchedulerState::Idle
        }
    }

    /// Device-reported busy flag; this, not the clock, gates new starts.
    pub fn is_device_busy(&self) -> bool {
        self.device.as_ref().is_some_and(|device| device.is_playing())
    }

    pub fn current_utterance(&self) -> Option<&PacketId> {
        self.clock.current_utterance()
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            state: self.state(),
            current_utterance: self.clock.current_utterance().cloned(),
            last_interaction_id: self.ledger.last_interaction_id().map(str::to_string),
            canceled_interactions: self.ledger.canceled_interactions(),
            queued_chunks: self.ingress.len(),
            remaining: self.clock.remaining(),
            device_busy: self.is_device_busy(),
        }
    }

    /// Per-tick entry point. `elapsed` is the wall time since the previous tick.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.clock.tick(elapsed, &self.character_id, self.listener.as_ref()).is_some() {
            self.ledger.release_utterance();
        }

        self.since_last_poll += elapsed;
        if self.since_last_poll < self.poll_period {
            return;
        }
        self.since_last_poll = Duration::ZERO;
        self.try_start_next();
    }

    /// Pulls at most one chunk and starts it if admissible and playable.
    fn try_start_next(&mut self) {
        let (Some(decoder), Some(device)) = (self.decoder.as_deref(), self.device.as_deref_mut()) else {
            trace!(target: SCHEDULER_LOG_TARGET, "Decoder or device unavailable, not polling.");
            return;
        };
        if device.is_playing() {
            trace!(target: SCHEDULER_LOG_TARGET, "Device busy, not preempting.");
            return;
        }
        let Some(chunk) = self.ingress.try_dequeue() else {
            return;
        };

        let packet_id = chunk.packet_id;
        if !self.ledger.is_admissible(&packet_id, self.listener.as_ref()) {
            debug!(target: SCHEDULER_LOG_TARGET, %packet_id, "Discarding chunk of canceled interaction.");
            return;
        }

        let clip = match decoder.decode(&chunk.payload) {
            Ok(clip) => clip,
            Err(e) => {
                warn!(target: SCHEDULER_LOG_TARGET, %packet_id, "Discarding undecodable chunk: {}", e);
                self.discard(packet_id, e.to_string());
                return;
            }
        };
        let duration = clip.duration;
        if let Err(e) = device.play(clip) {
            warn!(target: SCHEDULER_LOG_TARGET, %packet_id, "Device refused clip: {}", e);
            self.discard(packet_id, e.to_string());
            return;
        }

        if self.clock.is_running() {
            // The superseded utterance gets no completion, only the closing bracket.
            self.listener.emit(SpeechEvent::TtsEnd { character_id: self.character_id.clone() });
        }
        if let Err(e) = self.clock.start(packet_id.clone(), duration) {
            debug!(target: SCHEDULER_LOG_TARGET, "{}; completing on next tick.", e);
        }
        info!(target: SCHEDULER_LOG_TARGET, %packet_id, ?duration, "Utterance started.");
        self.listener.emit(SpeechEvent::UtteranceStarted { packet_id: packet_id.clone() });
        self.listener.emit(SpeechEvent::TtsStart { character_id: self.character_id.clone() });
        self.listener.emit(SpeechEvent::BeginSpeaking { packet_id });
    }

    fn discard(&mut self, packet_id: PacketId, reason: String) {
        // Admission already moved the ledger onto this chunk; point it back at
        // whatever the clock is still counting down.
        self.ledger.track_utterance(self.clock.current_utterance().cloned());
        self.listener.emit(SpeechEvent::ChunkDiscarded { packet_id, reason });
    }

    /// Cancels an interaction, stopping its utterance if it is the one playing.
    pub fn cancel(&mut self, interaction_id: &str) -> bool {
        cancellation::cancel_interaction(self, interaction_id)
    }

    /// Cancels the interaction of the utterance currently playing, if any.
    pub fn interrupt(&mut self) -> Option<String> {
        cancellation::interrupt(self)
    }

    /// Session reset: drains the queue, resets the ledger, stops the clock and device.
    /// An utterance cut short gets its `TtsEnd` but no completion.
    #[instrument(skip(self))]
    pub fn clear(&mut self) {
        let dropped = self.ingress.clear();
        self.ledger.clear();
        if let Some(device) = self.device.as_deref_mut() {
            device.stop();
        }
        if self.clock.stop().is_some() {
            self.listener.emit(SpeechEvent::TtsEnd { character_id: self.character_id.clone() });
        }
        self.since_last_poll = Duration::ZERO;
        debug!(target: SCHEDULER_LOG_TARGET, "Scheduler cleared ({} chunks dropped).", dropped);
    }
}
