use super::events::{SpeechEvent, SpeechListener};
use super::state::PacketId;
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

const LOG_TARGET: &str = "r_voiceline::scheduler::clock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// The clip had no playable audio. The utterance is still armed and completes on the next tick.
    NonPositiveDuration(PacketId),
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::NonPositiveDuration(id) => write!(f, "Utterance {} has no playable duration", id),
        }
    }
}

impl std::error::Error for ClockError {}

/// Countdown bound to the utterance currently playing. Authoritative for completion events.
#[derive(Debug, Default)]
pub struct UtteranceClock {
    remaining: Duration,
    current_utterance: Option<PacketId>,
}

impl UtteranceClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the countdown for a new utterance, superseding any utterance still counting.
    pub fn start(&mut self, packet_id: PacketId, duration: Duration) -> Result<(), ClockError> {
        if let Some(previous) = &self.current_utterance {
            debug!(target: LOG_TARGET, %previous, next = %packet_id, "Superseding utterance still counting down.");
        }
        self.remaining = duration;
        self.current_utterance = Some(packet_id.clone());
        if duration.is_zero() {
            return Err(ClockError::NonPositiveDuration(packet_id));
        }
        trace!(target: LOG_TARGET, %packet_id, "Clock armed for {:?}.", duration);
        Ok(())
    }

    /// Advances the countdown. On reaching zero, fires completion for the
    /// utterance, then the session-level end and the finished notification.
    /// Returns the completed utterance.
    pub fn tick(
        &mut self,
        elapsed: Duration,
        character_id: &str,
        listener: &dyn SpeechListener,
    ) -> Option<PacketId> {
        let Some(packet_id) = self.current_utterance.as_ref() else {
            return None;
        };
        if elapsed < self.remaining {
            self.remaining -= elapsed;
            return None;
        }

        debug!(target: LOG_TARGET, %packet_id, "Utterance countdown elapsed.");
        self.remaining = Duration::ZERO;
        let finished = self.current_utterance.take()?;
        listener.emit(SpeechEvent::UtteranceCompleted { packet_id: finished.clone() });
        listener.emit(SpeechEvent::TtsEnd { character_id: character_id.to_string() });
        listener.emit(SpeechEvent::FinishedSpeaking { packet_id: finished.clone() });
        Some(finished)
    }

    /// Clears the countdown without firing completion.
    pub fn stop(&mut self) -> Option<PacketId> {
        self.remaining = Duration::ZERO;
        self.current_utterance.take()
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn current_utterance(&self) -> Option<&PacketId> {
        self.current_utterance.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.current_utterance.is_some()
    }
}
