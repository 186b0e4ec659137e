use super::state::PacketId;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

const LOG_TARGET: &str = "r_voiceline::scheduler::events";

/// Lifecycle notifications produced by the scheduler.
///
/// They are emitted synchronously from within the tick (or command) that
/// caused them, so listeners observe them in causal order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SpeechEvent {
    InteractionCompleted { interaction_id: String },
    InteractionCanceled { interaction_id: String },
    UtteranceStarted { packet_id: PacketId },
    UtteranceCompleted { packet_id: PacketId },
    TtsStart { character_id: String },
    BeginSpeaking { packet_id: PacketId },
    TtsEnd { character_id: String },
    FinishedSpeaking { packet_id: PacketId },
    /// Asks the transport to halt generation for this interaction upstream.
    CancelResponses { interaction_id: String },
    ChunkDiscarded { packet_id: PacketId, reason: String },
}

/// Receives [`SpeechEvent`]s. Implementations must not block.
pub trait SpeechListener: Send + Sync {
    fn emit(&self, event: SpeechEvent);
}

impl SpeechListener for broadcast::Sender<SpeechEvent> {
    fn emit(&self, event: SpeechEvent) {
        trace!(target: LOG_TARGET, "Broadcasting speech event: {:?}", event);
        if self.send(event).is_err() {
            // Normal while nothing is subscribed yet.
            trace!(target: LOG_TARGET, "No active listeners for speech event.");
        }
    }
}

/// Adapts a closure into a listener.
pub struct FnListener<F>(F);

impl<F: Fn(SpeechEvent) + Send + Sync> FnListener<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F: Fn(SpeechEvent) + Send + Sync> SpeechListener for FnListener<F> {
    fn emit(&self, event: SpeechEvent) {
        (self.0)(event)
    }
}

impl<T: SpeechListener + ?Sized> SpeechListener for Arc<T> {
    fn emit(&self, event: SpeechEvent) {
        (**self).emit(event)
    }
}
