use super::events::{SpeechEvent, SpeechListener};
use super::state::PacketId;
use std::collections::HashSet;
use tracing::{debug, trace};

const LOG_TARGET: &str = "r_voiceline::scheduler::ledger";

/// Tracks interaction hand-offs and cancellations and decides which chunks may play.
#[derive(Debug, Default)]
pub struct InteractionLedger {
    last_interaction_id: Option<String>,
    canceled_interactions: HashSet<String>,
    completed_interactions: HashSet<String>,
    current_utterance: Option<PacketId>,
}

impl InteractionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admission check for a dequeued chunk.
    ///
    /// Returns false for canceled interactions. Otherwise completes the previous
    /// interaction when this chunk belongs to a different one, then records the
    /// chunk's utterance as the one currently playing.
    pub fn is_admissible(&mut self, packet_id: &PacketId, listener: &dyn SpeechListener) -> bool {
        if self.is_canceled(&packet_id.interaction_id) {
            trace!(target: LOG_TARGET, %packet_id, "Rejecting chunk of canceled interaction.");
            return false;
        }

        if let Some(previous) = self.last_interaction_id.take() {
            if previous != packet_id.interaction_id {
                self.complete_interaction(previous, listener);
            }
        }

        self.last_interaction_id = Some(packet_id.interaction_id.clone());
        self.current_utterance = Some(packet_id.clone());
        true
    }

    fn complete_interaction(&mut self, interaction_id: String, listener: &dyn SpeechListener) {
        // Canceled interactions end through cancellation, never through hand-off.
        if self.canceled_interactions.contains(&interaction_id) {
            trace!(target: LOG_TARGET, %interaction_id, "Skipping completion of canceled interaction.");
            return;
        }
        if !self.completed_interactions.insert(interaction_id.clone()) {
            trace!(target: LOG_TARGET, %interaction_id, "Interaction already completed.");
            return;
        }
        debug!(target: LOG_TARGET, %interaction_id, "Interaction completed by hand-off.");
        listener.emit(SpeechEvent::InteractionCompleted { interaction_id });
    }

    /// Marks an interaction canceled. Returns true when the utterance currently
    /// playing belongs to it, in which case the caller must stop the device.
    pub fn cancel(&mut self, interaction_id: &str, listener: &dyn SpeechListener) -> bool {
        if self.canceled_interactions.insert(interaction_id.to_string()) {
            debug!(target: LOG_TARGET, %interaction_id, "Interaction canceled.");
            listener.emit(SpeechEvent::InteractionCanceled {
                interaction_id: interaction_id.to_string(),
            });
        } else {
            trace!(target: LOG_TARGET, %interaction_id, "Interaction was already canceled.");
        }

        self.current_utterance
            .as_ref()
            .is_some_and(|current| current.interaction_id == interaction_id)
    }

    pub fn is_canceled(&self, interaction_id: &str) -> bool {
        self.canceled_interactions.contains(interaction_id)
    }

    /// Forgets the current utterance once it has completed, been stopped or been discarded.
    pub fn release_utterance(&mut self) -> Option<PacketId> {
        self.current_utterance.take()
    }

    pub(super) fn track_utterance(&mut self, packet_id: Option<PacketId>) {
        self.current_utterance = packet_id;
    }

    pub fn current_utterance(&self) -> Option<&PacketId> {
        self.current_utterance.as_ref()
    }

    pub fn last_interaction_id(&self) -> Option<&str> {
        self.last_interaction_id.as_deref()
    }

    /// Canceled ids, sorted for stable display.
    pub fn canceled_interactions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.canceled_interactions.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Session reset.
    pub fn clear(&mut self) {
        self.last_interaction_id = None;
        self.canceled_interactions.clear();
        self.completed_interactions.clear();
        self.current_utterance = None;
    }
}
