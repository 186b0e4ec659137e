use super::{PlaybackScheduler, SpeechEvent, SCHEDULER_LOG_TARGET};
use tracing::{debug, info, instrument};

/// Marks the interaction canceled, stops its utterance if it is the one
/// playing (without a completion event) and forwards the cancellation upstream.
/// Returns whether playback was interrupted.
#[instrument(skip(scheduler))]
pub(super) fn cancel_interaction(scheduler: &mut PlaybackScheduler, interaction_id: &str) -> bool {
    let listener = scheduler.listener.clone();
    let owns_current = scheduler.ledger.cancel(interaction_id, listener.as_ref());

    if owns_current {
        info!(target: SCHEDULER_LOG_TARGET, %interaction_id, "Stopping utterance of canceled interaction.");
        if let Some(device) = scheduler.device.as_deref_mut() {
            device.stop();
        }
        let stopped = scheduler.clock.stop();
        scheduler.ledger.release_utterance();
        if stopped.is_some() {
            // Closes the tts bracket opened at start; no finished event.
            listener.emit(SpeechEvent::TtsEnd {
                character_id: scheduler.character_id.clone(),
            });
        }
    } else {
        debug!(target: SCHEDULER_LOG_TARGET, %interaction_id, "Canceled interaction has no active playback.");
    }

    listener.emit(SpeechEvent::CancelResponses {
        interaction_id: interaction_id.to_string(),
    });
    owns_current
}

/// Cancels whatever interaction owns the playing utterance.
pub(super) fn interrupt(scheduler: &mut PlaybackScheduler) -> Option<String> {
    let interaction_id = scheduler.ledger.current_utterance()?.interaction_id.clone();
    cancel_interaction(scheduler, &interaction_id);
    Some(interaction_id)
}
