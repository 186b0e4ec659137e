//! Routes inbound packets to the scheduler

use super::error::SessionError;
use super::models::{InboundPacket, PacketBody};
use crate::scheduler::{AudioChunk, HandleError, SchedulerHandle};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, instrument, trace, warn};

const LOG_TARGET: &str = "r_voiceline::session::router";

/// What happened to a routed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Enqueued,
    Canceled,
    /// Not addressed to/from the tracked character, or not a kind the scheduler consumes.
    Ignored,
    /// Addressed to us but unusable (bad payload).
    Rejected,
}

/// Filters packets for one character and feeds audio and cancellations to its scheduler.
#[derive(Clone)]
pub struct PacketRouter {
    character_id: String,
    scheduler: SchedulerHandle,
}

impl PacketRouter {
    pub fn new(character_id: impl Into<String>, scheduler: SchedulerHandle) -> Self {
        Self {
            character_id: character_id.into(),
            scheduler,
        }
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    #[instrument(skip(self, packet), fields(packet_id = %packet.packet_id))]
    pub async fn route(&self, packet: InboundPacket) -> Result<RouteOutcome, SessionError> {
        if !packet.involves(&self.character_id) {
            trace!(target: LOG_TARGET, "Packet not addressed to/from {}, ignoring.", self.character_id);
            return Ok(RouteOutcome::Ignored);
        }

        match packet.body {
            PacketBody::AudioChunk { chunk } => {
                let payload = match BASE64.decode(chunk.as_bytes()) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(target: LOG_TARGET, "Dropping audio chunk with bad base64 payload: {}", e);
                        return Ok(RouteOutcome::Rejected);
                    }
                };
                debug!(target: LOG_TARGET, "Enqueuing audio chunk ({} bytes).", payload.len());
                self.scheduler.enqueue_wait(AudioChunk::new(packet.packet_id, payload)).await;
                Ok(RouteOutcome::Enqueued)
            }
            PacketBody::CancelResponses { interaction_id } => {
                debug!(target: LOG_TARGET, %interaction_id, "Forwarding cancellation to scheduler.");
                self.scheduler.cancel(interaction_id).await.map_err(|e| match e {
                    HandleError::Closed => SessionError::SchedulerClosed,
                    other => SessionError::PayloadError(other.to_string()),
                })?;
                Ok(RouteOutcome::Canceled)
            }
            other => {
                trace!(target: LOG_TARGET, "Ignoring packet kind: {:?}", other);
                Ok(RouteOutcome::Ignored)
            }
        }
    }
}
