use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::oneshot;

/// Identifies the utterance a chunk belongs to and the interaction that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketId {
    pub utterance_id: String,
    pub interaction_id: String,
}

impl PacketId {
    pub fn new(utterance_id: impl Into<String>, interaction_id: impl Into<String>) -> Self {
        Self {
            utterance_id: utterance_id.into(),
            interaction_id: interaction_id.into(),
        }
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.interaction_id, self.utterance_id)
    }
}

/// One unit of raw audio as delivered by the transport. Consumed exactly once.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub packet_id: PacketId,
    pub payload: Bytes,
}

impl AudioChunk {
    pub fn new(packet_id: PacketId, payload: impl Into<Bytes>) -> Self {
        Self {
            packet_id,
            payload: payload.into(),
        }
    }
}

/// Whether an utterance is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    Idle,
    Playing,
}

/// Commands marshaled onto the tick context.
#[derive(Debug)]
pub enum SchedulerCommand {
    Cancel { interaction_id: String },
    /// Cancels whichever interaction owns the currently playing utterance.
    Interrupt,
    Clear,
    Snapshot(oneshot::Sender<SchedulerSnapshot>),
    Shutdown,
}

/// Point-in-time view of the scheduler, for status displays and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerSnapshot {
    pub state: SchedulerState,
    pub current_utterance: Option<PacketId>,
    pub last_interaction_id: Option<String>,
    pub canceled_interactions: Vec<String>,
    pub queued_chunks: usize,
    pub remaining: Duration,
    pub device_busy: bool,
}
