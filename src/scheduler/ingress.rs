use super::state::AudioChunk;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

const LOG_TARGET: &str = "r_voiceline::scheduler::ingress";

/// What a bounded ingress does when a chunk arrives and it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Evict the oldest queued chunk to make room.
    #[default]
    DropOldest,
    /// Refuse the chunk; async producers wait for space with `enqueue_wait`.
    Block,
}

/// Returned when a `Block` ingress is full. Hands the chunk back to the producer.
#[derive(Debug)]
pub enum IngressError {
    Full(AudioChunk),
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngressError::Full(chunk) => write!(f, "Ingress full, chunk {} refused", chunk.packet_id),
        }
    }
}

impl std::error::Error for IngressError {}

/// Thread-safe FIFO between the transport (any thread) and the tick context.
///
/// Neither side ever blocks: the lock is held only for a push or pop.
pub struct ChunkIngress {
    queue: Mutex<VecDeque<AudioChunk>>,
    capacity: Option<usize>,
    policy: BackpressurePolicy,
    space_available: Notify,
}

impl ChunkIngress {
    /// Unbounded ingress.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity: None,
            policy: BackpressurePolicy::default(),
            space_available: Notify::new(),
        }
    }

    /// Bounded ingress. A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize, policy: BackpressurePolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
            policy,
            space_available: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AudioChunk>> {
        // A panicking producer cannot leave the deque half-modified.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a chunk. Only fails for a full ingress with the `Block` policy.
    pub fn enqueue(&self, chunk: AudioChunk) -> Result<(), IngressError> {
        let mut queue = self.lock();
        if let Some(capacity) = self.capacity {
            if queue.len() >= capacity {
                match self.policy {
                    BackpressurePolicy::DropOldest => {
                        if let Some(evicted) = queue.pop_front() {
                            warn!(target: LOG_TARGET, packet_id = %evicted.packet_id, "Ingress full ({}), dropping oldest chunk.", capacity);
                        }
                    }
                    BackpressurePolicy::Block => {
                        trace!(target: LOG_TARGET, packet_id = %chunk.packet_id, "Ingress full ({}), refusing chunk.", capacity);
                        return Err(IngressError::Full(chunk));
                    }
                }
            }
        }
        trace!(target: LOG_TARGET, packet_id = %chunk.packet_id, "Enqueued chunk ({} bytes).", chunk.payload.len());
        queue.push_back(chunk);
        Ok(())
    }

    /// Appends a chunk, waiting for space if the ingress is full and blocking.
    pub async fn enqueue_wait(&self, mut chunk: AudioChunk) {
        loop {
            // Register interest before trying so a dequeue in between is not missed.
            let notified = self.space_available.notified();
            match self.enqueue(chunk) {
                Ok(()) => return,
                Err(IngressError::Full(refused)) => {
                    chunk = refused;
                    notified.await;
                }
            }
        }
    }

    /// Pops the oldest chunk, if any.
    pub fn try_dequeue(&self) -> Option<AudioChunk> {
        let chunk = self.lock().pop_front();
        if chunk.is_some() && self.capacity.is_some() {
            self.space_available.notify_one();
        }
        chunk
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every queued chunk and returns how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut queue = self.lock();
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        if dropped > 0 {
            debug!(target: LOG_TARGET, "Cleared {} queued chunks.", dropped);
            self.space_available.notify_waiters();
        }
        dropped
    }
}

impl Default for ChunkIngress {
    fn default() -> Self {
        Self::new()
    }
}
