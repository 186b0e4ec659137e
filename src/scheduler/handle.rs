use super::ingress::{ChunkIngress, IngressError};
use super::state::{AudioChunk, SchedulerCommand, SchedulerSnapshot};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Failures reaching the scheduler task from a handle.
#[derive(Debug)]
pub enum HandleError {
    /// The run loop has exited.
    Closed,
    Ingress(IngressError),
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Closed => write!(f, "Scheduler task is no longer running"),
            HandleError::Ingress(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for HandleError {}

impl From<IngressError> for HandleError {
    fn from(e: IngressError) -> Self {
        HandleError::Ingress(e)
    }
}

impl<T> From<mpsc::error::SendError<T>> for HandleError {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        HandleError::Closed
    }
}

/// Cloneable front door to a running scheduler. Chunks go straight into the
/// ingress; everything else is marshaled onto the tick context as a command.
#[derive(Clone)]
pub struct SchedulerHandle {
    ingress: Arc<ChunkIngress>,
    command_tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub fn new(ingress: Arc<ChunkIngress>, command_tx: mpsc::Sender<SchedulerCommand>) -> Self {
        Self { ingress, command_tx }
    }

    pub fn enqueue(&self, chunk: AudioChunk) -> Result<(), HandleError> {
        Ok(self.ingress.enqueue(chunk)?)
    }

    /// Like `enqueue`, but waits for space when the ingress blocks producers.
    pub async fn enqueue_wait(&self, chunk: AudioChunk) {
        self.ingress.enqueue_wait(chunk).await
    }

    pub async fn cancel(&self, interaction_id: impl Into<String>) -> Result<(), HandleError> {
        self.command_tx
            .send(SchedulerCommand::Cancel { interaction_id: interaction_id.into() })
            .await?;
        Ok(())
    }

    pub async fn interrupt(&self) -> Result<(), HandleError> {
        self.command_tx.send(SchedulerCommand::Interrupt).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), HandleError> {
        self.command_tx.send(SchedulerCommand::Clear).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<SchedulerSnapshot, HandleError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx.send(SchedulerCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| HandleError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), HandleError> {
        self.command_tx.send(SchedulerCommand::Shutdown).await?;
        Ok(())
    }

    /// Raw command sender, for routers that forward transport-level cancellations.
    pub fn command_sender(&self) -> mpsc::Sender<SchedulerCommand> {
        self.command_tx.clone()
    }

    pub fn ingress(&self) -> &Arc<ChunkIngress> {
        &self.ingress
    }
}
