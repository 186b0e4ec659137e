use super::handle::SchedulerHandle;
use super::{PlaybackScheduler, SchedulerCommand, SCHEDULER_LOG_TARGET};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, trace};

/// Drives the scheduler: commands are handled first, then the fixed-period tick.
/// Returns when a `Shutdown` arrives or every command sender is dropped.
pub async fn run_scheduler_loop(
    scheduler: &mut PlaybackScheduler,
    command_rx: &mut mpsc::Receiver<SchedulerCommand>,
    tick_period: Duration,
) {
    info!(target: SCHEDULER_LOG_TARGET, ?tick_period, "Scheduler run loop started.");

    let mut ticker = interval(tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            biased;

            maybe_command = command_rx.recv() => {
                let Some(command) = maybe_command else {
                    info!(target: SCHEDULER_LOG_TARGET, "Command channel closed. Exiting run loop.");
                    break;
                };
                trace!(target: SCHEDULER_LOG_TARGET, "Received command: {:?}", command);
                match command {
                    SchedulerCommand::Cancel { interaction_id } => {
                        scheduler.cancel(&interaction_id);
                    }
                    SchedulerCommand::Interrupt => {
                        if scheduler.interrupt().is_none() {
                            trace!(target: SCHEDULER_LOG_TARGET, "Interrupt with nothing playing.");
                        }
                    }
                    SchedulerCommand::Clear => scheduler.clear(),
                    SchedulerCommand::Snapshot(responder) => {
                        let _ = responder.send(scheduler.snapshot());
                    }
                    SchedulerCommand::Shutdown => {
                        info!(target: SCHEDULER_LOG_TARGET, "Shutdown command received. Exiting run loop.");
                        break;
                    }
                }
            }

            now = ticker.tick() => {
                // Monotonic clock, so elapsed never goes negative.
                let elapsed = now.saturating_duration_since(last_tick);
                last_tick = now;
                scheduler.tick(elapsed);
            }
        }
    }

    scheduler.clear();
    info!(target: SCHEDULER_LOG_TARGET, "Scheduler run loop finished.");
}

/// Moves the scheduler onto a tokio task. The task hands the scheduler back when it ends.
pub fn spawn_scheduler(
    mut scheduler: PlaybackScheduler,
    tick_period: Duration,
    command_buffer_size: usize,
) -> (SchedulerHandle, JoinHandle<PlaybackScheduler>) {
    let (command_tx, mut command_rx) = mpsc::channel(command_buffer_size.max(1));
    let handle = SchedulerHandle::new(scheduler.ingress().clone(), command_tx);
    let task = tokio::spawn(async move {
        run_scheduler_loop(&mut scheduler, &mut command_rx, tick_period).await;
        scheduler
    });
    (handle, task)
}

/// Converts a float delta from a frame-driven host into a tick duration,
/// clamping negative or non-finite values to zero.
pub fn elapsed_from_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}
