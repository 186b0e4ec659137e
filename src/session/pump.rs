use super::error::SessionError;
use super::router::{PacketRouter, RouteOutcome};
use super::source::PacketSource;
use tracing::{debug, info};

const LOG_TARGET: &str = "r_voiceline::session::pump";

/// Counts of what the pump did with the packets it received.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub received: usize,
    pub enqueued: usize,
    pub canceled: usize,
    pub ignored: usize,
    pub rejected: usize,
}

impl PumpStats {
    fn record(&mut self, outcome: RouteOutcome) {
        match outcome {
            RouteOutcome::Enqueued => self.enqueued += 1,
            RouteOutcome::Canceled => self.canceled += 1,
            RouteOutcome::Ignored => self.ignored += 1,
            RouteOutcome::Rejected => self.rejected += 1,
        }
    }
}

/// Moves packets from a source to the router until the source ends.
/// Transport errors end the pump; bad individual packets do not.
pub async fn run_packet_pump(
    source: &mut dyn PacketSource,
    router: &PacketRouter,
) -> Result<PumpStats, SessionError> {
    info!(target: LOG_TARGET, character_id = %router.character_id(), "Packet pump started.");
    let mut stats = PumpStats::default();

    while let Some(packet) = source.next_packet().await? {
        stats.received += 1;
        let outcome = router.route(packet).await?;
        debug!(target: LOG_TARGET, "Routed packet #{}: {:?}", stats.received, outcome);
        stats.record(outcome);
    }

    info!(target: LOG_TARGET, "Packet pump finished: {:?}", stats);
    Ok(stats)
}
