//! Integration tests for the session layer
//!
//! Recorded packet streams are pumped through the router into a running
//! scheduler, the same path the binary uses for `--packets`.

use crate::test_utils::wav_clip;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use r_voiceline::audio::{SilentDevice, SymphoniaClipDecoder};
use r_voiceline::scheduler::{spawn_scheduler, ChunkIngress, PacketId, PlaybackScheduler, SpeechEvent};
use r_voiceline::session::{run_packet_pump, JsonLinesSource, OutboundPacket, PacketRouter};
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::broadcast;

#[cfg(test)]
mod session_integration_tests {
    use super::*;

    fn audio_line(utterance: &str, interaction: &str, millis: u32) -> String {
        json!({
            "packetId": { "utteranceId": utterance, "interactionId": interaction },
            "routing": { "source": { "id": "agent" }, "target": { "id": "player" } },
            "type": "audioChunk",
            "chunk": BASE64.encode(wav_clip(16_000, 1, millis)),
        })
        .to_string()
    }

    fn cancel_line(interaction: &str) -> String {
        json!({
            "packetId": { "utteranceId": "", "interactionId": interaction },
            "routing": { "source": { "id": "server" }, "target": { "id": "agent" } },
            "type": "cancelResponses",
            "interactionId": interaction,
        })
        .to_string()
    }

    /// A recorded session plays its audio and honours cancellations
    #[tokio::test(start_paused = true)]
    async fn test_recorded_session_end_to_end() -> Result<(), Box<dyn Error>> {
        let (event_tx, mut event_rx) = broadcast::channel(64);
        let scheduler = PlaybackScheduler::new("agent", Arc::new(ChunkIngress::new()), Arc::new(event_tx))
            .with_decoder(Box::new(SymphoniaClipDecoder::new()))
            .with_device(Box::new(SilentDevice::new()));
        let (handle, task) = spawn_scheduler(scheduler, Duration::from_millis(100), 8);

        // I2 is canceled before the scheduler ever polls its chunk.
        let input = [audio_line("U1", "I1", 200), cancel_line("I2"), audio_line("U2", "I2", 200)].join("\n");
        let router = PacketRouter::new("agent", handle.clone());
        let mut source = JsonLinesSource::new(BufReader::new(input.as_bytes()));
        let stats = run_packet_pump(&mut source, &router).await?;
        assert_eq!(stats.received, 3);
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.canceled, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let snapshot = handle.snapshot().await?;
        assert_eq!(snapshot.queued_chunks, 0);
        assert_eq!(snapshot.canceled_interactions, vec!["I2".to_string()]);

        let mut begun = Vec::new();
        let mut outbound = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            if let SpeechEvent::BeginSpeaking { packet_id } = &event {
                begun.push(packet_id.clone());
            }
            if let Some(packet) = OutboundPacket::from_event(&event, "agent") {
                outbound.push(packet);
            }
        }
        assert_eq!(begun, vec![PacketId::new("U1", "I1")]);
        assert!(outbound.contains(&OutboundPacket::CancelResponses {
            character_id: "agent".to_string(),
            interaction_id: "I2".to_string(),
        }));

        handle.shutdown().await?;
        task.await?;
        Ok(())
    }
}
