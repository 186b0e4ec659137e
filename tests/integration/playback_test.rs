//! Integration tests for decoding and scheduling real clips
//!
//! These run the Symphonia decoder against generated WAV data and use the
//! silent device, so no audio hardware is needed.

use crate::test_utils::{wav_clip, EventLog};
use r_voiceline::audio::{SilentDevice, SymphoniaClipDecoder};
use r_voiceline::scheduler::{
    spawn_scheduler, AudioChunk, ChunkIngress, PacketId, PlaybackScheduler, SchedulerState, SpeechEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[cfg(test)]
mod playback_integration_tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    fn scheduler(ingress: Arc<ChunkIngress>, log: Arc<EventLog>) -> PlaybackScheduler {
        PlaybackScheduler::new("agent", ingress, log)
            .with_decoder(Box::new(SymphoniaClipDecoder::new()))
            .with_device(Box::new(SilentDevice::new()))
    }

    /// A WAV clip's decoded duration drives the countdown
    #[test]
    fn test_wav_clip_plays_for_its_duration() {
        let ingress = Arc::new(ChunkIngress::new());
        let log = Arc::new(EventLog::default());
        let mut scheduler = scheduler(ingress.clone(), log.clone());

        ingress
            .enqueue(AudioChunk::new(PacketId::new("U1", "I1"), wav_clip(16_000, 1, 300)))
            .unwrap();

        scheduler.tick(TICK);
        assert_eq!(scheduler.state(), SchedulerState::Playing);
        assert_eq!(scheduler.snapshot().remaining, Duration::from_millis(300));

        scheduler.tick(TICK);
        scheduler.tick(TICK);
        assert_eq!(log.count(|e| matches!(e, SpeechEvent::FinishedSpeaking { .. })), 0);

        scheduler.tick(TICK);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(log.count(|e| matches!(e, SpeechEvent::FinishedSpeaking { .. })), 1);
    }

    /// Undecodable chunks are dropped and the next chunk still plays
    #[test]
    fn test_garbage_chunk_is_discarded() {
        let ingress = Arc::new(ChunkIngress::new());
        let log = Arc::new(EventLog::default());
        let mut scheduler = scheduler(ingress.clone(), log.clone());

        ingress
            .enqueue(AudioChunk::new(PacketId::new("U1", "I1"), b"garbage".to_vec()))
            .unwrap();
        ingress
            .enqueue(AudioChunk::new(PacketId::new("U2", "I1"), wav_clip(16_000, 2, 100)))
            .unwrap();

        scheduler.tick(TICK);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(matches!(log.take().as_slice(), [SpeechEvent::ChunkDiscarded { .. }]));

        scheduler.tick(TICK);
        assert_eq!(scheduler.current_utterance(), Some(&PacketId::new("U2", "I1")));
    }

    /// The silent device stays busy for the clip, holding back the next one
    #[tokio::test(start_paused = true)]
    async fn test_next_interaction_waits_for_device() {
        let ingress = Arc::new(ChunkIngress::new());
        let log = Arc::new(EventLog::default());
        let mut scheduler = scheduler(ingress.clone(), log.clone());

        ingress
            .enqueue(AudioChunk::new(PacketId::new("U1", "I1"), wav_clip(16_000, 1, 100)))
            .unwrap();
        ingress
            .enqueue(AudioChunk::new(PacketId::new("U2", "I2"), wav_clip(16_000, 1, 100)))
            .unwrap();

        scheduler.tick(TICK);
        assert!(scheduler.is_device_busy());

        // The device follows tokio's clock, so paused time holds it busy.
        scheduler.tick(TICK);
        assert_eq!(log.count(|e| matches!(e, SpeechEvent::BeginSpeaking { .. })), 1);

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(!scheduler.is_device_busy());
        scheduler.tick(TICK);
        assert_eq!(
            log.count(|e| matches!(e, SpeechEvent::InteractionCompleted { interaction_id } if interaction_id == "I1")),
            1
        );
        assert_eq!(log.count(|e| matches!(e, SpeechEvent::BeginSpeaking { .. })), 2);
        assert!(ingress.is_empty());
    }

    /// Events reach broadcast subscribers when the scheduler runs on its own task
    #[tokio::test(start_paused = true)]
    async fn test_spawned_scheduler_broadcasts_events() {
        let (event_tx, mut event_rx) = broadcast::channel(32);
        let scheduler = PlaybackScheduler::new("agent", Arc::new(ChunkIngress::new()), Arc::new(event_tx))
            .with_decoder(Box::new(SymphoniaClipDecoder::new()))
            .with_device(Box::new(SilentDevice::new()));
        let (handle, task) = spawn_scheduler(scheduler, TICK, 4);

        handle
            .enqueue(AudioChunk::new(PacketId::new("U1", "I1"), wav_clip(16_000, 1, 300)))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut kinds = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            kinds.push(event);
        }
        assert!(matches!(kinds.first(), Some(SpeechEvent::UtteranceStarted { .. })));
        assert!(matches!(kinds.last(), Some(SpeechEvent::FinishedSpeaking { .. })));

        handle.shutdown().await.unwrap();
        let scheduler = task.await.unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }
}
