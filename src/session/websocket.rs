//! WebSocket transport: inbound packets and outbound session notifications

use super::error::SessionError;
use super::models::{InboundPacket, OutboundPacket};
use super::source::PacketSource;
use crate::scheduler::SpeechEvent;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, instrument, trace, warn};
use url::Url;
use uuid::Uuid;

const LOG_TARGET: &str = "r_voiceline::session::websocket";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to the session endpoint and splits the socket into an inbound
/// packet source and an outbound forwarder.
#[instrument(skip_all, fields(session_id = %session_id))]
pub async fn connect(
    endpoint: &str,
    character_id: &str,
    session_id: Uuid,
) -> Result<(WebSocketSource, OutboundForwarder), SessionError> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut()
        .append_pair("session", &session_id.to_string())
        .append_pair("character", character_id);

    debug!(target: LOG_TARGET, "Connecting to session endpoint: {}", url);
    let (ws_stream, _) = connect_async(url).await?;
    info!(target: LOG_TARGET, "Session WebSocket connected.");

    let (sink, stream) = ws_stream.split();
    Ok((
        WebSocketSource { stream },
        OutboundForwarder {
            sink,
            character_id: character_id.to_string(),
        },
    ))
}

/// Inbound half: text frames are parsed as packets.
pub struct WebSocketSource {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl PacketSource for WebSocketSource {
    async fn next_packet(&mut self) -> Result<Option<InboundPacket>, SessionError> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => match serde_json::from_str::<InboundPacket>(&text) {
                    Ok(packet) => return Ok(Some(packet)),
                    Err(e) => {
                        warn!(target: LOG_TARGET, "Failed to parse session packet: {}", e);
                        trace!(target: LOG_TARGET, "Unparsed packet text: {}", text);
                    }
                },
                // tungstenite queues the pong itself.
                Message::Ping(_) | Message::Pong(_) => trace!(target: LOG_TARGET, "Ping/pong frame."),
                Message::Close(frame) => {
                    info!(target: LOG_TARGET, "Session closed by server: {:?}", frame);
                    return Ok(None);
                }
                other => debug!(target: LOG_TARGET, "Ignoring non-text frame ({} bytes).", other.len()),
            }
        }
        info!(target: LOG_TARGET, "Session stream ended.");
        Ok(None)
    }
}

/// Outbound half: forwards cancellations and tts brackets upstream.
pub struct OutboundForwarder {
    sink: SplitSink<WsStream, Message>,
    character_id: String,
}

impl OutboundForwarder {
    async fn send(&mut self, packet: &OutboundPacket) -> Result<(), SessionError> {
        let json = serde_json::to_string(packet)?;
        trace!(target: LOG_TARGET, "Sending outbound packet: {}", json);
        self.sink.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Runs until the event channel closes or the socket fails.
    pub async fn run(mut self, mut events: broadcast::Receiver<SpeechEvent>) {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(target: LOG_TARGET, "Outbound forwarder lagged, {} events missed.", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let Some(packet) = OutboundPacket::from_event(&event, &self.character_id) else {
                continue;
            };
            if let Err(e) = self.send(&packet).await {
                error!(target: LOG_TARGET, "Failed to send outbound packet: {}", e);
                break;
            }
        }
        if let Err(e) = self.sink.close().await {
            debug!(target: LOG_TARGET, "Error closing session sink (ignored): {}", e);
        }
        info!(target: LOG_TARGET, "Outbound forwarder finished.");
    }
}
