use super::error::SessionError;
use super::models::InboundPacket;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, warn};

const LOG_TARGET: &str = "r_voiceline::session::source";

/// Anything that yields inbound packets. `Ok(None)` means the stream ended.
#[async_trait]
pub trait PacketSource: Send {
    async fn next_packet(&mut self) -> Result<Option<InboundPacket>, SessionError>;
}

/// Reads one JSON packet per line (recorded sessions, stdin pipes).
/// Blank lines are skipped; malformed lines are logged and skipped.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl JsonLinesSource<BufReader<File>> {
    pub async fn open(path: &Path) -> Result<Self, SessionError> {
        debug!(target: LOG_TARGET, "Opening packet file: {}", path.display());
        let file = File::open(path).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> PacketSource for JsonLinesSource<R> {
    async fn next_packet(&mut self) -> Result<Option<InboundPacket>, SessionError> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<InboundPacket>(line) {
                Ok(packet) => return Ok(Some(packet)),
                Err(e) => warn!(target: LOG_TARGET, "Skipping malformed packet on line {}: {}", self.line_no, e),
            }
        }
        debug!(target: LOG_TARGET, "Packet stream ended after {} lines.", self.line_no);
        Ok(None)
    }
}
