use std::error::Error;
use std::io;
use tokio_tungstenite::tungstenite;

/// Errors raised by the session transport.
#[derive(Debug)]
pub enum SessionError {
    IoError(io::Error),
    WebSocketError(tungstenite::Error),
    JsonError(serde_json::Error),
    UrlError(url::ParseError),
    PayloadError(String),
    SchedulerClosed,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::IoError(e) => write!(f, "I/O error: {}", e),
            SessionError::WebSocketError(e) => write!(f, "WebSocket error: {}", e),
            SessionError::JsonError(e) => write!(f, "JSON error: {}", e),
            SessionError::UrlError(e) => write!(f, "Invalid URL: {}", e),
            SessionError::PayloadError(s) => write!(f, "Invalid payload: {}", s),
            SessionError::SchedulerClosed => write!(f, "Scheduler is no longer running"),
        }
    }
}

impl Error for SessionError {}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        SessionError::IoError(e)
    }
}

impl From<tungstenite::Error> for SessionError {
    fn from(e: tungstenite::Error) -> Self {
        SessionError::WebSocketError(e)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::JsonError(e)
    }
}

impl From<url::ParseError> for SessionError {
    fn from(e: url::ParseError) -> Self {
        SessionError::UrlError(e)
    }
}

impl From<base64::DecodeError> for SessionError {
    fn from(e: base64::DecodeError) -> Self {
        SessionError::PayloadError(e.to_string())
    }
}
