//! Session transport glue: packet models, sources and routing into the scheduler

pub mod error;
pub mod models;
mod pump;
mod router;
mod source;
pub mod websocket;

pub use error::SessionError;
pub use models::*;
pub use pump::{run_packet_pump, PumpStats};
pub use router::{PacketRouter, RouteOutcome};
pub use source::{JsonLinesSource, PacketSource};
pub use websocket::{OutboundForwarder, WebSocketSource};
