//! Wire models for packets exchanged with the agent session

use crate::scheduler::{PacketId, SpeechEvent};
use serde::{Deserialize, Serialize};

/// One side of a packet's routing (a character, the player, the server).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Routing {
    pub source: Actor,
    pub target: Actor,
}

/// A packet received from the session transport.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundPacket {
    pub packet_id: PacketId,
    pub routing: Routing,
    #[serde(flatten)]
    pub body: PacketBody,
}

impl InboundPacket {
    /// True when the packet is to or from the given character.
    pub fn involves(&self, character_id: &str) -> bool {
        self.routing.target.id == character_id || self.routing.source.id == character_id
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PacketBody {
    /// Base64-encoded audio clip for one utterance.
    AudioChunk { chunk: String },
    Text {
        text: String,
        #[serde(default, rename = "final")]
        is_final: bool,
    },
    CancelResponses {
        #[serde(rename = "interactionId")]
        interaction_id: String,
    },
    Control { action: String },
    #[serde(other)]
    Unknown,
}

/// A packet sent back upstream.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundPacket {
    CancelResponses {
        #[serde(rename = "characterId")]
        character_id: String,
        #[serde(rename = "interactionId")]
        interaction_id: String,
    },
    TtsStart {
        #[serde(rename = "characterId")]
        character_id: String,
    },
    TtsEnd {
        #[serde(rename = "characterId")]
        character_id: String,
    },
}

impl OutboundPacket {
    /// Speech events the session layer cares about; everything else stays local.
    pub fn from_event(event: &SpeechEvent, character_id: &str) -> Option<Self> {
        match event {
            SpeechEvent::CancelResponses { interaction_id } => Some(OutboundPacket::CancelResponses {
                character_id: character_id.to_string(),
                interaction_id: interaction_id.clone(),
            }),
            SpeechEvent::TtsStart { character_id } => Some(OutboundPacket::TtsStart {
                character_id: character_id.clone(),
            }),
            SpeechEvent::TtsEnd { character_id } => Some(OutboundPacket::TtsEnd {
                character_id: character_id.clone(),
            }),
            _ => None,
        }
    }
}
