use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    session::SessionEvent,
    transcript::{Participant, UtteranceEvent},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostOutcome {
    Delivered,
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResultMessage {
    pub request_id: String,
    pub outcome: PostOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEgressMessage {
    Post {
        request_id: String,
        content: String,
        pin: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundBridgeMessage {
    Session(SessionEvent),
    PostResult(PostResultMessage),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
enum WireMessage {
    Utterance {
        speaker: String,
        text: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
        #[serde(default)]
        partial: bool,
    },
    ParticipantJoin {
        participant_id: String,
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        is_host: bool,
    },
    ParticipantLeave {
        participant_id: String,
    },
    SessionEnd,
    PostResult {
        request_id: String,
        outcome: PostOutcome,
    },
}

pub fn parse_bridge_ingress_message(line: &str) -> Result<InboundBridgeMessage, serde_json::Error> {
    let wire: WireMessage = serde_json::from_str(line)?;
    let message = match wire {
        WireMessage::Utterance {
            speaker,
            text,
            timestamp,
            partial,
        } => InboundBridgeMessage::Session(SessionEvent::Utterance(UtteranceEvent {
            speaker_id: speaker,
            text,
            timestamp,
            is_partial: partial,
        })),
        WireMessage::ParticipantJoin {
            participant_id,
            display_name,
            is_host,
        } => {
            let display_name = display_name.unwrap_or_else(|| participant_id.clone());
            let mut participant = Participant::new(participant_id, display_name);
            participant.is_host = is_host;
            InboundBridgeMessage::Session(SessionEvent::ParticipantJoined(participant))
        }
        WireMessage::ParticipantLeave { participant_id } => {
            InboundBridgeMessage::Session(SessionEvent::ParticipantLeft { participant_id })
        }
        WireMessage::SessionEnd => InboundBridgeMessage::Session(SessionEvent::End),
        WireMessage::PostResult {
            request_id,
            outcome,
        } => InboundBridgeMessage::PostResult(PostResultMessage {
            request_id,
            outcome,
        }),
    };
    Ok(message)
}

pub fn encode_bridge_egress_message(
    message: &BridgeEgressMessage,
) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_string(message)?;
    Ok(format!("{encoded}\n"))
}
