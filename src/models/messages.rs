use serde::{Deserialize, Serialize};
use crate::models::{ConnectionId, CursorPosition, Participant, SessionId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub session_id: SessionId,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeChangeMessage {
    pub session_id: SessionId,
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorChangeMessage {
    pub session_id: SessionId,
    pub position: CursorPosition,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageChangeMessage {
    pub session_id: SessionId,
    pub language: String,
}

/// Inbound frames, one fixed schema per `type` tag.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "code-change")]
    CodeChange(CodeChangeMessage),
    #[serde(rename = "cursor-change")]
    CursorChange(CursorChangeMessage),
    #[serde(rename = "language-change")]
    LanguageChange(LanguageChangeMessage),
    #[serde(rename = "ping")]
    Ping,
}

impl ReceivedMessage {
    /// Session named by the frame, if it carries one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ReceivedMessage::Join(m) => Some(&m.session_id),
            ReceivedMessage::CodeChange(m) => Some(&m.session_id),
            ReceivedMessage::CursorChange(m) => Some(&m.session_id),
            ReceivedMessage::LanguageChange(m) => Some(&m.session_id),
            ReceivedMessage::Ping => None,
        }
    }

    /// Presence checks beyond what the schema enforces.
    pub fn is_well_formed(&self) -> bool {
        if let Some(session_id) = self.session_id() {
            if session_id.is_empty() {
                return false;
            }
        }
        match self {
            ReceivedMessage::CursorChange(m) => m.position.is_valid(),
            _ => true,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReceivedMessage::Join(_) => "join",
            ReceivedMessage::CodeChange(_) => "code-change",
            ReceivedMessage::CursorChange(_) => "cursor-change",
            ReceivedMessage::LanguageChange(_) => "language-change",
            ReceivedMessage::Ping => "ping",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshotMessage {
    pub document_text: String,
    pub language: String,
    pub participants: Vec<Participant>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceLeftMessage {
    pub connection_id: ConnectionId,
    pub participant: Participant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdateMessage {
    pub text: String,
    pub origin_connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdateMessage {
    pub connection_id: ConnectionId,
    pub position: CursorPosition,
    pub participant: Participant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageUpdateMessage {
    pub language: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

/// Outbound frames.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "sync-snapshot")]
    SyncSnapshot(SyncSnapshotMessage),
    #[serde(rename = "presence-joined")]
    PresenceJoined(Participant),
    #[serde(rename = "presence-left")]
    PresenceLeft(PresenceLeftMessage),
    #[serde(rename = "document-update")]
    DocumentUpdate(DocumentUpdateMessage),
    #[serde(rename = "cursor-update")]
    CursorUpdate(CursorUpdateMessage),
    #[serde(rename = "language-update")]
    LanguageUpdate(LanguageUpdateMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}
