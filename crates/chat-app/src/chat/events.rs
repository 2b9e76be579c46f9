use serde::{Deserialize, Serialize};
use zova_storage::SessionId;

pub const JOIN_EVENT: &str = "join";
pub const MESSAGE_EVENT: &str = "message";
pub const HISTORY_EVENT: &str = "history";
pub const AI_MESSAGE_EVENT: &str = "ai_message";

/// Payload of the outbound `join` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub room: String,
}

/// Payload of the outbound `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub room: String,
    pub message: String,
}

/// One exchange inside a `history` replay. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<String>,
}

impl HistoryEntry {
    /// Builds an entry from optional user and agent sides.
    pub fn new(user: Option<&str>, ai: Option<&str>) -> Self {
        Self {
            user: user.map(str::to_string),
            ai: ai.map(str::to_string),
        }
    }
}

/// Payload of the inbound `ai_message` event. A missing `message` is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiMessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AiMessagePayload {
    /// A reply carrying `message`.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Events this client emits on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Join(JoinPayload),
    Message(MessagePayload),
}

impl Outbound {
    /// The `join` emission for `room`.
    pub fn join(room: &SessionId) -> Self {
        Self::Join(JoinPayload {
            room: room.to_string(),
        })
    }

    /// The `message` emission carrying one user utterance.
    pub fn message(room: &SessionId, message: impl Into<String>) -> Self {
        Self::Message(MessagePayload {
            room: room.to_string(),
            message: message.into(),
        })
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Join(_) => JOIN_EVENT,
            Self::Message(_) => MESSAGE_EVENT,
        }
    }
}

/// Events the remote side delivers on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    History(Vec<HistoryEntry>),
    AiMessage(AiMessagePayload),
}

impl Inbound {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::History(_) => HISTORY_EVENT,
            Self::AiMessage(_) => AI_MESSAGE_EVENT,
        }
    }
}

/// Everything the protocol handler reacts to, in one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Identity resolved and the channel is ready for traffic.
    SessionStarted(SessionId),
    Inbound(Inbound),
    /// A send trigger fired; carries the raw, untrimmed input value.
    SendRequested(String),
    /// The configured response deadline elapsed while awaiting a reply.
    ResponseTimedOut,
}

impl From<Inbound> for ChatEvent {
    fn from(value: Inbound) -> Self {
        Self::Inbound(value)
    }
}
