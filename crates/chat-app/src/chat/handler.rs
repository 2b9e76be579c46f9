use zova_storage::SessionId;

use crate::chat::events::{AiMessagePayload, ChatEvent, HistoryEntry, Inbound, Outbound};
use crate::chat::message::Message;

pub const DEFAULT_GREETING: &str = "Hello I am LLM agent, how may I help you?";
pub const RESPONSE_TIMEOUT_NOTICE: &str = "No response received. Please try again.";

/// Input-lock state of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingResponse,
}

/// Why a send request produced nothing. Never shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    /// No `join` has been emitted yet.
    NotJoined,
    /// A previous `message` is still unanswered.
    Busy,
    /// Input was empty after trimming.
    EmptyInput,
}

/// Side effects requested by the handler, applied in order by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Emit(Outbound),
    ClearTranscript,
    AppendMessage(Message),
    ShowIndicator,
    HideIndicator,
    ClearInput,
    DisableInput,
    EnableInput,
    FocusInput,
    ScrollToBottom,
    ArmResponseTimer,
    DisarmResponseTimer,
}

/// Protocol state machine: a pure function of (state, event) -> effects.
#[derive(Debug, Clone)]
pub struct ProtocolHandler {
    room: Option<SessionId>,
    state: ConversationState,
    greeting: String,
    /// Requests given up on by the response timer whose reply is still due.
    abandoned: usize,
}

impl ProtocolHandler {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            room: None,
            state: ConversationState::Idle,
            greeting: greeting.into(),
            abandoned: 0,
        }
    }

    /// Current input-lock state.
    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// The joined room, once the session has started.
    pub fn room(&self) -> Option<&SessionId> {
        self.room.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.state == ConversationState::AwaitingResponse
    }

    /// Number of timed-out requests whose late reply has not arrived yet.
    pub fn abandoned_requests(&self) -> usize {
        self.abandoned
    }

    /// Applies one event and returns the effects to perform, in order.
    pub fn handle(&mut self, event: ChatEvent) -> Vec<Effect> {
        match event {
            ChatEvent::SessionStarted(room) => self.start_session(room),
            ChatEvent::Inbound(Inbound::History(entries)) => self.replay_history(entries),
            ChatEvent::Inbound(Inbound::AiMessage(payload)) => self.receive_reply(payload),
            ChatEvent::SendRequested(raw) => match self.request_send(&raw) {
                Ok(effects) => effects,
                Err(rejection) => {
                    tracing::debug!(?rejection, state = ?self.state, "ignoring send request");
                    Vec::new()
                }
            },
            ChatEvent::ResponseTimedOut => self.expire_response(),
        }
    }

    /// Validates and performs one outbound send.
    pub fn request_send(&mut self, raw: &str) -> Result<Vec<Effect>, SendRejection> {
        let Some(room) = &self.room else {
            return Err(SendRejection::NotJoined);
        };
        if self.state == ConversationState::AwaitingResponse {
            return Err(SendRejection::Busy);
        }

        let text = raw.trim();
        if text.is_empty() {
            return Err(SendRejection::EmptyInput);
        }

        let emit = Effect::Emit(Outbound::message(room, text));
        self.state = ConversationState::AwaitingResponse;
        tracing::debug!(room = %room, chars = text.chars().count(), "sending message");

        Ok(vec![
            Effect::AppendMessage(Message::user(text)),
            Effect::ClearInput,
            Effect::DisableInput,
            Effect::ShowIndicator,
            emit,
            Effect::ArmResponseTimer,
        ])
    }

    fn start_session(&mut self, room: SessionId) -> Vec<Effect> {
        if let Some(active) = &self.room {
            tracing::warn!(active = %active, attempted = %room, "session already started; ignoring");
            return Vec::new();
        }

        tracing::info!(room = %room, "joining session");
        let join = Effect::Emit(Outbound::join(&room));
        self.room = Some(room);
        self.state = ConversationState::Idle;

        vec![join, Effect::AppendMessage(Message::agent(self.greeting.clone()))]
    }

    fn replay_history(&mut self, entries: Vec<HistoryEntry>) -> Vec<Effect> {
        tracing::info!(entries = entries.len(), "replaying history");

        let mut effects = Vec::with_capacity(entries.len() * 2 + 2);
        effects.push(Effect::ClearTranscript);
        for entry in entries {
            if let Some(user) = entry.user {
                effects.push(Effect::AppendMessage(Message::user(user)));
            }
            if let Some(ai) = entry.ai {
                effects.push(Effect::AppendMessage(Message::agent(ai)));
            }
        }
        effects.push(Effect::ScrollToBottom);
        effects
    }

    fn receive_reply(&mut self, payload: AiMessagePayload) -> Vec<Effect> {
        // Replies arrive in request order, so an abandoned request is answered first.
        if self.abandoned > 0 {
            self.abandoned -= 1;
            if self.state == ConversationState::AwaitingResponse {
                tracing::debug!(
                    pending = self.abandoned,
                    "late reply while awaiting; input stays locked"
                );
                return payload
                    .message
                    .map(|text| vec![Effect::AppendMessage(Message::agent(text))])
                    .unwrap_or_default();
            }
        }

        self.state = ConversationState::Idle;

        let mut effects = vec![Effect::DisarmResponseTimer, Effect::HideIndicator];
        if let Some(text) = payload.message {
            effects.push(Effect::AppendMessage(Message::agent(text)));
        }
        effects.push(Effect::EnableInput);
        effects.push(Effect::FocusInput);
        effects
    }

    fn expire_response(&mut self) -> Vec<Effect> {
        if self.state != ConversationState::AwaitingResponse {
            return Vec::new();
        }

        tracing::warn!(room = ?self.room, "no response before deadline; unlocking input");
        self.state = ConversationState::Idle;
        self.abandoned += 1;
        vec![
            Effect::HideIndicator,
            Effect::AppendMessage(Message::agent(RESPONSE_TIMEOUT_NOTICE)),
            Effect::EnableInput,
            Effect::FocusInput,
        ]
    }
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::events::{JoinPayload, MessagePayload};

    fn room() -> SessionId {
        SessionId::parse("room_abc123xyz").expect("valid room")
    }

    fn joined() -> ProtocolHandler {
        let mut handler = ProtocolHandler::default();
        handler.handle(ChatEvent::SessionStarted(room()));
        handler
    }

    fn emitted(effects: &[Effect]) -> Vec<Outbound> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Emit(outbound) => Some(outbound.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn session_start_emits_join_then_greets() {
        let mut handler = ProtocolHandler::default();
        let effects = handler.handle(ChatEvent::SessionStarted(room()));

        assert_eq!(
            effects,
            vec![
                Effect::Emit(Outbound::Join(JoinPayload {
                    room: "room_abc123xyz".to_string()
                })),
                Effect::AppendMessage(Message::agent(DEFAULT_GREETING)),
            ]
        );
        assert_eq!(handler.state(), ConversationState::Idle);
    }

    #[test]
    fn second_session_start_is_ignored() {
        let mut handler = joined();
        let other = SessionId::parse("room_other0000").expect("valid room");
        assert!(handler.handle(ChatEvent::SessionStarted(other)).is_empty());
        assert_eq!(handler.room(), Some(&room()));
    }

    #[test]
    fn send_before_join_is_rejected() {
        let mut handler = ProtocolHandler::default();
        assert_eq!(handler.request_send("hi"), Err(SendRejection::NotJoined));
        assert!(handler.handle(ChatEvent::SendRequested("hi".into())).is_empty());
    }

    #[test]
    fn send_trims_and_locks_input() {
        let mut handler = joined();
        let effects = handler
            .request_send("  hi \n")
            .expect("idle handler accepts non-empty input");

        assert_eq!(
            effects,
            vec![
                Effect::AppendMessage(Message::user("hi")),
                Effect::ClearInput,
                Effect::DisableInput,
                Effect::ShowIndicator,
                Effect::Emit(Outbound::Message(MessagePayload {
                    room: "room_abc123xyz".to_string(),
                    message: "hi".to_string(),
                })),
                Effect::ArmResponseTimer,
            ]
        );
        assert!(handler.is_busy());
    }

    #[test]
    fn whitespace_and_busy_sends_produce_nothing() {
        let mut handler = joined();
        assert_eq!(handler.request_send("   "), Err(SendRejection::EmptyInput));
        assert_eq!(handler.state(), ConversationState::Idle);

        handler.request_send("first").expect("first send");
        assert_eq!(handler.request_send("second"), Err(SendRejection::Busy));
        assert!(handler.handle(ChatEvent::SendRequested("third".into())).is_empty());
    }

    #[test]
    fn reply_unlocks_and_renders_when_present() {
        let mut handler = joined();
        handler.request_send("hi").expect("send");

        let effects = handler.handle(Inbound::AiMessage(AiMessagePayload::text("hello!")).into());
        assert_eq!(
            effects,
            vec![
                Effect::DisarmResponseTimer,
                Effect::HideIndicator,
                Effect::AppendMessage(Message::agent("hello!")),
                Effect::EnableInput,
                Effect::FocusInput,
            ]
        );
        assert_eq!(handler.state(), ConversationState::Idle);
    }

    #[test]
    fn reply_without_message_still_unlocks() {
        let mut handler = joined();
        handler.request_send("hi").expect("send");

        let effects = handler.handle(Inbound::AiMessage(AiMessagePayload::empty()).into());
        assert!(
            !effects
                .iter()
                .any(|effect| matches!(effect, Effect::AppendMessage(_)))
        );
        assert!(effects.contains(&Effect::EnableInput));
        assert!(!handler.is_busy());
    }

    #[test]
    fn history_replaces_transcript_in_payload_order() {
        let mut handler = joined();
        let effects = handler.handle(
            Inbound::History(vec![
                HistoryEntry::new(Some("a"), Some("b")),
                HistoryEntry::new(None, Some("c")),
                HistoryEntry::new(None, None),
            ])
            .into(),
        );

        assert_eq!(
            effects,
            vec![
                Effect::ClearTranscript,
                Effect::AppendMessage(Message::user("a")),
                Effect::AppendMessage(Message::agent("b")),
                Effect::AppendMessage(Message::agent("c")),
                Effect::ScrollToBottom,
            ]
        );
    }

    #[test]
    fn history_does_not_change_busy_state() {
        let mut handler = joined();
        handler.request_send("pending").expect("send");
        handler.handle(Inbound::History(Vec::new()).into());
        assert!(handler.is_busy());
    }

    #[test]
    fn timeout_only_applies_while_awaiting() {
        let mut handler = joined();
        assert!(handler.handle(ChatEvent::ResponseTimedOut).is_empty());

        handler.request_send("hi").expect("send");
        let effects = handler.handle(ChatEvent::ResponseTimedOut);
        assert!(effects.contains(&Effect::AppendMessage(Message::agent(
            RESPONSE_TIMEOUT_NOTICE
        ))));
        assert_eq!(handler.state(), ConversationState::Idle);
        assert!(handler.request_send("retry").is_ok());
    }

    #[test]
    fn late_reply_does_not_release_the_next_request() {
        let mut handler = joined();
        handler.request_send("q1").expect("first send");
        handler.handle(ChatEvent::ResponseTimedOut);
        handler.request_send("q2").expect("send after timeout");

        let effects = handler.handle(Inbound::AiMessage(AiMessagePayload::text("a1")).into());
        assert_eq!(effects, vec![Effect::AppendMessage(Message::agent("a1"))]);
        assert_eq!(handler.state(), ConversationState::AwaitingResponse);
        assert_eq!(handler.abandoned_requests(), 0);
        assert_eq!(handler.request_send("q3"), Err(SendRejection::Busy));

        let effects = handler.handle(Inbound::AiMessage(AiMessagePayload::text("a2")).into());
        assert!(effects.contains(&Effect::EnableInput));
        assert_eq!(handler.state(), ConversationState::Idle);
        assert!(handler.request_send("q3").is_ok());
    }

    #[test]
    fn late_reply_while_idle_is_rendered() {
        let mut handler = joined();
        handler.request_send("q1").expect("send");
        handler.handle(ChatEvent::ResponseTimedOut);

        let effects = handler.handle(Inbound::AiMessage(AiMessagePayload::text("a1")).into());
        assert!(effects.contains(&Effect::AppendMessage(Message::agent("a1"))));
        assert_eq!(handler.state(), ConversationState::Idle);
        assert_eq!(handler.abandoned_requests(), 0);
    }

    #[test]
    fn at_most_one_message_outstanding() {
        let mut handler = joined();
        let mut sent = 0i64;
        let mut replies = 0i64;

        let script = [
            "send", "send", "reply", "send", "send", "send", "reply", "reply", "send", "reply",
        ];
        for step in script {
            let effects = match step {
                "send" => handler.handle(ChatEvent::SendRequested("ping".into())),
                _ => {
                    replies += 1;
                    handler.handle(Inbound::AiMessage(AiMessagePayload::text("pong")).into())
                }
            };
            sent += emitted(&effects)
                .iter()
                .filter(|outbound| matches!(outbound, Outbound::Message(_)))
                .count() as i64;
            assert!(sent - replies <= 1, "outstanding sends exceeded one");
        }
        assert_eq!(sent, 3);
    }
}
