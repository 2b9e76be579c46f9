use std::time::Duration;

use futures::future::OptionFuture;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use zova_storage::{LocalStore, SessionId};

use crate::chat::events::{ChatEvent, Inbound, Outbound};
use crate::chat::handler::{ConversationState, DEFAULT_GREETING, Effect, ProtocolHandler};
use crate::chat::identity::SessionIdentityProvider;
use crate::chat::message::Message;
use crate::chat::message_input::{InputTrigger, MessageInput};
use crate::chat::message_list::MessageList;
use crate::chat::renderer::Renderer;
use crate::chat::scroll_manager::{DEFAULT_VIEWPORT_ROWS, ScrollManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatViewConfig {
    pub greeting: String,
    /// `None` waits for a reply forever.
    pub response_timeout: Option<Duration>,
    pub viewport_rows: u32,
}

impl Default for ChatViewConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            response_timeout: None,
            viewport_rows: DEFAULT_VIEWPORT_ROWS,
        }
    }
}

/// Emitted after the view applies a visible change, for front-ends to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptUpdate {
    Cleared,
    Appended(Message),
    IndicatorShown,
    IndicatorHidden,
    InputEnabled(bool),
}

/// Coordinator for the protocol handler, transcript and input.
///
/// All conversation state lives here and is only touched from the task running
/// [`ChatView::run`], so the busy flag needs no synchronization.
pub struct ChatView {
    handler: ProtocolHandler,
    message_list: MessageList,
    message_input: MessageInput,
    outbound: mpsc::UnboundedSender<Outbound>,
    updates: Option<mpsc::UnboundedSender<TranscriptUpdate>>,
    response_timeout: Option<Duration>,
    response_deadline: Option<Instant>,
}

impl ChatView {
    /// Builds an idle view; nothing is emitted until [`ChatView::start`].
    pub fn new(
        config: ChatViewConfig,
        renderer: Box<dyn Renderer>,
        outbound: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            handler: ProtocolHandler::new(config.greeting),
            message_list: MessageList::new(renderer, ScrollManager::new(config.viewport_rows)),
            message_input: MessageInput::new(),
            outbound,
            updates: None,
            response_timeout: config.response_timeout,
            response_deadline: None,
        }
    }

    /// Streams every visible change to `updates`.
    pub fn with_updates(mut self, updates: mpsc::UnboundedSender<TranscriptUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    /// Current input-lock state.
    pub fn state(&self) -> ConversationState {
        self.handler.state()
    }

    /// The joined room, once started.
    pub fn room(&self) -> Option<&SessionId> {
        self.handler.room()
    }

    pub fn message_list(&self) -> &MessageList {
        &self.message_list
    }

    pub fn message_input(&self) -> &MessageInput {
        &self.message_input
    }

    /// When the outstanding request gives up, if a timeout is configured.
    pub fn response_deadline(&self) -> Option<Instant> {
        self.response_deadline
    }

    /// Resolves the session identity, then joins and greets.
    ///
    /// `join` is the first emission of every session; sends before this point
    /// are rejected by the handler.
    pub fn start<S: LocalStore>(&mut self, identity: &mut SessionIdentityProvider<S>) -> SessionId {
        let room = identity.get_or_create_session_id();
        self.dispatch(ChatEvent::SessionStarted(room.clone()));
        room
    }

    /// Applies one protocol event from the channel.
    pub fn handle_inbound(&mut self, event: Inbound) {
        tracing::debug!(event = event.event_name(), "inbound event");
        self.dispatch(event.into());
    }

    /// Feeds one user trigger through the input field.
    pub fn handle_input(&mut self, trigger: InputTrigger) {
        if let Some(event) = self.message_input.handle_trigger(trigger) {
            self.dispatch(event);
        }
    }

    /// Gives up on the outstanding request; a no-op while idle.
    pub fn expire_response(&mut self) {
        self.response_deadline = None;
        self.dispatch(ChatEvent::ResponseTimedOut);
    }

    /// Runs the dispatch loop until the input source closes.
    ///
    /// A closed inbound channel is a transport problem: it is logged and input
    /// handling continues.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<Inbound>,
        mut input: mpsc::UnboundedReceiver<InputTrigger>,
    ) -> Self {
        let mut inbound_open = true;

        loop {
            let deadline = OptionFuture::from(self.response_deadline.map(time::sleep_until));

            tokio::select! {
                event = inbound.recv(), if inbound_open => match event {
                    Some(event) => self.handle_inbound(event),
                    None => {
                        tracing::warn!("channel closed; no further protocol events will arrive");
                        inbound_open = false;
                    }
                },
                trigger = input.recv() => match trigger {
                    Some(trigger) => self.handle_input(trigger),
                    None => break,
                },
                Some(()) = deadline => self.expire_response(),
            }
        }

        tracing::debug!("input closed; chat view stopped");
        self
    }

    fn dispatch(&mut self, event: ChatEvent) {
        for effect in self.handler.handle(event) {
            self.apply_effect(effect);
        }
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Emit(event) => {
                let name = event.event_name();
                if self.outbound.send(event).is_err() {
                    tracing::warn!(event = name, "channel closed; emission dropped");
                }
            }
            Effect::ClearTranscript => {
                self.message_list.clear();
                self.notify(TranscriptUpdate::Cleared);
            }
            Effect::AppendMessage(message) => {
                self.message_list.append_message(message.clone());
                self.notify(TranscriptUpdate::Appended(message));
            }
            Effect::ShowIndicator => {
                if self.message_list.show_indicator() {
                    self.notify(TranscriptUpdate::IndicatorShown);
                }
            }
            Effect::HideIndicator => {
                if self.message_list.hide_indicator() {
                    self.notify(TranscriptUpdate::IndicatorHidden);
                }
            }
            Effect::ClearInput => self.message_input.clear(),
            Effect::DisableInput => {
                self.message_input.set_enabled(false);
                self.notify(TranscriptUpdate::InputEnabled(false));
            }
            Effect::EnableInput => {
                self.message_input.set_enabled(true);
                self.notify(TranscriptUpdate::InputEnabled(true));
            }
            Effect::FocusInput => self.message_input.focus(),
            Effect::ScrollToBottom => self.message_list.scroll_to_bottom(),
            Effect::ArmResponseTimer => {
                self.response_deadline = self
                    .response_timeout
                    .map(|timeout| Instant::now() + timeout);
            }
            Effect::DisarmResponseTimer => self.response_deadline = None,
        }
    }

    fn notify(&self, update: TranscriptUpdate) {
        if let Some(updates) = &self.updates {
            // A front-end that stopped listening does not stop the conversation.
            let _ = updates.send(update);
        }
    }
}
