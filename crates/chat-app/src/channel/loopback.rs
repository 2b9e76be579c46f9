use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use snafu::Snafu;

use super::RemoteChannel;
use super::codec::FrameCodec;
use super::framed::FrameChannel;
use crate::chat::events::{AiMessagePayload, HistoryEntry, Inbound, Outbound};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AgentError {
    #[snafu(display("agent is unavailable on `{stage}`: {details}"))]
    Unavailable {
        stage: &'static str,
        details: String,
    },
}

/// The remote agent's reasoning, reduced to "reply to this utterance".
pub trait Agent: Send + Sync {
    fn respond<'a>(
        &'a self,
        room: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, AgentResult<String>>;
}

/// Replies with the user's own words, optionally after a delay.
#[derive(Debug, Clone, Default)]
pub struct EchoAgent {
    delay: Option<Duration>,
}

impl EchoAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Agent for EchoAgent {
    fn respond<'a>(
        &'a self,
        _room: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, AgentResult<String>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(format!("You said: {message}"))
        })
    }
}

/// In-process remote side speaking the chat protocol.
///
/// Keeps one history per room, replays it on `join`, and answers each
/// `message` through the configured agent.
pub struct LoopbackServer<A> {
    agent: A,
    histories: HashMap<String, Vec<HistoryEntry>>,
}

impl<A: Agent> LoopbackServer<A> {
    pub fn new(agent: A) -> Self {
        Self {
            agent,
            histories: HashMap::new(),
        }
    }

    /// Seeds a room's history, as if earlier runs had talked in it.
    pub fn with_history(mut self, room: impl Into<String>, entries: Vec<HistoryEntry>) -> Self {
        self.histories.insert(room.into(), entries);
        self
    }

    pub fn history(&self, room: &str) -> Option<&[HistoryEntry]> {
        self.histories.get(room).map(Vec::as_slice)
    }

    /// Applies one client emission and returns the events to deliver back.
    pub async fn handle(&mut self, event: Outbound) -> Vec<Inbound> {
        match event {
            Outbound::Join(payload) => {
                let history = self.histories.entry(payload.room.clone()).or_default();
                tracing::info!(room = %payload.room, entries = history.len(), "client joined");
                vec![Inbound::History(history.clone())]
            }
            Outbound::Message(payload) => {
                tracing::debug!(room = %payload.room, "received message");
                let history = self.histories.entry(payload.room.clone()).or_default();
                history.push(HistoryEntry::new(Some(&payload.message), None));

                let reply = match self.agent.respond(&payload.room, &payload.message).await {
                    Ok(reply) => reply,
                    Err(error) => {
                        tracing::warn!(room = %payload.room, error = %error, "agent failed");
                        format!("An error occurred: {error}")
                    }
                };

                if let Some(last) = self
                    .histories
                    .get_mut(&payload.room)
                    .and_then(|history| history.last_mut())
                {
                    last.ai = Some(reply.clone());
                }
                vec![Inbound::AiMessage(AiMessagePayload::text(reply))]
            }
        }
    }

    /// Serves the channel until the client hangs up.
    pub async fn serve(mut self, mut remote: RemoteChannel) -> Self {
        while let Some(event) = remote.outbound.recv().await {
            for reply in self.handle(event).await {
                if remote.inbound.send(reply).is_err() {
                    tracing::debug!("client dropped inbound channel; stopping loopback");
                    return self;
                }
            }
        }
        tracing::debug!("client closed outbound channel; stopping loopback");
        self
    }

    /// Serves a text-frame link until the client hangs up.
    ///
    /// Frames that do not decode as client events are logged and skipped.
    pub async fn serve_frames(mut self, codec: FrameCodec, mut wire: FrameChannel) -> Self {
        while let Some(frame) = wire.rx.recv().await {
            let event = match codec.decode_outbound(&frame) {
                Ok(event) => event,
                Err(error) => {
                    tracing::warn!(error = %error, frame = %frame, "ignoring undecodable frame");
                    continue;
                }
            };

            for reply in self.handle(event).await {
                let frame = match codec.encode_inbound(&reply) {
                    Ok(frame) => frame,
                    Err(error) => {
                        tracing::warn!(error = %error, "failed to encode reply");
                        continue;
                    }
                };
                if wire.tx.send(frame).is_err() {
                    tracing::debug!("client dropped frame link; stopping loopback");
                    return self;
                }
            }
        }
        tracing::debug!(namespace = codec.namespace(), "frame link closed; stopping loopback");
        self
    }
}
