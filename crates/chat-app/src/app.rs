use std::path::Path;
use std::sync::Arc;

use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zova_storage::{JsonFileStore, LocalStore, MemoryStore};

use crate::channel::{
    ClientChannel, EchoAgent, FrameCodec, LoopbackServer, bridge, channel_pair, frame_pair,
};
use crate::chat::message::Sender;
use crate::chat::message_input::InputTrigger;
use crate::chat::renderer::MarkdownRenderer;
use crate::chat::{ChatView, SessionIdentityProvider, TranscriptUpdate};
use crate::settings::LiveSettings;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("failed to read input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("background task failed on `{stage}`: {source}"))]
    JoinTask {
        stage: &'static str,
        source: tokio::task::JoinError,
    },
}

pub type AppResult<T> = Result<T, AppError>;

/// Opens the durable session store, degrading to memory when the file is unusable.
pub fn open_store(path: &Path) -> Arc<dyn LocalStore> {
    match JsonFileStore::open(path) {
        Ok(store) => {
            tracing::debug!(path = %store.path().display(), "using file-backed local storage");
            Arc::new(store)
        }
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "local storage unavailable, session id will not survive restarts"
            );
            Arc::new(MemoryStore::new())
        }
    }
}

/// Background tasks behind a loopback connection.
pub struct LoopbackLink {
    pub server: JoinHandle<LoopbackServer<EchoAgent>>,
    pub bridge: JoinHandle<()>,
}

impl LoopbackLink {
    /// Waits for both tasks after the client side has hung up.
    pub async fn finish(self) -> AppResult<LoopbackServer<EchoAgent>> {
        self.bridge.await.context(JoinTaskSnafu {
            stage: "join-frame-bridge",
        })?;
        self.server.await.context(JoinTaskSnafu {
            stage: "join-loopback-server",
        })
    }
}

/// Connects a client channel to the in-process agent through Socket.IO frames
/// on the `transport_path` namespace.
pub fn spawn_loopback(transport_path: &str) -> (ClientChannel, LoopbackLink) {
    let codec = FrameCodec::new(transport_path);
    let (client, remote) = channel_pair();
    let (client_wire, server_wire) = frame_pair();

    let server = tokio::spawn(
        LoopbackServer::new(EchoAgent::new()).serve_frames(codec.clone(), server_wire),
    );
    let link = tokio::spawn(bridge(codec, remote, client_wire));
    (
        client,
        LoopbackLink {
            server,
            bridge: link,
        },
    )
}

/// Terminal line for a transcript update, if it has one.
pub fn format_update(update: &TranscriptUpdate) -> Option<String> {
    match update {
        TranscriptUpdate::Cleared => Some("-- conversation restored --".to_string()),
        TranscriptUpdate::Appended(message) => {
            let label = match message.sender {
                Sender::User => "you",
                Sender::Agent => "agent",
            };
            Some(format!("{label}> {}", message.text))
        }
        TranscriptUpdate::IndicatorShown => Some("agent is typing...".to_string()),
        TranscriptUpdate::IndicatorHidden | TranscriptUpdate::InputEnabled(_) => None,
    }
}

/// Runs one chat session against the in-process agent, reading stdin line by line.
///
/// Each line is submitted as typed text followed by Enter. The session ends
/// when stdin closes.
pub async fn run(settings: Arc<LiveSettings>) -> AppResult<()> {
    let store = open_store(&settings.resolved_storage_path());
    let mut identity = SessionIdentityProvider::new(store);

    let (client, link) = spawn_loopback(&settings.transport_path);
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let mut view = ChatView::new(
        settings.view_config(),
        Box::new(MarkdownRenderer::default()),
        client.outbound,
    )
    .with_updates(updates_tx);

    let room = view.start(&mut identity);
    tracing::info!(
        room = %room,
        transport_path = %settings.transport_path,
        "chat session started"
    );

    let printer = tokio::spawn(print_updates(updates_rx));
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let view_task = tokio::spawn(view.run(client.inbound, input_rx));

    forward_stdin(input_tx).await?;

    let view = view_task.await.context(JoinTaskSnafu {
        stage: "join-chat-view",
    })?;
    tracing::debug!(messages = view.message_list().len(), "chat view finished");
    drop(view);

    link.finish().await?;
    printer.await.context(JoinTaskSnafu {
        stage: "join-transcript-printer",
    })?;
    Ok(())
}

async fn forward_stdin(input: mpsc::UnboundedSender<InputTrigger>) -> AppResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context(ReadInputSnafu {
        stage: "read-stdin-line",
    })? {
        if input.send(InputTrigger::Insert(line)).is_err()
            || input.send(InputTrigger::enter()).is_err()
        {
            break;
        }
    }
    Ok(())
}

async fn print_updates(mut updates: mpsc::UnboundedReceiver<TranscriptUpdate>) {
    let mut stdout = tokio::io::stdout();
    while let Some(update) = updates.recv().await {
        let Some(line) = format_update(&update) else {
            continue;
        };
        let written = async {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await
        };
        if let Err(error) = written.await {
            tracing::warn!(error = %error, "failed to write transcript to stdout");
            return;
        }
    }
}
