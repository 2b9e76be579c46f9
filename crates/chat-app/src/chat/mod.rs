/// Event contracts for the chat protocol and internal dispatch.
pub mod events;
pub mod handler;
/// Durable session identity.
pub mod identity;
pub mod indicator;
/// Transcript entries.
pub mod message;
pub mod message_input;
pub mod message_list;
pub mod renderer;
pub mod scroll_manager;
pub mod view;

pub use events::{ChatEvent, HistoryEntry, Inbound, Outbound};
pub use handler::{ConversationState, Effect, ProtocolHandler, SendRejection};
pub use identity::SessionIdentityProvider;
pub use indicator::TypingIndicator;
pub use message::{Message, Sender};
pub use message_input::{InputTrigger, Key, MessageInput};
pub use message_list::{DisplayUnit, MessageList, UnitKind};
pub use renderer::{MarkdownRenderer, RenderOptions, Renderer};
pub use scroll_manager::ScrollManager;
pub use view::{ChatView, ChatViewConfig, TranscriptUpdate};
