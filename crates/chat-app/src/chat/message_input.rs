use crate::chat::events::ChatEvent;

/// Keys the input field reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
}

/// Raw user intent captured by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputTrigger {
    /// Pointer activation of the send control.
    SendClicked,
    KeyDown { key: Key, shift: bool },
    /// Text typed or pasted at the end of the field.
    Insert(String),
}

impl InputTrigger {
    pub fn enter() -> Self {
        Self::KeyDown {
            key: Key::Enter,
            shift: false,
        }
    }

    pub fn shift_enter() -> Self {
        Self::KeyDown {
            key: Key::Enter,
            shift: true,
        }
    }
}

/// Text field plus send control.
///
/// Both send triggers produce the same `SendRequested` event; validation and
/// gating happen in the protocol handler, never here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInput {
    value: String,
    enabled: bool,
    focused: bool,
}

impl MessageInput {
    pub fn new() -> Self {
        Self {
            value: String::new(),
            enabled: true,
            focused: true,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn handle_trigger(&mut self, trigger: InputTrigger) -> Option<ChatEvent> {
        match trigger {
            InputTrigger::SendClicked => Some(self.request_send()),
            InputTrigger::KeyDown {
                key: Key::Enter,
                shift: false,
            } => Some(self.request_send()),
            // Shift+Enter is a literal line break.
            InputTrigger::KeyDown {
                key: Key::Enter,
                shift: true,
            } => {
                self.value.push('\n');
                None
            }
            InputTrigger::KeyDown {
                key: Key::Backspace,
                ..
            } => {
                self.value.pop();
                None
            }
            InputTrigger::KeyDown {
                key: Key::Char(ch), ..
            } => {
                self.value.push(ch);
                None
            }
            InputTrigger::Insert(text) => {
                self.value.push_str(&text);
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    /// Disabling the field also drops its focus.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.focused = false;
        }
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    fn request_send(&self) -> ChatEvent {
        ChatEvent::SendRequested(self.value.clone())
    }
}

impl Default for MessageInput {
    fn default() -> Self {
        Self::new()
    }
}
