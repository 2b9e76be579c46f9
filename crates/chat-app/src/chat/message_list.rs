use crate::chat::indicator::{TypingIndicator, avatar_markup};
use crate::chat::message::{Message, Sender};
use crate::chat::renderer::Renderer;
use crate::chat::scroll_manager::ScrollManager;

/// Column width used to estimate how many rows a unit occupies.
const ESTIMATED_WRAP_COLUMNS: usize = 80;
/// Vertical chrome (padding, margins) around every message unit.
const UNIT_CHROME_ROWS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    UserMessage,
    AgentMessage,
    Indicator,
}

/// One rendered node of the transcript container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayUnit {
    pub kind: UnitKind,
    pub element_id: Option<&'static str>,
    pub html: String,
    pub rows: u32,
}

/// Ordered transcript plus its rendered projection.
///
/// `messages` is the source of truth. `units` holds the rendered form of each
/// message at the same index, and the busy indicator is always projected last.
pub struct MessageList {
    renderer: Box<dyn Renderer>,
    messages: Vec<Message>,
    units: Vec<DisplayUnit>,
    indicator: TypingIndicator,
    scroll_manager: ScrollManager,
}

impl MessageList {
    /// Creates an empty transcript rendering through `renderer`.
    pub fn new(renderer: Box<dyn Renderer>, scroll_manager: ScrollManager) -> Self {
        Self {
            renderer,
            messages: Vec::new(),
            units: Vec::new(),
            indicator: TypingIndicator::new(),
            scroll_manager,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn indicator_visible(&self) -> bool {
        self.indicator.is_visible()
    }

    pub fn scroll_manager(&self) -> &ScrollManager {
        &self.scroll_manager
    }

    /// User-driven scrolling; appends still jump back to the bottom.
    pub fn scroll_to(&mut self, offset: u32) {
        self.scroll_manager.scroll_to(offset);
    }

    /// Every unit in container order, indicator last when shown.
    pub fn display_units(&self) -> Vec<DisplayUnit> {
        self.units
            .iter()
            .cloned()
            .chain(self.indicator.unit())
            .collect()
    }

    /// Renders and appends one message, then scrolls to the newest content.
    pub fn append_message(&mut self, message: Message) -> &DisplayUnit {
        let unit = render_message_unit(self.renderer.as_ref(), &message);
        self.messages.push(message);
        self.units.push(unit);
        self.sync_content_rows();
        self.scroll_manager.scroll_to_bottom();

        let last = self.units.len() - 1;
        &self.units[last]
    }

    /// Empties the container, indicator included.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.units.clear();
        self.indicator.hide();
        self.scroll_manager.reset();
    }

    /// Adds the typing indicator after the newest message.
    pub fn show_indicator(&mut self) -> bool {
        let shown = self.indicator.show();
        self.sync_content_rows();
        self.scroll_manager.scroll_to_bottom();
        shown
    }

    pub fn hide_indicator(&mut self) -> bool {
        let hidden = self.indicator.hide();
        if hidden {
            self.sync_content_rows();
        }
        hidden
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_manager.scroll_to_bottom();
    }

    fn sync_content_rows(&mut self) {
        let message_rows: u32 = self.units.iter().map(|unit| unit.rows).sum();
        let indicator_rows = self.indicator.unit().map_or(0, |unit| unit.rows);
        self.scroll_manager
            .set_content_rows(message_rows + indicator_rows);
    }
}

fn render_message_unit(renderer: &dyn Renderer, message: &Message) -> DisplayUnit {
    let content = renderer.render(&message.text);
    let rows = estimate_text_rows(&message.text) + UNIT_CHROME_ROWS;

    match message.sender {
        Sender::User => DisplayUnit {
            kind: UnitKind::UserMessage,
            element_id: None,
            html: format!(
                "<div class=\"user-message\"><div class=\"message-box\">\
                 <div class=\"user-query\">{content}</div></div></div>"
            ),
            rows,
        },
        Sender::Agent => DisplayUnit {
            kind: UnitKind::AgentMessage,
            element_id: None,
            html: format!(
                "<div class=\"agent-message\">{avatar}<div class=\"agent-content\">{content}</div></div>",
                avatar = avatar_markup()
            ),
            rows,
        },
    }
}

fn estimate_text_rows(content: &str) -> u32 {
    let mut rows = 0usize;
    for line in content.lines() {
        let char_count = line.chars().count().max(1);
        rows += char_count.div_ceil(ESTIMATED_WRAP_COLUMNS);
    }

    // Account for the trailing empty line when content ends with a newline.
    if content.ends_with('\n') {
        rows += 1;
    }

    u32::try_from(rows.max(1)).unwrap_or(u32::MAX)
}
