/// Fallback viewport height, in text rows, when none is configured.
pub const DEFAULT_VIEWPORT_ROWS: u32 = 24;

/// Tracks the transcript's vertical scroll position in text rows.
///
/// Content height comes from the display units; the offset is measured from the
/// top, so the newest content is visible when `offset == max_offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollManager {
    viewport_rows: u32,
    content_rows: u32,
    offset: u32,
}

impl ScrollManager {
    /// Creates an empty scroll model; the viewport is at least one row.
    pub fn new(viewport_rows: u32) -> Self {
        Self {
            viewport_rows: viewport_rows.max(1),
            content_rows: 0,
            offset: 0,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Largest offset that still fills the viewport.
    pub fn max_offset(&self) -> u32 {
        self.content_rows.saturating_sub(self.viewport_rows)
    }

    pub fn content_rows(&self) -> u32 {
        self.content_rows
    }

    pub fn viewport_rows(&self) -> u32 {
        self.viewport_rows
    }

    pub fn is_at_bottom(&self) -> bool {
        self.offset == self.max_offset()
    }

    /// Updates the content height; an offset past the new end is clamped.
    pub fn set_content_rows(&mut self, content_rows: u32) {
        self.content_rows = content_rows;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Jumps to the newest content regardless of where the user was.
    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// User scrolling, clamped to `[0, max_offset]`.
    pub fn scroll_to(&mut self, offset: u32) {
        self.offset = offset.min(self.max_offset());
    }

    pub fn reset(&mut self) {
        self.content_rows = 0;
        self.offset = 0;
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_ROWS)
    }
}
