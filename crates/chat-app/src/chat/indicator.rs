use super::message_list::{DisplayUnit, UnitKind};

/// Reserved element id of the busy indicator; at most one unit carries it.
pub const INDICATOR_ELEMENT_ID: &str = "thinking";

const AVATAR_MARKUP: &str = concat!(
    "<div class=\"mime-aviator-avatar\">",
    "<div class=\"mime-aviator-avatar-light\">",
    "<img class=\"mime3\" src=\"/static/icons/mime2.svg\" alt=\"avatar\">",
    "</div></div>",
);

const DOTS_MARKUP: &str = concat!(
    "<svg id=\"dots\" width=\"132px\" height=\"58px\" viewBox=\"0 0 132 58\" ",
    "xmlns=\"http://www.w3.org/2000/svg\"><title>dots</title>",
    "<g stroke=\"none\" stroke-width=\"1\" fill=\"none\" fill-rule=\"evenodd\">",
    "<g fill=\"#A3A3A3\">",
    "<circle id=\"dot1\" cx=\"25\" cy=\"30\" r=\"13\"></circle>",
    "<circle id=\"dot2\" cx=\"65\" cy=\"30\" r=\"13\"></circle>",
    "<circle id=\"dot3\" cx=\"105\" cy=\"30\" r=\"13\"></circle>",
    "</g></g></svg>",
);

/// Transient "agent is typing" unit shown while a request is outstanding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingIndicator {
    visible: bool,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns false when the indicator was already shown.
    pub fn show(&mut self) -> bool {
        !std::mem::replace(&mut self.visible, true)
    }

    /// Returns false when there was nothing to remove.
    pub fn hide(&mut self) -> bool {
        std::mem::replace(&mut self.visible, false)
    }

    /// The display unit while shown.
    pub fn unit(&self) -> Option<DisplayUnit> {
        self.visible.then(indicator_unit)
    }
}

pub(crate) fn avatar_markup() -> &'static str {
    AVATAR_MARKUP
}

fn indicator_unit() -> DisplayUnit {
    DisplayUnit {
        kind: UnitKind::Indicator,
        element_id: Some(INDICATOR_ELEMENT_ID),
        html: format!(
            "<div id=\"{INDICATOR_ELEMENT_ID}\" class=\"thinking\">\
             <div class=\"aviator-dp\"><div class=\"container2\">{AVATAR_MARKUP}</div></div>\
             {DOTS_MARKUP}</div>"
        ),
        rows: 2,
    }
}
