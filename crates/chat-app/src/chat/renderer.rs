use pulldown_cmark::{
    CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream, html,
};

/// Curly-quote pair reserved for any quote substitution: double open/close,
/// single open/close.
pub const DEFAULT_QUOTES: [char; 4] = ['“', '”', '‘', '’'];

const LINK_PREFIXES: [&str; 3] = ["https://", "http://", "www."];
const LINK_TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"', ')', ']'];

/// Fixed configuration of the text-to-HTML conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Pass raw HTML through instead of escaping it.
    pub html: bool,
    /// Render single newlines as `<br />`.
    pub breaks: bool,
    /// Turn bare URLs into anchors.
    pub linkify: bool,
    /// Typographic replacements (smart quotes, dashes).
    pub typographer: bool,
    /// Double open/close, single open/close used when `typographer` is on.
    pub quotes: [char; 4],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            html: true,
            breaks: true,
            linkify: true,
            typographer: false,
            quotes: DEFAULT_QUOTES,
        }
    }
}

/// Pure `text -> html` conversion used for every transcript entry.
pub trait Renderer: Send + Sync {
    fn render(&self, text: &str) -> String;
}

/// Markdown renderer backed by `pulldown-cmark`.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    /// Creates a renderer with explicit options.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Returns the options every render uses.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Swaps the parser's curly quotes for the configured pair.
    fn substitute_quotes<'a>(&self, content: CowStr<'a>) -> CowStr<'a> {
        if !self.options.typographer || self.options.quotes == DEFAULT_QUOTES {
            return content;
        }

        let [double_open, double_close, single_open, single_close] = self.options.quotes;
        let replaced: String = content
            .chars()
            .map(|ch| match ch {
                '“' => double_open,
                '”' => double_close,
                '‘' => single_open,
                '’' => single_close,
                other => other,
            })
            .collect();
        CowStr::from(replaced)
    }

    fn parser_options(&self) -> Options {
        let mut options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        if self.options.typographer {
            options |= Options::ENABLE_SMART_PUNCTUATION;
        }
        options
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, text: &str) -> String {
        let parser = TextMergeStream::new(Parser::new_ext(text, self.parser_options()));
        let mut events = Vec::new();
        let mut link_depth = 0usize;
        let mut in_code_block = false;

        for event in parser {
            match event {
                Event::Start(Tag::Link { .. }) => {
                    link_depth += 1;
                    events.push(event);
                }
                Event::End(TagEnd::Link) => {
                    link_depth = link_depth.saturating_sub(1);
                    events.push(event);
                }
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code_block = true;
                    events.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    events.push(event);
                }
                Event::SoftBreak if self.options.breaks => events.push(Event::HardBreak),
                // Escaped by the HTML writer once it is plain text.
                Event::Html(raw) | Event::InlineHtml(raw) if !self.options.html => {
                    events.push(Event::Text(raw));
                }
                Event::Html(raw) => {
                    link_depth = track_html_anchors(link_depth, &raw);
                    events.push(Event::Html(raw));
                }
                Event::InlineHtml(raw) => {
                    link_depth = track_html_anchors(link_depth, &raw);
                    events.push(Event::InlineHtml(raw));
                }
                Event::Text(content) if in_code_block => events.push(Event::Text(content)),
                Event::Text(content) => {
                    let content = self.substitute_quotes(content);
                    if self.options.linkify && link_depth == 0 {
                        push_linkified(&mut events, &content);
                    } else {
                        events.push(Event::Text(content));
                    }
                }
                other => events.push(other),
            }
        }

        let mut output = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut output, events.into_iter());
        output
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Plain(&'a str),
    Link(&'a str),
}

fn push_linkified(events: &mut Vec<Event<'_>>, content: &str) {
    for segment in link_segments(content) {
        match segment {
            Segment::Plain(text) => events.push(Event::Text(CowStr::from(text.to_string()))),
            Segment::Link(url) => {
                let href = if url.starts_with("www.") {
                    format!("http://{url}")
                } else {
                    url.to_string()
                };
                events.push(Event::Start(Tag::Link {
                    link_type: LinkType::Autolink,
                    dest_url: CowStr::from(href),
                    title: CowStr::from(""),
                    id: CowStr::from(""),
                }));
                events.push(Event::Text(CowStr::from(url.to_string())));
                events.push(Event::End(TagEnd::Link));
            }
        }
    }
}

fn link_segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while cursor < text.len() {
        let Some(offset) = LINK_PREFIXES
            .iter()
            .filter_map(|prefix| text[cursor..].find(prefix))
            .min()
        else {
            break;
        };

        let start = cursor + offset;
        let candidate = &text[start..];
        let end = candidate
            .find(|ch: char| ch.is_whitespace() || ch == '<')
            .unwrap_or(candidate.len());
        let url = candidate[..end].trim_end_matches(LINK_TRAILING_PUNCTUATION);
        let at_boundary = text[..start].chars().next_back().is_none_or(is_link_boundary);

        if !at_boundary || !has_host(url) {
            // Every prefix starts with an ASCII byte, so this stays on a char boundary.
            cursor = start + 1;
            continue;
        }

        if start > plain_start {
            segments.push(Segment::Plain(&text[plain_start..start]));
        }
        segments.push(Segment::Link(url));
        plain_start = start + url.len();
        cursor = plain_start;
    }

    if plain_start < text.len() {
        segments.push(Segment::Plain(&text[plain_start..]));
    }
    segments
}

/// Link depth after a raw HTML fragment: `<a ...>` opens, `</a>` closes.
fn track_html_anchors(depth: usize, raw: &str) -> usize {
    let lower = raw.to_ascii_lowercase();
    let tag_ends_at = |rest: &str| rest.starts_with(|ch: char| ch.is_whitespace() || ch == '>');

    let opens = lower
        .match_indices("<a")
        .filter(|(index, _)| tag_ends_at(&lower[index + 2..]))
        .count();
    let closes = lower
        .match_indices("</a")
        .filter(|(index, _)| tag_ends_at(&lower[index + 3..]))
        .count();
    (depth + opens).saturating_sub(closes)
}

fn is_link_boundary(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | '[' | '"' | '\'' | '>')
}

fn has_host(url: &str) -> bool {
    let host = LINK_PREFIXES
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix))
        .unwrap_or_default();
    host.chars().next().is_some_and(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(text: &str) -> String {
        MarkdownRenderer::default().render(text)
    }

    #[test]
    fn defaults_match_chat_configuration() {
        let options = RenderOptions::default();
        assert!(options.html);
        assert!(options.breaks);
        assert!(options.linkify);
        assert!(!options.typographer);
        assert_eq!(options.quotes, ['“', '”', '‘', '’']);
    }

    #[test]
    fn single_newline_becomes_line_break() {
        assert_eq!(render("first\nsecond"), "<p>first<br />\nsecond</p>\n");
    }

    #[test]
    fn raw_html_passes_through() {
        let output = render("<div class=\"card\">hi</div>");
        assert!(output.contains("<div class=\"card\">hi</div>"));
    }

    #[test]
    fn raw_html_is_escaped_when_disabled() {
        let renderer = MarkdownRenderer::new(RenderOptions {
            html: false,
            ..RenderOptions::default()
        });
        let output = renderer.render("<b>bold</b>");
        assert!(output.contains("&lt;b&gt;"));
        assert!(!output.contains("<b>"));
    }

    #[test]
    fn bare_urls_become_links() {
        let output = render("see https://example.com/docs. or www.example.org");
        assert!(output.contains("<a href=\"https://example.com/docs\">https://example.com/docs</a>."));
        assert!(output.contains("<a href=\"http://www.example.org\">www.example.org</a>"));
    }

    #[test]
    fn existing_links_and_code_are_not_relinked() {
        let output = render("[docs](https://example.com)");
        assert_eq!(output.matches("<a ").count(), 1);

        let code = render("```\nhttps://example.com\n```");
        assert!(!code.contains("<a "));
    }

    #[test]
    fn urls_inside_raw_html_anchors_are_not_relinked() {
        let output = render("<a href=\"https://x.com\">https://x.com</a>");
        assert_eq!(output.matches("<a ").count(), 1);
        assert!(output.contains("<a href=\"https://x.com\">https://x.com</a>"));

        let after = render("<A HREF=\"https://x.com\">x</A> then https://y.com");
        assert!(after.contains("<a href=\"https://y.com\">https://y.com</a>"));
    }

    #[test]
    fn html_anchor_depth_ignores_other_tags() {
        assert_eq!(track_html_anchors(0, "<a href=\"x\">"), 1);
        assert_eq!(track_html_anchors(1, "</a>"), 0);
        assert_eq!(track_html_anchors(0, "<abbr title=\"t\">"), 0);
        assert_eq!(track_html_anchors(0, "</a>"), 0);
        assert_eq!(track_html_anchors(0, "<a>x</a>"), 0);
    }

    #[test]
    fn typographer_uses_configured_quote_pair() {
        let renderer = MarkdownRenderer::new(RenderOptions {
            typographer: true,
            quotes: ['«', '»', '‹', '›'],
            ..RenderOptions::default()
        });
        let output = renderer.render("\"quoted\" and 'single'");
        assert!(output.contains("«quoted»"));
        assert!(output.contains("‹single›"));

        let standard = MarkdownRenderer::new(RenderOptions {
            typographer: true,
            ..RenderOptions::default()
        });
        assert!(standard.render("\"quoted\"").contains("“quoted”"));
    }

    #[test]
    fn quotes_stay_straight_without_typographer() {
        let output = render("\"quoted\" and 'single'");
        assert!(output.contains("&quot;quoted&quot;") || output.contains("\"quoted\""));
        assert!(!output.contains('“'));
    }

    #[test]
    fn link_scanner_requires_word_boundary_and_host() {
        assert_eq!(
            link_segments("xhttps://a.b"),
            vec![Segment::Plain("xhttps://a.b")]
        );
        assert_eq!(link_segments("https:// x"), vec![Segment::Plain("https:// x")]);
        assert_eq!(
            link_segments("(https://a.b)"),
            vec![
                Segment::Plain("("),
                Segment::Link("https://a.b"),
                Segment::Plain(")"),
            ]
        );
    }
}
