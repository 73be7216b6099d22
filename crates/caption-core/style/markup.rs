//! HTML-like inline tag handling shared by the SRT and VTT bridges

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Segment, SpanStyle, StyledText};

/// Piece of inline markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text between tags
    Text(&'a str),
    /// Opening tag
    Open(Tag<'a>),
    /// Closing tag, name lowercased
    Close { name: String, raw: &'a str },
}

/// Opening tag with its parts split out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Lowercased tag name
    pub name: String,
    /// `.class` suffixes, as used by VTT
    pub classes: Vec<&'a str>,
    /// Text after the name that is not an attribute, such as a VTT voice
    pub annotation: Option<&'a str>,
    /// `key=value` attributes with lowercased keys
    pub attributes: Vec<(String, &'a str)>,
    /// Whole tag as written
    pub raw: &'a str,
}

impl Tag<'_> {
    /// Value of attribute `key`
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| *value)
    }
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)((?:\.[^\s.<>]+)*)(\s[^<>]*)?>")
            .unwrap_or_else(|_| unreachable!("tag pattern is valid"))
    })
}

fn attribute_regex() -> &'static Regex {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .unwrap_or_else(|_| unreachable!("attribute pattern is valid"))
    })
}

/// Split `input` into text and tag tokens
///
/// Anything that does not look like a tag stays text.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for captures in tag_regex().captures_iter(input) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if whole.start() > last {
            tokens.push(Token::Text(&input[last..whole.start()]));
        }
        last = whole.end();

        let name = captures
            .get(2)
            .map_or_else(String::new, |m| m.as_str().to_ascii_lowercase());
        if captures.get(1).is_some_and(|m| !m.as_str().is_empty()) {
            tokens.push(Token::Close {
                name,
                raw: whole.as_str(),
            });
            continue;
        }

        let classes = captures
            .get(3)
            .map(|m| {
                m.as_str()
                    .split('.')
                    .filter(|class| !class.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let rest = captures.get(4).map_or("", |m| m.as_str());
        let attributes: Vec<(String, &str)> = attribute_regex()
            .captures_iter(rest)
            .filter_map(|attr| {
                let key = attr.get(1)?.as_str().to_ascii_lowercase();
                let value = attr.get(2).or_else(|| attr.get(3)).or_else(|| attr.get(4))?;
                Some((key, value.as_str()))
            })
            .collect();
        let annotation = if attributes.is_empty() {
            Some(rest.trim()).filter(|text| !text.is_empty())
        } else {
            None
        };
        tokens.push(Token::Open(Tag {
            name,
            classes,
            annotation,
            attributes,
            raw: whole.as_str(),
        }));
    }
    if last < input.len() {
        tokens.push(Token::Text(&input[last..]));
    }
    tokens
}

/// Open tags and the style each one restores when closed
#[derive(Debug, Default)]
pub struct StyleStack {
    open: Vec<(String, SpanStyle)>,
    current: SpanStyle,
}

impl StyleStack {
    /// Stack starting from `base`
    #[must_use]
    pub fn new(base: SpanStyle) -> Self {
        Self {
            open: Vec::new(),
            current: base,
        }
    }

    /// Style of the text at the current position
    #[must_use]
    pub const fn current(&self) -> &SpanStyle {
        &self.current
    }

    /// Enter tag `name`, switching to `style`
    pub fn open(&mut self, name: &str, style: SpanStyle) {
        let previous = core::mem::replace(&mut self.current, style);
        self.open.push((name.to_string(), previous));
    }

    /// Leave the innermost tag called `name`
    ///
    /// Tags opened after it are closed too. Returns `false` when no such
    /// tag is open.
    pub fn close(&mut self, name: &str) -> bool {
        let Some(position) = self.open.iter().rposition(|(open, _)| open == name) else {
            return false;
        };
        if let Some((_, style)) = self.open.split_off(position).into_iter().next() {
            self.current = style;
        }
        true
    }
}

/// Opening and closing markup of one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPair {
    pub open: String,
    pub close: String,
}

impl TagPair {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Render styled segments as nested tags
///
/// `tags_for` returns the tags a style needs, outermost first. Tags shared
/// with the previous run stay open; the rest are closed innermost first and
/// reopened, so the output is always properly nested. Tags that do not
/// continue past a line break are closed before it.
pub fn emit_nested(
    segments: &[Segment],
    tags_for: impl Fn(&SpanStyle) -> Vec<TagPair>,
    escape: impl Fn(&str) -> Cow<'_, str>,
    line_break: &str,
) -> String {
    fn close_unshared(out: &mut String, open: &mut Vec<TagPair>, wanted: &[TagPair]) {
        let shared = open
            .iter()
            .zip(wanted)
            .take_while(|(a, b)| a == b)
            .count();
        while open.len() > shared {
            if let Some(tag) = open.pop() {
                out.push_str(&tag.close);
            }
        }
    }

    let mut out = String::new();
    let mut open: Vec<TagPair> = Vec::new();
    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::LineBreak => {
                let next = segments[index + 1..].iter().find_map(|segment| match segment {
                    Segment::Text { style, .. } => Some(tags_for(style)),
                    Segment::LineBreak => None,
                });
                close_unshared(&mut out, &mut open, &next.unwrap_or_default());
                out.push_str(line_break);
            }
            Segment::Text { text, style } => {
                let wanted = tags_for(style);
                close_unshared(&mut out, &mut open, &wanted);
                for tag in wanted.into_iter().skip(open.len()) {
                    out.push_str(&tag.open);
                    open.push(tag);
                }
                out.push_str(&escape(text));
            }
        }
    }
    while let Some(tag) = open.pop() {
        out.push_str(&tag.close);
    }
    out
}

/// Build styled text from tokens, resolving known tags with `on_open`
///
/// `on_open` returns the new style for a recognised tag or `None` to keep
/// the tag as literal text. Closing tags that match nothing are kept as
/// text too.
pub fn build_styled(
    tokens: &[Token<'_>],
    base: SpanStyle,
    mut on_open: impl FnMut(&Tag<'_>, &SpanStyle) -> Option<SpanStyle>,
    unescape: impl Fn(&str) -> Cow<'_, str>,
) -> StyledText {
    let mut text = StyledText::new();
    let mut stack = StyleStack::new(base);
    for token in tokens {
        match token {
            Token::Text(raw) => text.push_text(&unescape(raw), stack.current().clone()),
            Token::Open(tag) => match on_open(tag, stack.current()) {
                Some(style) => stack.open(&tag.name, style),
                None => {
                    log::debug!("Unrecognised tag {} kept as text", tag.raw);
                    text.push_text(tag.raw, stack.current().clone());
                }
            },
            Token::Close { name, raw } => {
                if !stack.close(name) {
                    log::debug!("Unmatched closing tag {raw} kept as text");
                    text.push_text(raw, stack.current().clone());
                }
            }
        }
    }
    text
}

/// Decode the XML/HTML entities that appear in caption text
#[must_use]
pub fn unescape_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                "lrm" => Some('\u{200e}'),
                "rlm" => Some('\u{200f}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((ch, end + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Escape `&`, `<` and `>`
#[must_use]
pub fn escape_entities(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>']) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextFlags;

    #[test]
    fn tokenizes_tags_and_text() {
        let tokens = tokenize(r#"a <font color="red" size=12>b</font> <c.x.y>c</c> <v Bob>d"#);
        assert_eq!(tokens[0], Token::Text("a "));
        let Token::Open(font) = &tokens[1] else {
            panic!("expected font tag");
        };
        assert_eq!(font.name, "font");
        assert_eq!(font.attribute("color"), Some("red"));
        assert_eq!(font.attribute("size"), Some("12"));

        let Token::Open(class) = &tokens[5] else {
            panic!("expected class tag");
        };
        assert_eq!(class.classes, ["x", "y"]);

        let Token::Open(voice) = &tokens[9] else {
            panic!("expected voice tag");
        };
        assert_eq!(voice.annotation, Some("Bob"));
    }

    #[test]
    fn stack_closes_intermediate_tags() {
        let mut stack = StyleStack::new(SpanStyle::plain());
        stack.open("b", SpanStyle::plain().with_flags(TextFlags::BOLD));
        stack.open("i", SpanStyle::plain().with_flags(TextFlags::BOLD | TextFlags::ITALIC));
        assert!(stack.close("b"));
        assert!(stack.current().is_plain());
        assert!(!stack.close("i"));
    }

    #[test]
    fn nested_emission_reuses_open_tags() {
        let bold = SpanStyle::plain().with_flags(TextFlags::BOLD);
        let bold_italic = bold.clone().with_flags(TextFlags::ITALIC);
        let mut text = StyledText::new();
        text.push_text("a", bold);
        text.push_text("b", bold_italic);
        let out = emit_nested(
            text.segments(),
            |style| {
                let mut tags = Vec::new();
                if style.flags.contains(TextFlags::BOLD) {
                    tags.push(TagPair::new("<b>", "</b>"));
                }
                if style.flags.contains(TextFlags::ITALIC) {
                    tags.push(TagPair::new("<i>", "</i>"));
                }
                tags
            },
            |text: &str| Cow::Borrowed(text),
            "\n",
        );
        assert_eq!(out, "<b>a<i>b</i></b>");
    }

    #[test]
    fn entities_round_trip() {
        assert_eq!(unescape_entities("a &amp; b &lt;c&gt; &#65;&#x42; &bogus"), "a & b <c> AB &bogus");
        assert_eq!(escape_entities("<a & b>"), "&lt;a &amp; b&gt;");
    }
}
