//! Styled caption text
//!
//! [`StyledText`] is a flattened span tree: an ordered list of runs, each
//! carrying the full set of attributes active at that point, separated by
//! explicit line breaks. Nesting in the source markup is recovered by the
//! style bridge when writing, so the canonical form never depends on how a
//! particular format happened to nest its tags.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::reflow::{reflow_with, DefaultSegmenter, PhraseSegmenter, ReflowOptions};
use crate::utils::Color;

bitflags::bitflags! {
    /// On/off text decorations
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct TextFlags: u8 {
        /// Bold text
        const BOLD = 1 << 0;
        /// Italic text
        const ITALIC = 1 << 1;
        /// Underlined text
        const UNDERLINE = 1 << 2;
        /// Struck through text
        const STRIKETHROUGH = 1 << 3;
    }
}

impl Default for TextFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Attributes active on a run of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SpanStyle {
    /// Bold, italic, underline and strikethrough
    pub flags: TextFlags,
    /// Foreground colour
    pub color: Option<Color>,
    /// Font family name
    pub font_family: Option<String>,
    /// Font size with its unit, for example `12pt` or `120%`
    pub font_size: Option<String>,
    /// Class names: VTT classes, TTML style references, MicroDVD code sets
    pub classes: Vec<String>,
    /// Further properties keyed by CSS name, or by `tts:` name when TTML has
    /// no CSS equivalent
    pub extra: BTreeMap<String, String>,
}

impl SpanStyle {
    /// Style with no attributes
    #[must_use]
    pub fn plain() -> Self {
        Self::default()
    }

    /// Whether no attribute is set
    #[must_use]
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Copy with `flags` added
    #[must_use]
    pub fn with_flags(mut self, flags: TextFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Copy with a colour
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Copy with a class appended once
    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        if !self.classes.iter().any(|c| c == class) {
            self.classes.push(class.to_string());
        }
        self
    }

    /// Whether any font attribute is set
    #[must_use]
    pub fn has_font(&self) -> bool {
        self.color.is_some() || self.font_family.is_some() || self.font_size.is_some()
    }

    /// Overlay `other` on top of `self`; set attributes of `other` win
    pub fn merge_from(&mut self, other: &Self) {
        self.flags |= other.flags;
        if other.color.is_some() {
            self.color = other.color;
        }
        if other.font_family.is_some() {
            self.font_family.clone_from(&other.font_family);
        }
        if other.font_size.is_some() {
            self.font_size.clone_from(&other.font_size);
        }
        for class in &other.classes {
            if !self.classes.contains(class) {
                self.classes.push(class.clone());
            }
        }
        for (key, value) in &other.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// One element of a styled text
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum Segment {
    /// Text sharing one style
    Text { text: String, style: SpanStyle },
    /// Explicit line break
    LineBreak,
}

/// Caption text for one language
///
/// # Example
///
/// ```rust
/// use caption_core::{SpanStyle, StyledText, TextFlags};
///
/// let mut text = StyledText::from_plain("Hello");
/// text.push_text(" world", SpanStyle::plain().with_flags(TextFlags::BOLD));
/// text.push_line_break();
/// text.push_plain("second line");
///
/// assert_eq!(text.plain_text(), "Hello world\nsecond line");
/// assert_eq!(text.lines().count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct StyledText {
    segments: Vec<Segment>,
}

impl StyledText {
    /// Empty text
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Unstyled text; `\n` becomes a line break
    #[must_use]
    pub fn from_plain(text: &str) -> Self {
        let mut styled = Self::new();
        styled.push_plain(text);
        styled
    }

    /// All segments in order
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether there is no visible text
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|segment| match segment {
            Segment::Text { text, .. } => text.is_empty(),
            Segment::LineBreak => true,
        })
    }

    /// Append text in `style`, merging with the previous run when the style
    /// matches; `\n` inside `text` becomes a line break
    pub fn push_text(&mut self, text: &str, style: SpanStyle) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.push_run(first, &style);
        }
        for part in parts {
            self.segments.push(Segment::LineBreak);
            self.push_run(part, &style);
        }
    }

    /// Append unstyled text
    pub fn push_plain(&mut self, text: &str) {
        self.push_text(text, SpanStyle::plain());
    }

    /// Append an explicit line break
    pub fn push_line_break(&mut self) {
        self.segments.push(Segment::LineBreak);
    }

    fn push_run(&mut self, text: &str, style: &SpanStyle) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text {
            text: last,
            style: last_style,
        }) = self.segments.last_mut()
        {
            if last_style == style {
                last.push_str(text);
                return;
            }
        }
        self.segments.push(Segment::Text {
            text: text.to_string(),
            style: style.clone(),
        });
    }

    /// Lines as segment slices, produced lazily
    pub fn lines(&self) -> impl Iterator<Item = &[Segment]> + '_ {
        self.segments
            .split(|segment| matches!(segment, Segment::LineBreak))
    }

    /// Plain text of every line, produced lazily
    pub fn plain_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.lines().map(|line| {
            line.iter()
                .filter_map(|segment| match segment {
                    Segment::Text { text, .. } => Some(text.as_str()),
                    Segment::LineBreak => None,
                })
                .collect()
        })
    }

    /// Text without styling, lines joined by `\n`
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.plain_lines().collect::<Vec<_>>().join("\n")
    }

    /// The same text on one line; each break becomes a space in the style
    /// of the run before it
    #[must_use]
    pub fn single_line(&self) -> Self {
        let mut out = Self::new();
        let mut last_style = SpanStyle::plain();
        for segment in &self.segments {
            match segment {
                Segment::Text { text, style } => {
                    out.push_run(text, style);
                    last_style.clone_from(style);
                }
                Segment::LineBreak => out.push_run(" ", &last_style),
            }
        }
        out
    }

    /// Append `other` after `separator`, keeping existing content
    ///
    /// The separator is only inserted when both sides have content.
    pub fn append(&mut self, other: &Self, separator: &str) {
        if !self.is_empty() && !other.is_empty() {
            self.push_plain(separator);
        }
        for segment in &other.segments {
            match segment {
                Segment::Text { text, style } => self.push_run(text, style),
                Segment::LineBreak => self.push_line_break(),
            }
        }
    }

    /// Merge adjacent runs with identical styles and drop empty runs
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut out = Self::new();
        out.append(self, "");
        out
    }

    /// Apply `f` to the style of every run
    pub fn map_styles(&mut self, mut f: impl FnMut(&mut SpanStyle)) {
        for segment in &mut self.segments {
            if let Segment::Text { style, .. } = segment {
                f(style);
            }
        }
        *self = self.normalized();
    }

    /// Characters of the text paired with their style; breaks become `\n`
    fn styled_chars(&self) -> impl Iterator<Item = (char, Option<&SpanStyle>)> + '_ {
        self.segments.iter().flat_map(|segment| {
            let items: Vec<(char, Option<&SpanStyle>)> = match segment {
                Segment::Text { text, style } => text.chars().map(|c| (c, Some(style))).collect(),
                Segment::LineBreak => vec![('\n', None)],
            };
            items
        })
    }

    /// Re-wrap into lines computed by the reflow engine, keeping styles
    #[must_use]
    pub fn reflowed(&self, language: &str, options: &ReflowOptions) -> Self {
        self.reflowed_with(language, options, &DefaultSegmenter)
    }

    /// Re-wrap with a custom phrase segmenter
    ///
    /// Line breaks are placed where the reflowed plain text breaks. Visible
    /// characters keep the style they had; whitespace runs collapse to one
    /// space.
    #[must_use]
    pub fn reflowed_with(
        &self,
        language: &str,
        options: &ReflowOptions,
        segmenter: &dyn PhraseSegmenter,
    ) -> Self {
        let plain = self.plain_text().replace('\n', " ");
        let lines = reflow_with(&plain, language, options, segmenter);
        let targets: Vec<usize> = lines
            .iter()
            .map(|line| line.chars().filter(|c| !c.is_whitespace()).count())
            .collect();

        let mut out = Self::new();
        let mut line = 0;
        let mut used = 0;
        let mut pending_space: Option<SpanStyle> = None;
        let plain_style = SpanStyle::plain();
        for (ch, style) in self.styled_chars() {
            let style = style.unwrap_or(&plain_style);
            if ch.is_whitespace() {
                if used > 0 {
                    pending_space = Some(style.clone());
                }
                continue;
            }
            if line + 1 < targets.len() && used >= targets[line] {
                out.push_line_break();
                line += 1;
                used = 0;
                pending_space = None;
            }
            if let Some(space_style) = pending_space.take() {
                out.push_run(" ", &space_style);
            }
            let mut buf = [0u8; 4];
            out.push_run(ch.encode_utf8(&mut buf), style);
            used += 1;
        }
        out
    }

    /// Drop the overlap between the end of `self` and the start of `other`,
    /// then append the remainder of `other` after `separator`
    ///
    /// Used when consecutive cues repeat the tail of the previous one, as
    /// roll-up captions do.
    pub fn append_without_common_part(&mut self, other: &Self, separator: &str) {
        let existing = self.plain_text();
        let incoming = other.plain_text();
        let overlap = common_part_len(&existing, &incoming);
        if overlap == 0 {
            self.append(other, separator);
            return;
        }

        let remainder = other.skip_chars(overlap);
        let leading_ws = remainder
            .styled_chars()
            .take_while(|(ch, _)| ch.is_whitespace())
            .count();
        let cleaned = remainder.skip_chars(leading_ws);
        if cleaned.is_empty() {
            return;
        }
        self.append(&cleaned, separator);
    }

    /// Copy without the first `count` characters, breaks counting as one
    fn skip_chars(&self, count: usize) -> Self {
        let mut out = Self::new();
        for (ch, style) in self.styled_chars().skip(count) {
            match style {
                None => out.push_line_break(),
                Some(style) => {
                    let mut buf = [0u8; 4];
                    out.push_run(ch.encode_utf8(&mut buf), style);
                }
            }
        }
        out
    }
}

/// Length in chars of the longest suffix of `a` that is a prefix of `b`
fn common_part_len(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    (1..=a.len().min(b.len()))
        .rev()
        .find(|&len| a[a.len() - len..] == b[..len])
        .unwrap_or(0)
}

impl From<&str> for StyledText {
    fn from(text: &str) -> Self {
        Self::from_plain(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_merge_when_styles_match() {
        let mut text = StyledText::new();
        text.push_plain("a");
        text.push_plain("b");
        text.push_text("c", SpanStyle::plain().with_flags(TextFlags::BOLD));
        assert_eq!(text.segments().len(), 2);
        assert_eq!(text.plain_text(), "abc");
    }

    #[test]
    fn lines_split_on_breaks() {
        let text = StyledText::from_plain("one\ntwo\nthree");
        let lines: Vec<String> = text.plain_lines().collect();
        assert_eq!(lines, ["one", "two", "three"]);
    }

    #[test]
    fn append_inserts_separator_only_between_content() {
        let mut text = StyledText::new();
        text.append(&StyledText::from_plain("first"), "\n");
        text.append(&StyledText::from_plain("second"), "\n");
        assert_eq!(text.plain_text(), "first\nsecond");
    }

    #[test]
    fn common_part_is_dropped() {
        let mut text = StyledText::from_plain("we are going");
        text.append_without_common_part(&StyledText::from_plain("going home"), " ");
        assert_eq!(text.plain_text(), "we are going home");

        let mut text = StyledText::from_plain("abc");
        text.append_without_common_part(&StyledText::from_plain("xyz"), " ");
        assert_eq!(text.plain_text(), "abc xyz");
    }

    #[test]
    fn reflow_keeps_styles() {
        let bold = SpanStyle::plain().with_flags(TextFlags::BOLD);
        let mut text = StyledText::new();
        text.push_plain("one two ");
        text.push_text("three", bold.clone());
        text.push_plain(" four");

        let options = ReflowOptions::new(2).with_character_limit(10).with_split_ratios(vec![1.0]);
        let wrapped = text.reflowed("en", &options);
        let lines: Vec<String> = wrapped.plain_lines().collect();
        assert_eq!(lines, ["one two", "three four"]);
        assert!(wrapped.segments().iter().any(|segment| matches!(
            segment,
            Segment::Text { text, style } if text == "three" && *style == bold
        )));
    }
}
