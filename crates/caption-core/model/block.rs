//! Timed blocks
//!
//! A [`Block`] is a shared header (times and format specific options) plus a
//! [`BlockBody`] holding the variant payload.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::text::StyledText;
use crate::formats::LineMode;
use crate::reflow::ReflowOptions;
use crate::time::MicroTime;
use crate::utils::normalize_language;

/// Variant of a block without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum BlockKind {
    Caption,
    Comment,
    Style,
    Layout,
    Metadata,
}

/// Caption text keyed by language tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Caption {
    pub text_by_language: BTreeMap<String, StyledText>,
}

impl Caption {
    /// Caption with one language
    #[must_use]
    pub fn with_text(language: &str, text: StyledText) -> Self {
        let mut caption = Self::default();
        caption.text_by_language.insert(language.to_string(), text);
        caption
    }

    /// Text in `language`
    #[must_use]
    pub fn text(&self, language: &str) -> Option<&StyledText> {
        self.text_by_language.get(language)
    }

    /// Replace the text of `language`
    pub fn set_text(&mut self, language: &str, text: StyledText) {
        self.text_by_language.insert(language.to_string(), text);
    }

    /// Append to the text of `language`, separated by a line break
    pub fn append(&mut self, language: &str, text: &StyledText) {
        self.text_by_language
            .entry(language.to_string())
            .or_default()
            .append(text, "\n");
    }

    /// Append to `language` dropping text repeated from the current tail
    pub fn append_without_common_part(&mut self, language: &str, text: &StyledText) {
        self.text_by_language
            .entry(language.to_string())
            .or_default()
            .append_without_common_part(text, " ");
    }

    /// Languages present, in tag order
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.text_by_language.keys().map(String::as_str)
    }

    /// Remove one language, returning its text
    pub fn remove_language(&mut self, language: &str) -> Option<StyledText> {
        self.text_by_language.remove(language)
    }

    /// Text of `language` laid out for display
    ///
    /// [`LineMode::Preserve`] keeps the existing line breaks;
    /// [`LineMode::Reflow`] re-wraps with the reflow engine.
    #[must_use]
    pub fn formatted_text(&self, language: &str, mode: &LineMode) -> Option<StyledText> {
        let text = self.text(language)?;
        Some(match mode {
            LineMode::Preserve => text.clone(),
            LineMode::Reflow(options) => text.reflowed(language, options),
        })
    }

    /// Plain display lines of `language`
    #[must_use]
    pub fn get_lines(&self, language: &str, mode: &LineMode) -> Vec<String> {
        self.formatted_text(language, mode)
            .map(|text| text.plain_lines().filter(|line| !line.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// Stylesheet content of a style block
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum StyleContent {
    /// CSS text, as in a VTT `STYLE` block
    Css(String),
    /// Property map keyed by CSS name, or `tts:` name when none exists
    Properties(BTreeMap<String, String>),
    /// Format native line kept verbatim, such as a MicroDVD `{DEFAULT}`
    Raw(String),
}

/// Style definition
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleSheet {
    pub id: Option<String>,
    pub content: StyleContent,
}

/// Region or other layout definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layout {
    pub id: Option<String>,
    pub properties: BTreeMap<String, String>,
}

/// Free form key/value metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Metadata {
    pub id: Option<String>,
    pub entries: BTreeMap<String, String>,
}

/// Payload of a block
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "block_type", rename_all = "snake_case")
)]
pub enum BlockBody {
    Caption(Caption),
    Comment(Comment),
    Style(StyleSheet),
    Layout(Layout),
    Metadata(Metadata),
}

/// Comment text, as in a VTT `NOTE`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Comment {
    pub text: String,
}

/// One timed unit of a document
///
/// `end_time >= start_time` always holds: constructors and shifts raise the
/// end time when needed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Block {
    start_time: MicroTime,
    end_time: MicroTime,
    /// Format specific extras such as VTT cue settings
    #[cfg_attr(feature = "serde", serde(default))]
    pub options: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub body: BlockBody,
}

impl Block {
    /// Block with `body` spanning `start..end`
    #[must_use]
    pub fn new(start_time: MicroTime, end_time: MicroTime, body: BlockBody) -> Self {
        let mut block = Self {
            start_time,
            end_time,
            options: BTreeMap::new(),
            body,
        };
        block.fix_order();
        block
    }

    /// Empty caption spanning `start..end`
    #[must_use]
    pub fn caption(start_time: MicroTime, end_time: MicroTime) -> Self {
        Self::new(start_time, end_time, BlockBody::Caption(Caption::default()))
    }

    /// Untimed comment
    #[must_use]
    pub fn comment(text: &str) -> Self {
        Self::new(
            MicroTime::ZERO,
            MicroTime::ZERO,
            BlockBody::Comment(Comment {
                text: text.to_string(),
            }),
        )
    }

    /// Untimed style block
    #[must_use]
    pub fn style(id: Option<String>, content: StyleContent) -> Self {
        Self::new(
            MicroTime::ZERO,
            MicroTime::ZERO,
            BlockBody::Style(StyleSheet { id, content }),
        )
    }

    /// Untimed layout block
    #[must_use]
    pub fn layout(id: Option<String>, properties: BTreeMap<String, String>) -> Self {
        Self::new(
            MicroTime::ZERO,
            MicroTime::ZERO,
            BlockBody::Layout(Layout { id, properties }),
        )
    }

    /// Untimed metadata block
    #[must_use]
    pub fn metadata(id: Option<String>, entries: BTreeMap<String, String>) -> Self {
        Self::new(
            MicroTime::ZERO,
            MicroTime::ZERO,
            BlockBody::Metadata(Metadata { id, entries }),
        )
    }

    /// Builder style option setter
    #[must_use]
    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.insert(key.to_string(), value.to_string());
        self
    }

    /// Builder style text setter for caption blocks
    #[must_use]
    pub fn with_text(mut self, language: &str, text: StyledText) -> Self {
        if let BlockBody::Caption(caption) = &mut self.body {
            caption.set_text(language, text);
        }
        self
    }

    #[must_use]
    pub const fn start_time(&self) -> MicroTime {
        self.start_time
    }

    #[must_use]
    pub const fn end_time(&self) -> MicroTime {
        self.end_time
    }

    /// Length of the block
    #[must_use]
    pub fn duration(&self) -> MicroTime {
        self.end_time - self.start_time
    }

    /// Set both times; the end is raised to the start if needed
    pub fn set_times(&mut self, start_time: MicroTime, end_time: MicroTime) {
        self.start_time = start_time;
        self.end_time = end_time;
        self.fix_order();
    }

    /// Move the start by a signed microsecond delta
    pub fn shift_start(&mut self, delta_micros: i64) {
        self.start_time = self.start_time.shifted(delta_micros);
        self.fix_order();
    }

    /// Move the end by a signed microsecond delta
    pub fn shift_end(&mut self, delta_micros: i64) {
        self.end_time = self.end_time.shifted(delta_micros);
        if self.end_time < self.start_time {
            log::warn!("Block end moved before its start, clamping start");
            self.start_time = self.end_time;
        }
    }

    /// Move both times by a signed microsecond delta
    pub fn shift_time(&mut self, delta_micros: i64) {
        self.start_time = self.start_time.shifted(delta_micros);
        self.end_time = self.end_time.shifted(delta_micros);
    }

    fn fix_order(&mut self) {
        if self.end_time < self.start_time {
            log::warn!(
                "Block end {} before start {}, raising end",
                self.end_time,
                self.start_time
            );
            self.end_time = self.start_time;
        }
    }

    #[must_use]
    pub const fn kind(&self) -> BlockKind {
        match self.body {
            BlockBody::Caption(_) => BlockKind::Caption,
            BlockBody::Comment(_) => BlockKind::Comment,
            BlockBody::Style(_) => BlockKind::Style,
            BlockBody::Layout(_) => BlockKind::Layout,
            BlockBody::Metadata(_) => BlockKind::Metadata,
        }
    }

    /// Identifier of a style, layout or metadata block
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match &self.body {
            BlockBody::Style(style) => style.id.as_deref(),
            BlockBody::Layout(layout) => layout.id.as_deref(),
            BlockBody::Metadata(metadata) => metadata.id.as_deref(),
            BlockBody::Caption(_) | BlockBody::Comment(_) => None,
        }
    }

    #[must_use]
    pub const fn as_caption(&self) -> Option<&Caption> {
        match &self.body {
            BlockBody::Caption(caption) => Some(caption),
            _ => None,
        }
    }

    pub fn as_caption_mut(&mut self) -> Option<&mut Caption> {
        match &mut self.body {
            BlockBody::Caption(caption) => Some(caption),
            _ => None,
        }
    }

    /// Text of `language` when this is a caption
    #[must_use]
    pub fn text(&self, language: &str) -> Option<&StyledText> {
        self.as_caption().and_then(|caption| caption.text(language))
    }

    /// Display lines of `language` re-wrapped with `options`
    #[must_use]
    pub fn get_lines(&self, language: &str, mode: &LineMode) -> Vec<String> {
        self.as_caption()
            .map(|caption| caption.get_lines(language, mode))
            .unwrap_or_default()
    }

    /// Display lines using default reflow settings for `lines` lines
    #[must_use]
    pub fn reflowed_lines(&self, language: &str, lines: usize) -> Vec<String> {
        self.get_lines(language, &LineMode::Reflow(ReflowOptions::new(lines)))
    }

    /// Remove a language from a caption block
    pub fn remove_language(&mut self, language: &str) -> Option<StyledText> {
        self.as_caption_mut()
            .and_then(|caption| caption.remove_language(&normalize_language(language)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> MicroTime {
        MicroTime::from_millis(millis)
    }

    #[test]
    fn end_never_before_start() {
        let block = Block::caption(ms(500), ms(100));
        assert_eq!(block.end_time(), ms(500));

        let mut block = Block::caption(ms(100), ms(200));
        block.shift_start(300_000);
        assert_eq!(block.start_time(), ms(400));
        assert_eq!(block.end_time(), ms(400));

        let mut block = Block::caption(ms(100), ms(200));
        block.shift_end(-500_000);
        assert_eq!(block.end_time(), MicroTime::ZERO);
        assert_eq!(block.start_time(), MicroTime::ZERO);
    }

    #[test]
    fn shift_time_moves_both() {
        let mut block = Block::caption(ms(1_000), ms(2_000));
        block.shift_time(-1_500_000);
        assert_eq!(block.start_time(), MicroTime::ZERO);
        assert_eq!(block.end_time(), ms(500));
    }

    #[test]
    fn caption_languages() {
        let mut block = Block::caption(ms(0), ms(1))
            .with_text("en", StyledText::from_plain("Hi"))
            .with_text("fr", StyledText::from_plain("Salut"));
        assert_eq!(block.as_caption().unwrap().languages().collect::<Vec<_>>(), ["en", "fr"]);
        assert!(block.remove_language("FR").is_some());
        assert!(block.text("fr").is_none());
        assert_eq!(block.kind(), BlockKind::Caption);
    }

    #[test]
    fn get_lines_reflows() {
        let block = Block::caption(ms(0), ms(1)).with_text(
            "en",
            StyledText::from_plain("a fairly long caption that should wrap onto two lines"),
        );
        let lines = block.reflowed_lines("en", 2);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines.join(" "),
            "a fairly long caption that should wrap onto two lines"
        );

        let preserved = block.get_lines("en", &LineMode::Preserve);
        assert_eq!(preserved.len(), 1);
    }
}
