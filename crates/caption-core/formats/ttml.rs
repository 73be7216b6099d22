//! TTML codec
//!
//! The whole document is parsed with a streaming XML reader. `ttp:*`
//! parameters on `<tt>` set the time base, `head/styling/style` elements
//! become style blocks and `head/layout/region` elements layout blocks.
//! Each `body/div/p` becomes a caption; paragraph times are relative to the
//! enclosing div and clamped to its end.
//!
//! With several languages requested, divs are per-language variants of the
//! same paragraphs and are merged by paragraph position.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{
    peek_lines, CaptionFormat, CaptionSource, FormatInfo, FormatKind, ReadOptions, SaveOptions,
};
use crate::model::{
    Block, BlockBody, BlockKind, Caption, Document, Segment, SpanStyle, StyleContent, StyledText,
};
use crate::style::ttml::TTS_PREFIX;
use crate::style::{
    style_from_attributes, style_from_properties, style_properties, ttml_attributes,
    ttml_attributes_beyond,
};
use crate::time::ttml::from_ttml_times;
use crate::time::{MicroTime, TtmlTimeBase};
use crate::utils::{normalize_language, CoreError, ParseError, Result};

/// Block option holding the region a paragraph is placed in
pub const REGION_OPTION: &str = "region";

/// Prefix of parameter attributes kept in the document options
pub const TTP_PREFIX: &str = "ttp:";

/// TTML format handler
#[derive(Debug)]
pub struct TtmlFormat {
    info: FormatInfo,
}

impl Default for TtmlFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl TtmlFormat {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            info: FormatInfo {
                kind: FormatKind::Ttml,
                description: "Timed Text Markup Language",
                mime_type: "application/ttml+xml",
                supports_styling: true,
                frame_based: false,
            },
        }
    }
}

/// Element attributes with names as written, values unescaped
type Attributes = Vec<(String, String)>;

fn attributes_of(element: &BytesStart<'_>, position: u64) -> Result<Attributes> {
    element
        .attributes()
        .map(|attribute| {
            let attribute = attribute.map_err(|err| malformed(position, &err))?;
            let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|err| malformed(position, &err))?
                .into_owned();
            Ok((name, value))
        })
        .collect()
}

fn attribute<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn malformed(position: u64, err: &dyn std::fmt::Display) -> CoreError {
    CoreError::parse(
        FormatKind::Ttml,
        ParseError::MalformedXml {
            position,
            reason: err.to_string(),
        },
    )
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Paragraph being collected
struct Paragraph {
    start: MicroTime,
    end: MicroTime,
    region: Option<String>,
    text: StyledText,
}

/// Paragraphs of one div
#[derive(Default)]
struct Division {
    language: Option<String>,
    begin: MicroTime,
    end: Option<MicroTime>,
    paragraphs: Vec<Paragraph>,
}

/// Where the walk currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Document,
    Styling,
    Layout,
    Body,
}

struct TtmlReader {
    base: TtmlTimeBase,
    parameters: BTreeMap<String, String>,
    document_language: Option<String>,
    scope: Scope,
    saw_root: bool,
    styles: BTreeMap<String, SpanStyle>,
    head_blocks: Vec<Block>,
    divisions: Vec<Division>,
    /// Inherited style of every open element inside `body`
    style_stack: Vec<SpanStyle>,
    paragraph: Option<Paragraph>,
}

impl TtmlReader {
    fn new(known_styles: BTreeMap<String, SpanStyle>) -> Self {
        Self {
            base: TtmlTimeBase::default(),
            parameters: BTreeMap::new(),
            document_language: None,
            scope: Scope::Document,
            saw_root: false,
            styles: known_styles,
            head_blocks: Vec::new(),
            divisions: Vec::new(),
            style_stack: Vec::new(),
            paragraph: None,
        }
    }

    /// `parent` with the referenced styles and the element's own `tts:*`
    /// attributes applied; referenced ids become classes
    fn element_style(&self, parent: &SpanStyle, attributes: &Attributes) -> SpanStyle {
        let mut style = parent.clone();
        if let Some(references) = attribute(attributes, "style") {
            for id in references.split_whitespace() {
                match self.styles.get(id) {
                    Some(referenced) => {
                        style.merge_from(referenced);
                        style = style.with_class(id);
                    }
                    None => log::warn!("TTML style {id} is not defined"),
                }
            }
        }
        style_from_attributes(
            &style,
            attributes
                .iter()
                .filter(|(name, _)| name.starts_with(TTS_PREFIX))
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }

    fn times(
        &self,
        attributes: &Attributes,
    ) -> Result<(MicroTime, Option<MicroTime>)> {
        from_ttml_times(
            attribute(attributes, "begin"),
            attribute(attributes, "dur"),
            attribute(attributes, "end"),
            &self.base,
        )
    }

    fn open_root(&mut self, attributes: &Attributes) {
        self.saw_root = true;
        for (name, value) in attributes {
            if name.starts_with(TTP_PREFIX) {
                self.parameters.insert(name.clone(), value.clone());
            }
        }
        let parameter = |name: &str| attribute(attributes, &format!("{TTP_PREFIX}{name}"));
        self.base = TtmlTimeBase::from_attributes(
            parameter("frameRate"),
            parameter("subFrameRate"),
            parameter("tickRate"),
            parameter("frameRateMultiplier"),
        );
        self.document_language = attribute(attributes, "xml:lang")
            .filter(|lang| !lang.is_empty())
            .map(normalize_language);
    }

    fn define_style(&mut self, attributes: &Attributes) {
        let mut style = self.element_style(&SpanStyle::plain(), attributes);
        style.classes.clear();
        let id = attribute(attributes, "xml:id").map(str::to_string);
        if let Some(id) = &id {
            self.styles.insert(id.clone(), style.clone());
        }
        self.head_blocks.push(Block::style(
            id,
            StyleContent::Properties(style_properties(&style)),
        ));
    }

    fn define_region(&mut self, attributes: &Attributes) {
        let id = attribute(attributes, "xml:id").map(str::to_string);
        let properties = attributes
            .iter()
            .filter(|(name, _)| name != "xml:id")
            .cloned()
            .collect();
        self.head_blocks.push(Block::layout(id, properties));
    }

    fn open_body_element(&mut self, name: &str, attributes: &Attributes) -> Result<()> {
        let parent = self.style_stack.last().cloned().unwrap_or_else(SpanStyle::plain);
        let style = self.element_style(&parent, attributes);
        match name {
            "div" => {
                let (begin, end) = self.times(attributes)?;
                self.divisions.push(Division {
                    language: attribute(attributes, "xml:lang")
                        .filter(|lang| !lang.is_empty())
                        .map(normalize_language)
                        .or_else(|| self.document_language.clone()),
                    begin,
                    end,
                    paragraphs: Vec::new(),
                });
            }
            "p" => {
                let (start, end) = self.times(attributes)?;
                if self.divisions.is_empty() {
                    self.divisions.push(Division {
                        language: self.document_language.clone(),
                        ..Division::default()
                    });
                }
                let (offset, limit) = self
                    .divisions
                    .last()
                    .map_or((MicroTime::ZERO, None), |division| (division.begin, division.end));
                let mut start = start + offset;
                let mut end = end.map_or_else(|| limit.unwrap_or(start), |end| end + offset);
                if let Some(limit) = limit {
                    if start > limit {
                        start = limit;
                        end = limit;
                    } else if end > limit {
                        end = limit;
                    }
                }
                self.paragraph = Some(Paragraph {
                    start,
                    end,
                    region: attribute(attributes, "region").map(str::to_string),
                    text: StyledText::new(),
                });
            }
            _ => {}
        }
        self.style_stack.push(style);
        Ok(())
    }

    fn close_body_element(&mut self, name: &str) {
        self.style_stack.pop();
        if name == "p" {
            if let (Some(paragraph), Some(division)) =
                (self.paragraph.take(), self.divisions.last_mut())
            {
                division.paragraphs.push(Paragraph {
                    text: trim_lines(&paragraph.text),
                    ..paragraph
                });
            }
        }
    }

    fn text(&mut self, text: &str) {
        let style = self.style_stack.last().cloned().unwrap_or_else(SpanStyle::plain);
        if let Some(paragraph) = &mut self.paragraph {
            paragraph.text.push_text(&collapse_whitespace(text), style);
        }
    }

    fn start(&mut self, element: &BytesStart<'_>, position: u64) -> Result<()> {
        let name = local_name(element);
        let attributes = attributes_of(element, position)?;
        match (self.scope, name.as_str()) {
            (_, "tt") => self.open_root(&attributes),
            (Scope::Document, "styling") => self.scope = Scope::Styling,
            (Scope::Document, "layout") => self.scope = Scope::Layout,
            (Scope::Document, "body") => {
                self.scope = Scope::Body;
                let style = self.element_style(&SpanStyle::plain(), &attributes);
                self.style_stack.push(style);
            }
            (Scope::Styling, "style") => self.define_style(&attributes),
            (Scope::Layout, "region") => self.define_region(&attributes),
            (Scope::Body, _) => self.open_body_element(&name, &attributes)?,
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &str) {
        match (self.scope, name) {
            (Scope::Styling, "styling") | (Scope::Layout, "layout") => self.scope = Scope::Document,
            (Scope::Body, "body") => {
                self.scope = Scope::Document;
                self.style_stack.clear();
            }
            (Scope::Body, _) => self.close_body_element(name),
            _ => {}
        }
    }

    fn empty(&mut self, element: &BytesStart<'_>, position: u64) -> Result<()> {
        let name = local_name(element);
        if self.scope == Scope::Body && name == "br" {
            if let Some(paragraph) = &mut self.paragraph {
                paragraph.text.push_line_break();
            }
            return Ok(());
        }
        self.start(element, position)?;
        if self.scope == Scope::Body || name == "styling" || name == "layout" {
            self.end(&name);
        }
        Ok(())
    }

    fn parse(&mut self, text: &str) -> Result<()> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);
        loop {
            let position = reader.buffer_position() as u64;
            let event = reader.read_event().map_err(|err| malformed(position, &err))?;
            match event {
                Event::Start(element) => self.start(&element, position)?,
                Event::Empty(element) => self.empty(&element, position)?,
                Event::End(element) => {
                    let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                    self.end(&name);
                }
                Event::Text(content) => {
                    let content = content.unescape().map_err(|err| malformed(position, &err))?;
                    self.text(&content);
                }
                Event::CData(content) => {
                    let content = String::from_utf8_lossy(&content).into_owned();
                    self.text(&content);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if self.saw_root {
            Ok(())
        } else {
            Err(CoreError::parse(
                FormatKind::Ttml,
                ParseError::MissingElement {
                    element: "tt".to_string(),
                },
            ))
        }
    }
}

fn collapse_whitespace(text: &str) -> Cow<'_, str> {
    if !text.contains(|c: char| c.is_whitespace() && c != ' ') && !text.contains("  ") {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    Cow::Owned(out)
}

/// Drop the whitespace XML indentation leaves at the ends of each line
fn trim_lines(text: &StyledText) -> StyledText {
    let mut out = StyledText::new();
    for (index, line) in text.lines().enumerate() {
        if index > 0 {
            out.push_line_break();
        }
        let runs: Vec<(&str, &SpanStyle)> = line
            .iter()
            .filter_map(|segment| match segment {
                Segment::Text { text, style } => Some((text.as_str(), style)),
                Segment::LineBreak => None,
            })
            .collect();
        let last = runs.len().saturating_sub(1);
        for (position, (run, style)) in runs.iter().enumerate() {
            let mut run: &str = run;
            if position == 0 {
                run = run.trim_start();
            }
            if position == last {
                run = run.trim_end();
            }
            out.push_text(run, (*style).clone());
        }
    }
    out
}

/// Referential styles already stored in a document, by id
fn document_styles(document: &Document) -> BTreeMap<String, SpanStyle> {
    document
        .blocks_of(BlockKind::Style)
        .filter_map(|block| match &block.body {
            BlockBody::Style(style) => match (&style.id, &style.content) {
                (Some(id), StyleContent::Properties(properties)) => {
                    Some((id.clone(), style_from_properties(properties)))
                }
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn merge_divisions(
    divisions: Vec<Division>,
    languages: &[String],
    time_offset: i64,
) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    if languages.len() <= 1 {
        for paragraph in divisions.into_iter().flat_map(|division| division.paragraphs) {
            blocks.push(paragraph_block(paragraph, &languages[0], time_offset));
        }
        return Ok(blocks);
    }

    // Match divs to languages by xml:lang, the rest by position
    let mut assigned: Vec<(String, Division)> = Vec::new();
    let mut unmatched = Vec::new();
    for division in divisions {
        match division
            .language
            .clone()
            .filter(|lang| languages.contains(lang) && !assigned.iter().any(|(l, _)| l == lang))
        {
            Some(language) => assigned.push((language, division)),
            None => unmatched.push(division),
        }
    }
    for division in unmatched {
        let free = languages
            .iter()
            .find(|lang| !assigned.iter().any(|(l, _)| l == *lang));
        match free {
            Some(language) => assigned.push((language.clone(), division)),
            None => log::warn!("Ignoring TTML div beyond the requested languages"),
        }
    }
    assigned.sort_by_key(|(language, _)| languages.iter().position(|l| l == language));

    let Some(expected) = assigned.first().map(|(_, division)| division.paragraphs.len()) else {
        return Ok(blocks);
    };
    if let Some((language, division)) = assigned
        .iter()
        .find(|(_, division)| division.paragraphs.len() != expected)
    {
        return Err(CoreError::parse(
            FormatKind::Ttml,
            ParseError::MisalignedLanguages {
                language: language.clone(),
                expected,
                found: division.paragraphs.len(),
            },
        ));
    }

    let mut columns: Vec<(String, std::vec::IntoIter<Paragraph>)> = assigned
        .into_iter()
        .map(|(language, division)| (language, division.paragraphs.into_iter()))
        .collect();
    for _ in 0..expected {
        let mut block: Option<Block> = None;
        for (language, paragraphs) in &mut columns {
            let Some(paragraph) = paragraphs.next() else {
                continue;
            };
            let missing = paragraph.text.is_empty();
            match &mut block {
                Some(block) => {
                    if let (false, Some(caption)) = (missing, block.as_caption_mut()) {
                        caption.set_text(language, paragraph.text);
                    }
                }
                None => {
                    let mut first = paragraph_block(paragraph, language, time_offset);
                    if missing {
                        first.remove_language(language);
                    }
                    block = Some(first);
                }
            }
        }
        blocks.extend(block);
    }
    Ok(blocks)
}

fn paragraph_block(paragraph: Paragraph, language: &str, time_offset: i64) -> Block {
    let mut caption = Caption::default();
    caption.set_text(language, paragraph.text);
    let mut block = Block::new(paragraph.start, paragraph.end, BlockBody::Caption(caption));
    if let Some(region) = &paragraph.region {
        block = block.with_option(REGION_OPTION, region);
    }
    block.shift_time(time_offset);
    block
}

fn push_attributes(out: &mut String, attributes: &[(String, String)]) {
    for (name, value) in attributes {
        out.push_str(&format!(" {name}=\"{}\"", escape(value.as_str())));
    }
}

/// Paragraph content: spans for runs whose style differs from plain
fn paragraph_content(text: &StyledText, styles: &BTreeMap<String, SpanStyle>) -> String {
    let mut out = String::new();
    for segment in text.segments() {
        match segment {
            Segment::LineBreak => out.push_str("<br/>"),
            Segment::Text { text, style } => {
                let references: Vec<&str> = style
                    .classes
                    .iter()
                    .map(String::as_str)
                    .filter(|class| styles.contains_key(*class))
                    .collect();
                let mut implied = SpanStyle::plain();
                for id in &references {
                    if let Some(referenced) = styles.get(*id) {
                        implied.merge_from(referenced);
                    }
                }
                let attributes = ttml_attributes_beyond(style, &implied);
                if references.is_empty() && attributes.is_empty() {
                    out.push_str(&escape(text.as_str()));
                    continue;
                }
                out.push_str("<span");
                if !references.is_empty() {
                    out.push_str(&format!(" style=\"{}\"", references.join(" ")));
                }
                push_attributes(&mut out, &attributes);
                out.push('>');
                out.push_str(&escape(text.as_str()));
                out.push_str("</span>");
            }
        }
    }
    out
}

impl CaptionFormat for TtmlFormat {
    fn info(&self) -> &FormatInfo {
        &self.info
    }

    fn detect(&self, source: &mut dyn CaptionSource) -> bool {
        peek_lines(source, 2).is_some_and(|lines| {
            let mut lines = lines.iter().map(|line| line.trim_start());
            let first = lines.next().unwrap_or_default();
            first.starts_with("<tt xml")
                || (first.starts_with("<?xml") && first.contains("<tt xml"))
                || lines.next().is_some_and(|second| second.starts_with("<tt xml"))
        })
    }

    fn read(
        &self,
        document: &mut Document,
        source: &mut dyn BufRead,
        options: &ReadOptions,
    ) -> Result<()> {
        let languages = options.languages_for(document);
        let mut text = String::new();
        source.read_to_string(&mut text)?;

        let mut reader = TtmlReader::new(document_styles(document));
        reader.parse(&text)?;
        let TtmlReader {
            parameters,
            head_blocks,
            divisions,
            ..
        } = reader;
        let captions = merge_divisions(divisions, &languages, options.time_offset)?;

        log::debug!(
            "Read {} TTML captions and {} head blocks",
            captions.len(),
            head_blocks.len()
        );
        for (name, value) in parameters {
            document.options.extra.entry(name).or_insert(value);
        }
        document.extend(head_blocks);
        document.extend(captions);
        Ok(())
    }

    fn save(&self, document: &Document, sink: &mut dyn Write, options: &SaveOptions) -> Result<()> {
        let languages = options.languages_for(document);
        let styles = document_styles(document);

        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!(
            "<tt xmlns=\"http://www.w3.org/ns/ttml\" xmlns:tts=\"http://www.w3.org/ns/ttml#styling\" xmlns:ttp=\"http://www.w3.org/ns/ttml#parameter\" xml:lang=\"{}\"",
            escape(languages[0].as_str())
        ));
        let parameters: Vec<(String, String)> = document
            .options
            .extra
            .iter()
            .filter(|(name, _)| name.starts_with(TTP_PREFIX))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        push_attributes(&mut out, &parameters);
        out.push_str(">\n");

        let mut styling = String::new();
        for (id, style) in &styles {
            styling.push_str(&format!("      <style xml:id=\"{}\"", escape(id.as_str())));
            push_attributes(&mut styling, &ttml_attributes(style));
            styling.push_str("/>\n");
        }
        let mut layout = String::new();
        for block in document.blocks_of(BlockKind::Layout) {
            let BlockBody::Layout(region) = &block.body else {
                continue;
            };
            let (Some(id), false) = (&region.id, region.properties.is_empty()) else {
                continue;
            };
            let attributes: Vec<(String, String)> = region
                .properties
                .iter()
                .filter(|(name, _)| name.contains(':'))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            if attributes.is_empty() {
                log::debug!("Region {id} has no TTML attributes, skipping it");
                continue;
            }
            layout.push_str(&format!("      <region xml:id=\"{}\"", escape(id.as_str())));
            push_attributes(&mut layout, &attributes);
            layout.push_str("/>\n");
        }
        if !styling.is_empty() || !layout.is_empty() {
            out.push_str("  <head>\n");
            if !styling.is_empty() {
                out.push_str(&format!("    <styling>\n{styling}    </styling>\n"));
            }
            if !layout.is_empty() {
                out.push_str(&format!("    <layout>\n{layout}    </layout>\n"));
            }
            out.push_str("  </head>\n");
        }

        out.push_str("  <body>\n");
        for language in &languages {
            out.push_str(&format!("    <div xml:lang=\"{}\">\n", escape(language.as_str())));
            for block in document.captions() {
                let text = block
                    .as_caption()
                    .and_then(|caption| caption.formatted_text(language, &options.lines));
                // Divs pair up by position, so a missing language keeps its slot
                if text.is_none() && languages.len() == 1 {
                    continue;
                }
                out.push_str(&format!(
                    "      <p begin=\"{}\" end=\"{}\"",
                    block.start_time().to_ttml_time(),
                    block.end_time().to_ttml_time()
                ));
                if let Some(region) = block.options.get(REGION_OPTION) {
                    out.push_str(&format!(" region=\"{}\"", escape(region.as_str())));
                }
                match text {
                    Some(text) => {
                        out.push('>');
                        out.push_str(&paragraph_content(&text, &styles));
                        out.push_str("</p>\n");
                    }
                    None => out.push_str("/>\n"),
                }
            }
            out.push_str("    </div>\n");
        }
        out.push_str("  </body>\n</tt>\n");

        sink.write_all(out.as_bytes())?;
        sink.flush()?;
        Ok(())
    }
}
