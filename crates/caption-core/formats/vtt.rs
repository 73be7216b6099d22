//! WebVTT codec
//!
//! A file is a `WEBVTT` header line, optional `key: value` header lines,
//! then blank-line separated blocks: `NOTE` comments, `STYLE` stylesheets,
//! `REGION` definitions and cues. A cue is an optional identifier line, a
//! `start --> end [settings]` line and its payload. A payload starting
//! with `{` is a metadata cue and is kept as a timed metadata block.
//!
//! `#id` selectors are rewritten through the document's
//! [`VttIdentifiers`]; cues keep their source identifier in the
//! `identifier` block option.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use super::srt::split_timing;
use super::{
    peek_lines, CaptionFormat, CaptionSource, FormatInfo, FormatKind, LineCursor, ReadOptions,
    SaveOptions,
};
use crate::model::{
    Block, BlockBody, BlockKind, Caption, Document, Metadata, StyleContent, VttIdentifiers,
};
use crate::style::css::{format_stylesheet, CssRule};
use crate::style::vtt::{read_stylesheet, write_stylesheet};
use crate::style::{from_vtt, to_vtt, SynthesizedClasses, VttStyleRules};
use crate::time::MicroTime;
use crate::utils::{ParseError, Result};

/// Block option holding a cue's source identifier
pub const IDENTIFIER_OPTION: &str = "identifier";

/// Block option holding raw cue settings
pub const SETTINGS_OPTION: &str = "settings";

/// Id of the metadata block holding the file header
pub const HEADER_ID: &str = "header";

/// Header entry holding the text after `WEBVTT` on the first line
pub const HEADER_TEXT_KEY: &str = "vtt:header";

/// Metadata entry holding the payload of a metadata cue
pub const CUE_DATA_KEY: &str = "data";

const REGION_SETTINGS: [&str; 6] = [
    "id",
    "width",
    "lines",
    "regionanchor",
    "viewportanchor",
    "scroll",
];

/// WebVTT format handler
#[derive(Debug)]
pub struct VttFormat {
    info: FormatInfo,
}

impl Default for VttFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl VttFormat {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            info: FormatInfo {
                kind: FormatKind::Vtt,
                description: "Web Video Text Tracks",
                mime_type: "text/vtt",
                supports_styling: true,
                frame_based: false,
            },
        }
    }
}

fn is_header(line: &str) -> bool {
    line.strip_prefix("WEBVTT")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
}

/// Kind of block a paragraph's first line opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Note,
    Style,
    Region,
    Cue,
}

impl Section {
    fn of(line: &str) -> Self {
        let keyword_with_text = |keyword: &str| {
            line.strip_prefix(keyword)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
        };
        if keyword_with_text("NOTE") {
            Self::Note
        } else if line.trim_end() == "STYLE" {
            Self::Style
        } else if line.trim_end() == "REGION" {
            Self::Region
        } else {
            Self::Cue
        }
    }
}

/// State of one `read` call, committed to the document on success
struct VttReader<'a, 'b> {
    cursor: LineCursor<'a>,
    languages: &'b [String],
    time_offset: i64,
    identifiers: VttIdentifiers,
    rules: VttStyleRules,
    blocks: Vec<Block>,
}

impl VttReader<'_, '_> {
    /// Lines up to the next blank line
    fn payload(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.cursor.peek()? {
            if line.trim().is_empty() {
                break;
            }
            lines.push(line.to_string());
            self.cursor.next_line()?;
        }
        Ok(lines)
    }

    fn read_header(&mut self) -> Result<()> {
        self.cursor.skip_blank()?;
        let first = self.cursor.next_line()?.unwrap_or_default();
        if !is_header(&first) {
            return Err(self.cursor.error(ParseError::MissingHeader {
                line: self.cursor.line().max(1),
                expected: "WEBVTT".to_string(),
            }));
        }

        let mut entries = BTreeMap::new();
        let text = first["WEBVTT".len()..].trim();
        if !text.is_empty() {
            entries.insert(HEADER_TEXT_KEY.to_string(), text.to_string());
        }
        for line in self.payload()? {
            match line.split_once(':') {
                Some((key, value)) if !line.contains("-->") => {
                    entries.insert(key.trim().to_string(), value.trim().to_string());
                }
                _ => log::debug!("Ignoring VTT header line {line}"),
            }
        }
        if !entries.is_empty() {
            self.blocks
                .push(Block::metadata(Some(HEADER_ID.to_string()), entries));
        }
        Ok(())
    }

    fn read_note(&mut self, first: &str) -> Result<()> {
        let mut lines = Vec::new();
        let inline = first["NOTE".len()..].trim();
        if !inline.is_empty() {
            lines.push(inline.to_string());
        }
        lines.extend(self.payload()?);
        self.blocks.push(Block::comment(&lines.join("\n")));
        Ok(())
    }

    fn read_style(&mut self) -> Result<()> {
        let css = self.payload()?.join("\n");
        let (stored, rules) = read_stylesheet(&css, &mut self.identifiers);
        self.rules.merge(rules);
        if !stored.is_empty() {
            self.blocks
                .push(Block::style(None, StyleContent::Css(stored)));
        }
        Ok(())
    }

    fn read_region(&mut self) -> Result<()> {
        let mut properties = BTreeMap::new();
        for line in self.payload()? {
            for setting in line.split_whitespace() {
                if let Some((key, value)) = setting.split_once(':') {
                    properties.insert(key.to_string(), value.to_string());
                }
            }
        }
        let id = properties.get("id").cloned();
        self.blocks.push(Block::layout(id, properties));
        Ok(())
    }

    fn read_cue(&mut self, first: String) -> Result<()> {
        let (identifier, timing) = if first.contains("-->") {
            (None, first)
        } else {
            match self.cursor.next_line()? {
                Some(timing) if timing.contains("-->") => (Some(first), timing),
                Some(found) => {
                    return Err(self.cursor.error(ParseError::MissingTiming {
                        line: self.cursor.line(),
                        found,
                    }))
                }
                None => {
                    return Err(self.cursor.error(ParseError::UnexpectedEof {
                        line: self.cursor.line(),
                        expected: "cue timing line".to_string(),
                    }))
                }
            }
        };
        let Some((start, end, settings)) = split_timing(&timing) else {
            return Err(self.cursor.error(ParseError::MissingTiming {
                line: self.cursor.line(),
                found: timing,
            }));
        };
        let start = self.cursor.time(MicroTime::from_vtt_time(start))?;
        let end = self.cursor.time(MicroTime::from_vtt_time(end))?;
        let settings = settings.to_string();
        let lines = self.payload()?;

        let mut block = if lines.first().is_some_and(|line| line.starts_with('{')) {
            let mut entries = BTreeMap::new();
            entries.insert(CUE_DATA_KEY.to_string(), lines.join("\n"));
            Block::new(
                start,
                end,
                BlockBody::Metadata(Metadata {
                    id: identifier.clone(),
                    entries,
                }),
            )
        } else {
            let base = self.rules.base_style(
                identifier
                    .as_deref()
                    .and_then(|id| self.identifiers.rewritten(id)),
            );
            let mut caption = Caption::default();
            if self.languages.len() > 1 {
                for (position, line) in lines.iter().enumerate() {
                    let language = &self.languages[position.min(self.languages.len() - 1)];
                    caption.append(language, &from_vtt(line, base.clone(), &self.rules));
                }
            } else {
                caption.set_text(
                    &self.languages[0],
                    from_vtt(&lines.join("\n"), base, &self.rules),
                );
            }
            Block::new(start, end, BlockBody::Caption(caption))
        };

        if let Some(identifier) = identifier {
            block = block.with_option(IDENTIFIER_OPTION, &identifier);
        }
        if !settings.is_empty() {
            block = block.with_option(SETTINGS_OPTION, &settings);
        }
        block.shift_time(self.time_offset);
        self.blocks.push(block);
        Ok(())
    }

    fn read_body(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_blank()?;
            let Some(first) = self.cursor.next_line()? else {
                return Ok(());
            };
            match Section::of(&first) {
                Section::Note => self.read_note(&first)?,
                Section::Style => self.read_style()?,
                Section::Region => self.read_region()?,
                Section::Cue => self.read_cue(first)?,
            }
        }
    }
}

/// Rules every stored stylesheet of `document` defines
///
/// Property styles with an id become `::cue(.id)` rules so spans that
/// reference them by class resolve the same way they were read.
fn document_rules(document: &Document) -> (Vec<String>, VttStyleRules) {
    let mut sheets = Vec::new();
    let mut rules = VttStyleRules::default();
    for block in document.blocks_of(BlockKind::Style) {
        let BlockBody::Style(style) = &block.body else {
            continue;
        };
        let css = match &style.content {
            StyleContent::Css(css) => css.clone(),
            StyleContent::Properties(properties) => {
                let Some(id) = &style.id else {
                    log::debug!("Skipping anonymous property style for VTT");
                    continue;
                };
                let declarations: Vec<(String, String)> = properties
                    .iter()
                    .filter(|(name, _)| !name.contains(':'))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                if declarations.is_empty() {
                    continue;
                }
                format_stylesheet(&[CssRule {
                    selector: format!("::cue(.{id})"),
                    declarations,
                }])
            }
            StyleContent::Raw(raw) => {
                log::debug!("VTT cannot carry raw style {raw}, skipping it");
                continue;
            }
        };
        rules.add_css(&css);
        sheets.push(css);
    }
    (sheets, rules)
}

fn header_section(document: &Document) -> String {
    let mut out = "WEBVTT".to_string();
    let Some(BlockBody::Metadata(header)) = document.metadata(HEADER_ID).map(|block| &block.body)
    else {
        return out;
    };
    if let Some(text) = header.entries.get(HEADER_TEXT_KEY) {
        out.push(' ');
        out.push_str(text);
    }
    for (key, value) in &header.entries {
        if key != HEADER_TEXT_KEY {
            out.push_str(&format!("\n{key}: {value}"));
        }
    }
    out
}

fn region_section(properties: &BTreeMap<String, String>) -> Option<String> {
    let settings: Vec<String> = REGION_SETTINGS
        .iter()
        .filter_map(|key| properties.get(*key).map(|value| format!("{key}:{value}")))
        .collect();
    (!settings.is_empty()).then(|| format!("REGION\n{}", settings.join("\n")))
}

fn cue_head(block: &Block) -> String {
    let mut out = String::new();
    if let Some(identifier) = block.options.get(IDENTIFIER_OPTION) {
        out.push_str(identifier);
        out.push('\n');
    }
    out.push_str(&format!(
        "{} --> {}",
        block.start_time().to_vtt_time(),
        block.end_time().to_vtt_time()
    ));
    if let Some(settings) = block.options.get(SETTINGS_OPTION) {
        out.push(' ');
        out.push_str(settings);
    }
    out
}

impl CaptionFormat for VttFormat {
    fn info(&self) -> &FormatInfo {
        &self.info
    }

    fn detect(&self, source: &mut dyn CaptionSource) -> bool {
        peek_lines(source, 1).is_some_and(|lines| lines.first().is_some_and(|line| is_header(line)))
    }

    fn read(
        &self,
        document: &mut Document,
        source: &mut dyn BufRead,
        options: &ReadOptions,
    ) -> Result<()> {
        let languages = options.languages_for(document);
        let (_, rules) = document_rules(document);
        let mut reader = VttReader {
            cursor: LineCursor::new(source, FormatKind::Vtt),
            languages: &languages,
            time_offset: options.time_offset,
            identifiers: document.options.vtt.clone(),
            rules,
            blocks: Vec::new(),
        };
        reader.read_header()?;
        reader.read_body()?;

        let VttReader {
            identifiers, blocks, ..
        } = reader;
        log::debug!("Read {} VTT blocks", blocks.len());
        document.options.vtt = identifiers;
        document.extend(blocks);
        Ok(())
    }

    fn save(&self, document: &Document, sink: &mut dyn Write, options: &SaveOptions) -> Result<()> {
        let languages = options.languages_for(document);
        let single = options.lines.is_single_line() || languages.len() > 1;
        let identifiers = &document.options.vtt;
        let (sheets, rules) = document_rules(document);

        let mut synthesized = SynthesizedClasses::default();
        let mut body = Vec::new();
        for block in document.iter() {
            match &block.body {
                BlockBody::Caption(caption) => {
                    let base = rules.base_style(
                        block
                            .options
                            .get(IDENTIFIER_OPTION)
                            .and_then(|id| identifiers.rewritten(id)),
                    );
                    let texts: Vec<String> = languages
                        .iter()
                        .filter_map(|language| caption.formatted_text(language, &options.lines))
                        .map(|text| {
                            let text = if single { text.single_line() } else { text };
                            to_vtt(&text, &base, &rules, &mut synthesized)
                        })
                        .collect();
                    if texts.is_empty() {
                        log::debug!(
                            "Skipping cue at {} without requested languages",
                            block.start_time()
                        );
                        continue;
                    }
                    body.push(format!("{}\n{}", cue_head(block), texts.join("\n")));
                }
                BlockBody::Metadata(metadata) => {
                    if let Some(data) = metadata.entries.get(CUE_DATA_KEY) {
                        body.push(format!("{}\n{data}", cue_head(block)));
                    }
                }
                BlockBody::Comment(comment) => {
                    let separator = if comment.text.contains('\n') { '\n' } else { ' ' };
                    body.push(format!("NOTE{separator}{}", comment.text).trim_end().to_string());
                }
                BlockBody::Style(_) | BlockBody::Layout(_) => {}
            }
        }

        let mut sections = vec![header_section(document)];
        for css in &sheets {
            sections.push(format!("STYLE\n{}", write_stylesheet(css, identifiers)));
        }
        if !synthesized.is_empty() {
            sections.push(format!("STYLE\n{}", synthesized.stylesheet()));
        }
        for block in document.blocks_of(BlockKind::Layout) {
            if let BlockBody::Layout(layout) = &block.body {
                match region_section(&layout.properties) {
                    Some(region) => sections.push(region),
                    None => log::debug!("Layout {:?} has no VTT region settings", layout.id),
                }
            }
        }
        sections.extend(body);

        sink.write_all(sections.join("\n\n").as_bytes())?;
        sink.write_all(b"\n")?;
        sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Segment, StyledText};
    use crate::utils::Color;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const SAMPLE: &str = "WEBVTT - demo\nKind: captions\n\nSTYLE\n::cue(#intro) {\n  color: yellow;\n}\n\nNOTE written by hand\n\nintro\n00:00:01.000 --> 00:00:03.000 align:start\nHello <b>world</b>\n\n00:00:04.000 --> 00:00:05.000\n{\"speaker\": 1}\n";

    fn read(text: &str) -> Result<Document> {
        let mut document = Document::new("en");
        VttFormat::new().read_str(&mut document, text, &ReadOptions::default())?;
        Ok(document)
    }

    #[test]
    fn detects_header() {
        let format = VttFormat::new();
        assert!(format.detect(&mut Cursor::new("WEBVTT\n\n")));
        assert!(format.detect(&mut Cursor::new("\u{feff}WEBVTT Title\n")));
        assert!(!format.detect(&mut Cursor::new("WEBVTTX\n")));
        assert!(!format.detect(&mut Cursor::new("1\n00:00:01,000 --> 00:00:02,000\n")));
    }

    #[test]
    fn reads_every_block_kind() -> Result<()> {
        let document = read(SAMPLE)?;
        let kinds: Vec<BlockKind> = document.iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            [
                BlockKind::Metadata,
                BlockKind::Style,
                BlockKind::Comment,
                BlockKind::Caption,
                BlockKind::Metadata,
            ]
        );
        let header = document.metadata(HEADER_ID).map(|block| &block.body);
        let Some(BlockBody::Metadata(header)) = header else {
            panic!("expected header metadata");
        };
        assert_eq!(header.entries["Kind"], "captions");
        assert_eq!(header.entries[HEADER_TEXT_KEY], "- demo");

        let cue = &document[3];
        assert_eq!(cue.options[IDENTIFIER_OPTION], "intro");
        assert_eq!(cue.options[SETTINGS_OPTION], "align:start");
        let text = cue.text("en").map(StyledText::segments);
        let Some([Segment::Text { style, .. }, ..]) = text else {
            panic!("expected styled text");
        };
        assert_eq!(style.color, Some(Color::new(255, 255, 0)));
        Ok(())
    }

    #[test]
    fn writes_back_the_same_file() -> Result<()> {
        let document = read(SAMPLE)?;
        let written = VttFormat::new().save_to_string(&document, &SaveOptions::default())?;
        assert_eq!(
            written,
            "WEBVTT - demo\nKind: captions\n\nSTYLE\n::cue(#intro) {\n  color: yellow;\n}\n\nNOTE written by hand\n\nintro\n00:00:01.000 --> 00:00:03.000 align:start\nHello <b>world</b>\n\n00:00:04.000 --> 00:00:05.000\n{\"speaker\": 1}\n"
        );
        Ok(())
    }

    #[test]
    fn regions_become_layouts() -> Result<()> {
        let document = read("WEBVTT\n\nREGION\nid:fred width:40%\nlines:3\n\n00:01.000 --> 00:02.000 region:fred\nHi\n")?;
        let Some(BlockBody::Layout(layout)) = document.layout("fred").map(|block| &block.body) else {
            panic!("expected region");
        };
        assert_eq!(layout.properties["width"], "40%");
        assert_eq!(layout.properties["lines"], "3");
        let written = VttFormat::new().save_to_string(&document, &SaveOptions::default())?;
        assert!(written.contains("REGION\nid:fred\nwidth:40%\nlines:3\n\n"));
        Ok(())
    }

    #[test]
    fn missing_header_is_an_error() {
        let err = read("00:01.000 --> 00:02.000\nHi\n").err();
        assert_eq!(err.as_ref().and_then(|err| err.line()), Some(1));
    }

    #[test]
    fn cue_without_timing_fails_whole_read() {
        let mut document = Document::new("en");
        let result = VttFormat::new().read_str(
            &mut document,
            "WEBVTT\n\n00:01.000 --> 00:02.000\nok\n\nlabel\nnot a timing\n",
            &ReadOptions::default(),
        );
        assert_eq!(result.err().and_then(|err| err.line()), Some(7));
        assert!(document.is_empty());
        assert_eq!(document.options.vtt, VttIdentifiers::default());
    }

    #[test]
    fn colours_without_rules_get_synthesized_classes() -> Result<()> {
        let mut document = Document::new("en");
        let mut text = StyledText::new();
        text.push_text("red", crate::model::SpanStyle::plain().with_color(Color::new(255, 0, 0)));
        document.append(
            Block::caption(MicroTime::from_millis(1_000), MicroTime::from_millis(2_000))
                .with_text("en", text.clone()),
        );
        let written = VttFormat::new().save_to_string(&document, &SaveOptions::default())?;
        assert!(written.contains("STYLE\n::cue(.caption-style-1) {\n  color: #FF0000;\n}"));
        assert!(written.contains("<c.caption-style-1>red</c>"));

        let back = read(&written)?;
        assert_eq!(back.blocks_of(BlockKind::Style).count(), 0);
        assert_eq!(back.captions().next().and_then(|block| block.text("en")), Some(&text));
        Ok(())
    }
}
