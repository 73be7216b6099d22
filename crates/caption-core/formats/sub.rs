//! MicroDVD (SUB) codec
//!
//! One cue per line: `{start}{end}text`, times in frames. `|` separates
//! lines, or language columns when several languages are read or written.
//! `{DEFAULT}` lines carry file wide styling and are kept verbatim.
//!
//! The frame rate is fixed once per document: the stored rate wins, then
//! the read option, then a leading `{1}{1}<fps>` declaration, then 25.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::OnceLock;

use regex::Regex;

use super::{
    peek_lines, CaptionFormat, CaptionSource, FormatInfo, FormatKind, LineCursor, ReadOptions,
    SaveOptions,
};
use crate::model::{Block, BlockBody, BlockKind, Caption, Document, StyleContent, StyledText};
use crate::style::{from_sub, to_sub};
use crate::time::{MicroTime, DEFAULT_FRAME_RATE};
use crate::utils::{ParseError, Result};

/// Prefix of file wide style lines
pub const DEFAULT_STYLE_PREFIX: &str = "{DEFAULT}";

/// Id of the metadata block holding the `{H:...}` language
pub const DEFAULT_METADATA_ID: &str = "default";

fn cue_regex() -> &'static Regex {
    static CUE: OnceLock<Regex> = OnceLock::new();
    CUE.get_or_init(|| {
        Regex::new(r"^\{(\d+)\}\{(\d+)\}(.*)$")
            .unwrap_or_else(|_| unreachable!("cue pattern is valid"))
    })
}

/// MicroDVD format handler
#[derive(Debug)]
pub struct SubFormat {
    info: FormatInfo,
}

impl Default for SubFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl SubFormat {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            info: FormatInfo {
                kind: FormatKind::Sub,
                description: "MicroDVD subtitles",
                mime_type: "text/x-microdvd",
                supports_styling: true,
                frame_based: true,
            },
        }
    }
}

/// Frame rate declared by a `{1}{1}23.976` cue
fn declared_frame_rate(start: &str, end: &str, text: &str) -> Option<f64> {
    if start != "1" || end != "1" {
        return None;
    }
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite() && *rate > 0.0)
}

impl CaptionFormat for SubFormat {
    fn info(&self) -> &FormatInfo {
        &self.info
    }

    fn detect(&self, source: &mut dyn CaptionSource) -> bool {
        peek_lines(source, 1).is_some_and(|lines| {
            lines.first().is_some_and(|line| {
                line.starts_with(DEFAULT_STYLE_PREFIX) || cue_regex().is_match(line)
            })
        })
    }

    fn read(
        &self,
        document: &mut Document,
        source: &mut dyn BufRead,
        options: &ReadOptions,
    ) -> Result<()> {
        let languages = options.languages_for(document);
        let mut cursor = LineCursor::new(source, FormatKind::Sub);
        let mut codes = document.options.micro_dvd.clone();
        let mut frame_rate = document.options.frame_rate.or(options.frame_rate);
        if let (Some(stored), Some(requested)) = (document.options.frame_rate, options.frame_rate) {
            if (stored - requested).abs() > f64::EPSILON {
                log::debug!("Document frame rate {stored} kept over requested {requested}");
            }
        }
        let mut language_tag = None;
        let mut blocks = Vec::new();
        let mut first_cue = true;

        loop {
            cursor.skip_blank()?;
            let Some(line) = cursor.next_line()? else {
                break;
            };
            let line = line.trim();
            if line.starts_with(DEFAULT_STYLE_PREFIX) {
                blocks.push(Block::style(None, StyleContent::Raw(line.to_string())));
                continue;
            }
            let Some((start, end, text)) = cue_regex().captures(line).and_then(|captures| {
                Some((
                    captures.get(1)?.as_str(),
                    captures.get(2)?.as_str(),
                    captures.get(3)?.as_str(),
                ))
            }) else {
                return Err(cursor.error(ParseError::InvalidFrames {
                    line: cursor.line(),
                    found: line.to_string(),
                }));
            };

            if std::mem::take(&mut first_cue) {
                if let Some(declared) = declared_frame_rate(start, end, text) {
                    if frame_rate.is_none() {
                        log::debug!("MicroDVD file declares {declared} fps");
                        frame_rate = Some(declared);
                    }
                    continue;
                }
            }
            let rate = *frame_rate.get_or_insert(DEFAULT_FRAME_RATE);
            let start = cursor.time(MicroTime::from_sub_time(start, rate))?;
            let end = cursor.time(MicroTime::from_sub_time(end, rate))?;

            let mut caption = Caption::default();
            if languages.len() > 1 {
                for (position, column) in text.split('|').enumerate() {
                    let parsed = from_sub(column, &mut codes);
                    language_tag = language_tag.or(parsed.language);
                    let language = &languages[position.min(languages.len() - 1)];
                    caption.append(language, &parsed.text);
                }
            } else {
                let parsed = from_sub(text, &mut codes);
                language_tag = language_tag.or(parsed.language);
                caption.set_text(&languages[0], parsed.text);
            }
            let mut block = Block::new(start, end, BlockBody::Caption(caption));
            block.shift_time(options.time_offset);
            blocks.push(block);
        }

        if let Some(language) = language_tag {
            let mut entries = BTreeMap::new();
            entries.insert("language".to_string(), language);
            blocks.push(Block::metadata(Some(DEFAULT_METADATA_ID.to_string()), entries));
        }
        log::debug!("Read {} MicroDVD blocks", blocks.len());
        document.options.micro_dvd = codes;
        if document.options.frame_rate.is_none() {
            document.options.frame_rate = Some(frame_rate.unwrap_or(DEFAULT_FRAME_RATE));
        }
        document.extend(blocks);
        Ok(())
    }

    fn save(&self, document: &Document, sink: &mut dyn Write, options: &SaveOptions) -> Result<()> {
        let languages = options.languages_for(document);
        let single = options.lines.is_single_line() || languages.len() > 1;
        let frame_rate = options
            .frame_rate
            .or(document.options.frame_rate)
            .unwrap_or(DEFAULT_FRAME_RATE);
        let codes = &document.options.micro_dvd;

        let mut lines = Vec::new();
        for block in document.blocks_of(BlockKind::Style) {
            if let BlockBody::Style(style) = &block.body {
                if let StyleContent::Raw(raw) = &style.content {
                    lines.push(raw.clone());
                }
            }
        }
        for block in document.captions() {
            let Some(caption) = block.as_caption() else {
                continue;
            };
            let texts: Vec<StyledText> = languages
                .iter()
                .filter_map(|language| caption.formatted_text(language, &options.lines))
                .collect();
            if texts.is_empty() {
                continue;
            }
            let columns: Vec<String> = texts.iter().map(|text| to_sub(text, codes, single)).collect();
            lines.push(format!(
                "{{{}}}{{{}}}{}",
                block.start_time().to_sub_frames(frame_rate)?,
                block.end_time().to_sub_frames(frame_rate)?,
                columns.join("|")
            ));
        }
        if !lines.is_empty() {
            sink.write_all(lines.join("\n").as_bytes())?;
            sink.write_all(b"\n")?;
        }
        sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn detects_frames_and_default_lines() {
        let format = SubFormat::new();
        assert!(format.detect(&mut Cursor::new("{0}{25}Hello\n")));
        assert!(format.detect(&mut Cursor::new("{DEFAULT}{C:$0000FF}\n")));
        assert!(!format.detect(&mut Cursor::new("1\n00:00:01,000 --> 00:00:02,000\n")));
    }

    #[test]
    fn frames_use_default_rate() -> Result<()> {
        let format = SubFormat::new();
        let mut document = Document::new("en");
        format.read_str(&mut document, "{25}{50}{y:i}Hello|world\n", &ReadOptions::default())?;
        assert_eq!(document.options.frame_rate, Some(DEFAULT_FRAME_RATE));
        assert_eq!(document[0].start_time(), MicroTime::from_millis(1_000));
        assert_eq!(document[0].end_time(), MicroTime::from_millis(2_000));
        assert_eq!(
            document[0].text("en").map(StyledText::plain_text).as_deref(),
            Some("Hello\nworld")
        );
        assert_eq!(
            format.save_to_string(&document, &SaveOptions::default())?,
            "{25}{50}{y:i}Hello|world\n"
        );
        Ok(())
    }

    #[test]
    fn first_rate_wins() -> Result<()> {
        let format = SubFormat::new();
        let mut document = Document::new("en");
        format.read_str(&mut document, "{1}{1}10\n{10}{20}a\n", &ReadOptions::default())?;
        assert_eq!(document.options.frame_rate, Some(10.0));
        assert_eq!(document.len(), 1);
        assert_eq!(document[0].end_time(), MicroTime::from_millis(2_000));

        let options = ReadOptions::default().with_frame_rate(50.0);
        format.read_str(&mut document, "{30}{40}b\n", &options)?;
        assert_eq!(document.options.frame_rate, Some(10.0));
        assert_eq!(document[1].start_time(), MicroTime::from_millis(3_000));
        Ok(())
    }

    #[test]
    fn default_lines_and_language_are_kept() -> Result<()> {
        let format = SubFormat::new();
        let mut document = Document::new("en");
        format.read_str(
            &mut document,
            "{DEFAULT}{C:$00FF00}\n{0}{25}{H:pl}tekst\n",
            &ReadOptions::default(),
        )?;
        let Some(BlockBody::Metadata(metadata)) =
            document.metadata(DEFAULT_METADATA_ID).map(|block| &block.body)
        else {
            panic!("expected language metadata");
        };
        assert_eq!(metadata.entries["language"], "pl");
        assert_eq!(
            format.save_to_string(&document, &SaveOptions::default())?,
            "{DEFAULT}{C:$00FF00}\n{0}{25}tekst\n"
        );
        Ok(())
    }

    #[test]
    fn columns_map_to_languages() -> Result<()> {
        let format = SubFormat::new();
        let mut document = Document::new("en");
        let options = ReadOptions::default().with_languages(&["en", "de"]);
        format.read_str(&mut document, "{0}{25}Hi|Hallo\n", &options)?;
        assert_eq!(document[0].text("de").map(StyledText::plain_text).as_deref(), Some("Hallo"));
        let saved = format.save_to_string(
            &document,
            &SaveOptions::default().with_languages(&["de", "en"]).with_frame_rate(50.0),
        )?;
        assert_eq!(saved, "{0}{50}Hallo|Hi\n");
        Ok(())
    }

    #[test]
    fn garbage_line_is_reported() {
        let mut document = Document::new("en");
        let err = SubFormat::new()
            .read_str(&mut document, "{0}{25}ok\nnot a cue\n", &ReadOptions::default())
            .err();
        assert_eq!(err.and_then(|err| err.line()), Some(2));
        assert!(document.is_empty());
        assert_eq!(document.options.frame_rate, None);
    }
}
