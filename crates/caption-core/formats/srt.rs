//! SubRip (SRT) codec
//!
//! Cues are an index line, a `start --> end` timing line, one or more text
//! lines and a blank separator. With several languages requested, text
//! line `n` of a cue belongs to language `n`.

use std::io::{BufRead, Write};

use super::{
    peek_lines, CaptionFormat, CaptionSource, FormatInfo, FormatKind, LineCursor, ReadOptions,
    SaveOptions,
};
use crate::model::{Block, BlockBody, Caption, Document, StyledText};
use crate::style::{from_srt, to_srt};
use crate::time::MicroTime;
use crate::utils::{ParseError, Result};

/// SRT format handler
#[derive(Debug)]
pub struct SrtFormat {
    info: FormatInfo,
}

impl Default for SrtFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl SrtFormat {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            info: FormatInfo {
                kind: FormatKind::Srt,
                description: "SubRip subtitles",
                mime_type: "application/x-subrip",
                supports_styling: true,
                frame_based: false,
            },
        }
    }
}

/// Split `start --> end [settings]` into its two times
pub(crate) fn split_timing(line: &str) -> Option<(&str, &str, &str)> {
    let (start, rest) = line.split_once("-->")?;
    let rest = rest.trim_start();
    let (end, settings) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(end, settings)| (end, settings.trim()));
    Some((start.trim(), end.trim(), settings))
}

impl CaptionFormat for SrtFormat {
    fn info(&self) -> &FormatInfo {
        &self.info
    }

    fn detect(&self, source: &mut dyn CaptionSource) -> bool {
        peek_lines(source, 2).is_some_and(|lines| {
            lines.len() == 2 && lines[0].trim() == "1" && lines[1].contains("-->")
        })
    }

    fn read(
        &self,
        document: &mut Document,
        source: &mut dyn BufRead,
        options: &ReadOptions,
    ) -> Result<()> {
        let languages = options.languages_for(document);
        let mut cursor = LineCursor::new(source, FormatKind::Srt);
        let mut blocks = Vec::new();

        loop {
            cursor.skip_blank()?;
            let Some(index) = cursor.next_line()? else {
                break;
            };
            if index.trim().parse::<u64>().is_err() {
                return Err(cursor.error(ParseError::InvalidIndex {
                    line: cursor.line(),
                    found: index,
                }));
            }
            let Some(timing) = cursor.next_line()? else {
                return Err(cursor.error(ParseError::UnexpectedEof {
                    line: cursor.line(),
                    expected: "timing line".to_string(),
                }));
            };
            let Some((start, end, _)) = split_timing(&timing) else {
                return Err(cursor.error(ParseError::MissingTiming {
                    line: cursor.line(),
                    found: timing,
                }));
            };
            let start = cursor.time(MicroTime::from_srt_time(start))?;
            let end = cursor.time(MicroTime::from_srt_time(end))?;

            let mut lines = Vec::new();
            while let Some(line) = cursor.peek()? {
                if line.trim().is_empty() {
                    break;
                }
                lines.push(line.to_string());
                cursor.next_line()?;
            }

            let mut caption = Caption::default();
            if languages.len() > 1 {
                for (position, line) in lines.iter().enumerate() {
                    let language = &languages[position.min(languages.len() - 1)];
                    caption.append(language, &from_srt(line));
                }
            } else {
                caption.set_text(&languages[0], from_srt(&lines.join("\n")));
            }
            let mut block = Block::new(start, end, BlockBody::Caption(caption));
            block.shift_time(options.time_offset);
            blocks.push(block);
        }

        log::debug!("Read {} SRT cues", blocks.len());
        document.extend(blocks);
        Ok(())
    }

    fn save(&self, document: &Document, sink: &mut dyn Write, options: &SaveOptions) -> Result<()> {
        let languages = options.languages_for(document);
        let single = options.lines.is_single_line() || languages.len() > 1;
        let mut index = 0;
        for block in document.captions() {
            let Some(caption) = block.as_caption() else {
                continue;
            };
            let texts: Vec<StyledText> = languages
                .iter()
                .filter_map(|language| caption.formatted_text(language, &options.lines))
                .collect();
            if texts.is_empty() {
                log::debug!("Skipping cue at {} without requested languages", block.start_time());
                continue;
            }
            index += 1;
            if index > 1 {
                sink.write_all(b"\n\n")?;
            }
            let body: Vec<String> = texts.iter().map(|text| to_srt(text, single)).collect();
            write!(
                sink,
                "{index}\n{} --> {}\n{}",
                block.start_time().to_srt_time(),
                block.end_time().to_srt_time(),
                body.join("\n")
            )?;
        }
        if index > 0 {
            sink.write_all(b"\n")?;
        }
        sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:03,000\nHello <b>world</b>\nsecond line\n\n2\n00:00:04,500 --> 00:00:06,000\nBye\n";

    #[test]
    fn detects_first_cue() {
        let format = SrtFormat::new();
        let mut source = Cursor::new(SAMPLE);
        assert!(format.detect(&mut source));
        assert_eq!(source.position(), 0);
        assert!(!format.detect(&mut Cursor::new("WEBVTT\n\n")));
        assert!(!format.detect(&mut Cursor::new("2\n00:00:01,000 --> 00:00:02,000\n")));
    }

    #[test]
    fn reads_and_writes_cues() -> Result<()> {
        let format = SrtFormat::new();
        let mut document = Document::new("en");
        format.read_str(&mut document, SAMPLE, &ReadOptions::default())?;
        assert_eq!(document.len(), 2);
        assert_eq!(document[0].kind(), BlockKind::Caption);
        assert_eq!(
            document[0].text("en").map(StyledText::plain_text).as_deref(),
            Some("Hello world\nsecond line")
        );
        assert_eq!(document.time_length(), MicroTime::from_millis(6_000));

        let written = format.save_to_string(&document, &SaveOptions::default())?;
        assert_eq!(written, SAMPLE);
        Ok(())
    }

    #[test]
    fn extra_lines_map_to_languages() -> Result<()> {
        let format = SrtFormat::new();
        let mut document = Document::new("en");
        let options = ReadOptions::default().with_languages(&["en", "fr"]);
        format.read_str(
            &mut document,
            "1\n00:00:01,000 --> 00:00:02,000\nHello\nBonjour\n",
            &options,
        )?;
        assert_eq!(document[0].text("fr").map(StyledText::plain_text).as_deref(), Some("Bonjour"));

        let written = format.save_to_string(&document, &SaveOptions::default().with_languages(&["fr"]))?;
        assert_eq!(written, "1\n00:00:01,000 --> 00:00:02,000\nBonjour\n");
        Ok(())
    }

    #[test]
    fn malformed_body_leaves_document_untouched() {
        let format = SrtFormat::new();
        let mut document = Document::new("en");
        let result = format.read_str(
            &mut document,
            "1\n00:00:01,000 --> 00:00:02,000\nok\n\nx\n00:00:03,000 --> 00:00:04,000\nbad\n",
            &ReadOptions::default(),
        );
        let err = result.err();
        assert_eq!(err.as_ref().and_then(|err| err.line()), Some(5));
        assert!(document.is_empty());
    }

    #[test]
    fn offset_shifts_blocks() -> Result<()> {
        let format = SrtFormat::new();
        let mut document = Document::new("en");
        let options = ReadOptions::default().with_time_offset(500_000);
        format.read_str(&mut document, "1\n00:00:01,000 --> 00:00:02,000\nx\n", &options)?;
        assert_eq!(document[0].start_time(), MicroTime::from_millis(1_500));
        Ok(())
    }
}
