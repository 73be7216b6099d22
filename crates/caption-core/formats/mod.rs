//! Format codecs and the dispatcher that picks between them
//!
//! Every supported format implements [`CaptionFormat`]: `detect` sniffs a
//! stream without consuming it, `read` appends the stream's blocks to a
//! [`Document`], `save` writes a document out. The [`Dispatcher`] owns one
//! codec per [`FormatKind`] and routes calls by content or by extension.

pub mod dispatcher;
pub mod extensions;
pub mod srt;
pub mod sub;
pub mod ttml;
pub mod vtt;

use std::fmt;
use std::io::{BufRead, Seek, SeekFrom, Write};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::model::Document;
use crate::reflow::ReflowOptions;
use crate::time::MicroTime;
use crate::utils::{normalize_language, normalize_line, CoreError, ParseError, Result};

pub use dispatcher::Dispatcher;
pub use extensions::FileExtensions;

/// Supported wire formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum FormatKind {
    Srt,
    Sub,
    Ttml,
    Vtt,
}

impl FormatKind {
    /// Every format, in detection priority order
    pub const ALL: [Self; 4] = [Self::Srt, Self::Sub, Self::Ttml, Self::Vtt];

    /// Short upper case name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Srt => "SRT",
            Self::Sub => "SUB",
            Self::Ttml => "TTML",
            Self::Vtt => "VTT",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata about a format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub kind: FormatKind,
    /// Human readable name
    pub description: &'static str,
    pub mime_type: &'static str,
    /// Whether inline styling survives a round trip
    pub supports_styling: bool,
    /// Whether times are frame numbers
    pub frame_based: bool,
}

/// Seekable line source, needed to sniff without consuming
pub trait CaptionSource: BufRead + Seek {}

impl<T: BufRead + Seek + ?Sized> CaptionSource for T {}

/// How caption text is laid out into lines on save
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LineMode {
    /// Keep the line breaks the text already has
    #[default]
    Preserve,
    /// Re-wrap with the reflow engine
    Reflow(ReflowOptions),
}

impl LineMode {
    /// Everything goes on one display line
    #[must_use]
    pub const fn is_single_line(&self) -> bool {
        matches!(self, Self::Reflow(options) if options.lines == 1)
    }
}

/// Options for a `read` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    /// Language of each text column; empty means the document default
    pub languages: Vec<String>,
    /// Signed shift applied to every block read, in microseconds
    pub time_offset: i64,
    /// Frame rate for frame based formats when the document has none yet
    pub frame_rate: Option<f64>,
}

impl ReadOptions {
    #[must_use]
    pub fn with_languages<S: AsRef<str>>(mut self, languages: &[S]) -> Self {
        self.languages = languages.iter().map(|tag| normalize_language(tag.as_ref())).collect();
        self
    }

    #[must_use]
    pub const fn with_time_offset(mut self, delta_micros: i64) -> Self {
        self.time_offset = delta_micros;
        self
    }

    #[must_use]
    pub const fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    /// Languages to read into, falling back to the document default
    #[must_use]
    pub fn languages_for(&self, document: &Document) -> Vec<String> {
        if self.languages.is_empty() {
            vec![document.default_language().to_string()]
        } else {
            self.languages.clone()
        }
    }
}

/// Options for a `save` call
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOptions {
    /// Languages to write; empty means the document default
    pub languages: Vec<String>,
    /// Line layout of caption text
    pub lines: LineMode,
    /// Frame rate for frame based formats, overriding the document's
    pub frame_rate: Option<f64>,
    /// Put the language tags in generated filenames
    pub include_languages_in_filename: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            lines: LineMode::Preserve,
            frame_rate: None,
            include_languages_in_filename: true,
        }
    }
}

impl SaveOptions {
    #[must_use]
    pub fn with_languages<S: AsRef<str>>(mut self, languages: &[S]) -> Self {
        self.languages = languages.iter().map(|tag| normalize_language(tag.as_ref())).collect();
        self
    }

    #[must_use]
    pub fn with_lines(mut self, lines: LineMode) -> Self {
        self.lines = lines;
        self
    }

    #[must_use]
    pub const fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    #[must_use]
    pub const fn with_languages_in_filename(mut self, include: bool) -> Self {
        self.include_languages_in_filename = include;
        self
    }

    /// Languages to write, falling back to the document default
    #[must_use]
    pub fn languages_for(&self, document: &Document) -> Vec<String> {
        if self.languages.is_empty() {
            vec![document.default_language().to_string()]
        } else {
            self.languages.clone()
        }
    }
}

/// A caption wire format
pub trait CaptionFormat: fmt::Debug + Send + Sync {
    /// Information about this format
    fn info(&self) -> &FormatInfo;

    /// Whether `source` looks like this format
    ///
    /// Never fails and always leaves the stream where it found it.
    fn detect(&self, source: &mut dyn CaptionSource) -> bool;

    /// Append the blocks of `source` to `document`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] naming the offending line or offset
    /// when the body is malformed. Nothing is appended in that case.
    fn read(
        &self,
        document: &mut Document,
        source: &mut dyn BufRead,
        options: &ReadOptions,
    ) -> Result<()>;

    /// Write `document` to `sink`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] when the sink fails.
    fn save(&self, document: &Document, sink: &mut dyn Write, options: &SaveOptions) -> Result<()>;

    fn kind(&self) -> FormatKind {
        self.info().kind
    }

    /// Parse from a string
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    fn read_str(&self, document: &mut Document, text: &str, options: &ReadOptions) -> Result<()> {
        let mut cursor = std::io::Cursor::new(text.as_bytes());
        self.read(document, &mut cursor, options)
    }

    /// Render to a string
    ///
    /// # Errors
    ///
    /// See [`save`](Self::save).
    fn save_to_string(&self, document: &Document, options: &SaveOptions) -> Result<String> {
        let mut buffer = Vec::new();
        self.save(document, &mut buffer, options)?;
        String::from_utf8(buffer)
            .map_err(|err| CoreError::Serialization(format!("Invalid UTF-8 output: {err}")))
    }
}

/// Read up to `count` non-blank lines and rewind
///
/// `None` when the stream cannot be read or rewound.
pub(crate) fn peek_lines(source: &mut dyn CaptionSource, count: usize) -> Option<Vec<String>> {
    let start = source.stream_position().ok()?;
    let mut lines = Vec::with_capacity(count);
    let mut buffer = String::new();
    let mut failed = false;
    while lines.len() < count {
        buffer.clear();
        match source.read_line(&mut buffer) {
            Ok(0) => break,
            Ok(_) => {
                let line = normalize_line(&buffer);
                if !(lines.is_empty() && line.trim().is_empty()) {
                    lines.push(line.to_string());
                }
            }
            Err(_) => {
                failed = true;
                break;
            }
        }
    }
    source.seek(SeekFrom::Start(start)).ok()?;
    (!failed).then_some(lines)
}

/// Line reader with one line of lookahead
///
/// Line numbers are 1-based and refer to the last line returned by
/// [`next_line`](Self::next_line).
pub(crate) struct LineCursor<'a> {
    source: &'a mut dyn BufRead,
    format: FormatKind,
    peeked: Option<Option<String>>,
    line: usize,
}

impl<'a> LineCursor<'a> {
    pub(crate) fn new(source: &'a mut dyn BufRead, format: FormatKind) -> Self {
        Self {
            source,
            format,
            peeked: None,
            line: 0,
        }
    }

    fn fetch(&mut self) -> Result<Option<String>> {
        let mut buffer = String::new();
        match self.source.read_line(&mut buffer) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(normalize_line(&buffer).to_string())),
            Err(err) => Err(self.error(ParseError::Io {
                line: self.line + 1,
                message: err.to_string(),
            })),
        }
    }

    /// Next line without consuming it
    pub(crate) fn peek(&mut self) -> Result<Option<&str>> {
        if self.peeked.is_none() {
            let line = self.fetch()?;
            self.peeked = Some(line);
        }
        Ok(self.peeked.as_ref().and_then(|line| line.as_deref()))
    }

    /// Consume and return the next line
    pub(crate) fn next_line(&mut self) -> Result<Option<String>> {
        let line = match self.peeked.take() {
            Some(line) => line,
            None => self.fetch()?,
        };
        if line.is_some() {
            self.line += 1;
        }
        Ok(line)
    }

    /// Skip blank lines
    pub(crate) fn skip_blank(&mut self) -> Result<()> {
        while self.peek()?.is_some_and(|line| line.trim().is_empty()) {
            self.next_line()?;
        }
        Ok(())
    }

    pub(crate) const fn line(&self) -> usize {
        self.line
    }

    /// Wrap a parse failure with this cursor's format
    pub(crate) fn error(&self, error: ParseError) -> CoreError {
        CoreError::parse(self.format, error)
    }

    /// Attach the current line to a time decoding failure
    pub(crate) fn time(&self, parsed: Result<MicroTime>) -> Result<MicroTime> {
        parsed.map_err(|err| match err {
            CoreError::InvalidTime { time, reason } => self.error(ParseError::InvalidTime {
                line: self.line,
                time,
                reason,
            }),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn peeking_rewinds() {
        let mut source = Cursor::new("\n\nfirst\nsecond\nthird\n");
        let lines = peek_lines(&mut source, 2);
        assert_eq!(lines, Some(vec!["first".to_string(), "second".to_string()]));
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn cursor_counts_lines() -> Result<()> {
        let mut source = Cursor::new("\u{feff}a\r\n\nb");
        let mut cursor = LineCursor::new(&mut source, FormatKind::Srt);
        assert_eq!(cursor.peek()?, Some("a"));
        assert_eq!(cursor.next_line()?.as_deref(), Some("a"));
        cursor.skip_blank()?;
        assert_eq!(cursor.next_line()?.as_deref(), Some("b"));
        assert_eq!(cursor.line(), 3);
        assert_eq!(cursor.next_line()?, None);
        Ok(())
    }

    #[test]
    fn single_line_mode() {
        assert!(LineMode::Reflow(ReflowOptions::new(1)).is_single_line());
        assert!(!LineMode::Preserve.is_single_line());
        assert_eq!(FormatKind::Ttml.to_string(), "TTML");
    }
}
