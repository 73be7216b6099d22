//! Format dispatcher
//!
//! Owns one codec per [`FormatKind`] and the extension table. Reads pick a
//! codec by sniffing the content in priority order; saves pick it by kind.

use std::io::{BufRead, Cursor, Write};
use std::path::Path;

use super::srt::SrtFormat;
use super::sub::SubFormat;
use super::ttml::TtmlFormat;
use super::vtt::VttFormat;
use super::{CaptionFormat, CaptionSource, FileExtensions, FormatKind, ReadOptions, SaveOptions};
use crate::model::Document;
use crate::utils::{CoreError, Result, UNDEFINED_LANGUAGE};

/// Codec registry with content based dispatch
#[derive(Debug)]
pub struct Dispatcher {
    /// Codecs in detection priority order
    codecs: Vec<Box<dyn CaptionFormat>>,
    extensions: FileExtensions,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher with every built-in codec and the default extensions
    #[must_use]
    pub fn new() -> Self {
        Self::with_extensions(FileExtensions::default())
    }

    /// Dispatcher using a custom extension table
    #[must_use]
    pub fn with_extensions(extensions: FileExtensions) -> Self {
        let codecs: Vec<Box<dyn CaptionFormat>> = FormatKind::ALL
            .into_iter()
            .map(|kind| -> Box<dyn CaptionFormat> {
                match kind {
                    FormatKind::Srt => Box::new(SrtFormat::new()),
                    FormatKind::Sub => Box::new(SubFormat::new()),
                    FormatKind::Ttml => Box::new(TtmlFormat::new()),
                    FormatKind::Vtt => Box::new(VttFormat::new()),
                }
            })
            .collect();
        Self { codecs, extensions }
    }

    /// Extension table used for filenames
    #[must_use]
    pub const fn extensions(&self) -> &FileExtensions {
        &self.extensions
    }

    /// Codec handling `kind`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedFormat`] when no codec is registered.
    pub fn codec(&self, kind: FormatKind) -> Result<&dyn CaptionFormat> {
        self.codecs
            .iter()
            .find(|codec| codec.kind() == kind)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| CoreError::UnsupportedFormat(kind.to_string()))
    }

    /// First format whose `detect` accepts `source`
    ///
    /// The stream position is left untouched.
    pub fn detect(&self, source: &mut dyn CaptionSource) -> Option<FormatKind> {
        let found = self
            .codecs
            .iter()
            .find(|codec| codec.detect(source))
            .map(|codec| codec.kind());
        match found {
            Some(kind) => log::debug!("Detected {kind} content"),
            None => log::debug!("No codec recognised the content"),
        }
        found
    }

    /// Format of a path by extension
    #[must_use]
    pub fn kind_for_path(&self, path: &Path) -> Option<FormatKind> {
        self.extensions.kind_for_path(path)
    }

    /// Sniff the format of `source` and append its blocks to `document`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnrecognizedFormat`] when no codec accepts the
    /// content, or the codec's read error. `document` is unchanged on error.
    pub fn read_into(
        &self,
        document: &mut Document,
        source: &mut dyn CaptionSource,
        options: &ReadOptions,
    ) -> Result<FormatKind> {
        let kind = self.detect(source).ok_or(CoreError::UnrecognizedFormat)?;
        let mut reader = source;
        self.codec(kind)?.read(document, &mut reader, options)?;
        Ok(kind)
    }

    /// Read `source` into a new document
    ///
    /// The document's default language is the first requested language.
    ///
    /// # Errors
    ///
    /// See [`read_into`](Self::read_into).
    pub fn read(&self, source: &mut dyn CaptionSource, options: &ReadOptions) -> Result<Document> {
        let mut document = Document::new(
            options
                .languages
                .first()
                .map_or(UNDEFINED_LANGUAGE, String::as_str),
        );
        document.extensions = self.extensions.clone();
        self.read_into(&mut document, source, options)?;
        Ok(document)
    }

    /// Read a string into a new document
    ///
    /// # Errors
    ///
    /// See [`read_into`](Self::read_into).
    pub fn read_str(&self, text: &str, options: &ReadOptions) -> Result<Document> {
        self.read(&mut Cursor::new(text.as_bytes()), options)
    }

    /// Read `source` with an explicit codec, skipping detection
    ///
    /// # Errors
    ///
    /// Returns the codec's read error.
    pub fn read_as(
        &self,
        kind: FormatKind,
        document: &mut Document,
        source: &mut dyn BufRead,
        options: &ReadOptions,
    ) -> Result<()> {
        self.codec(kind)?.read(document, source, options)
    }

    /// Write `document` as `kind`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] when the sink fails.
    pub fn save(
        &self,
        document: &Document,
        kind: FormatKind,
        sink: &mut dyn Write,
        options: &SaveOptions,
    ) -> Result<()> {
        self.codec(kind)?.save(document, sink, options)
    }

    /// Render `document` as `kind`
    ///
    /// # Errors
    ///
    /// See [`save`](Self::save).
    pub fn save_to_string(
        &self,
        document: &Document,
        kind: FormatKind,
        options: &SaveOptions,
    ) -> Result<String> {
        self.codec(kind)?.save_to_string(document, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_codec() -> Result<()> {
        let dispatcher = Dispatcher::new();
        for kind in FormatKind::ALL {
            assert_eq!(dispatcher.codec(kind)?.kind(), kind);
        }
        Ok(())
    }

    #[test]
    fn detection_follows_content() {
        let dispatcher = Dispatcher::new();
        let cases = [
            ("1\n00:00:01,000 --> 00:00:02,000\nx\n", Some(FormatKind::Srt)),
            ("{0}{25}x\n", Some(FormatKind::Sub)),
            ("<?xml version=\"1.0\"?>\n<tt xmlns=\"http://www.w3.org/ns/ttml\">", Some(FormatKind::Ttml)),
            ("WEBVTT\n\n00:01.000 --> 00:02.000\nx\n", Some(FormatKind::Vtt)),
            ("just some text\n", None),
        ];
        for (text, expected) in cases {
            let mut source = Cursor::new(text.as_bytes());
            assert_eq!(dispatcher.detect(&mut source), expected, "{text}");
            assert_eq!(source.position(), 0);
        }
    }

    #[test]
    fn unknown_content_is_rejected() {
        let dispatcher = Dispatcher::new();
        let mut document = Document::new("en");
        let mut source = Cursor::new(b"nothing to see".as_slice());
        let err = dispatcher
            .read_into(&mut document, &mut source, &ReadOptions::default())
            .err();
        assert_eq!(err, Some(CoreError::UnrecognizedFormat));
        assert!(document.is_empty());
    }

    #[test]
    fn extensions_route_paths() {
        let dispatcher = Dispatcher::with_extensions(FileExtensions::default().with(FormatKind::Ttml, "xml"));
        assert_eq!(dispatcher.kind_for_path(Path::new("a/b.en.xml")), Some(FormatKind::Ttml));
        assert_eq!(dispatcher.kind_for_path(Path::new("b.srt")), Some(FormatKind::Srt));
        assert_eq!(dispatcher.kind_for_path(Path::new("b.txt")), None);
    }

    #[test]
    fn read_str_uses_first_language() -> Result<()> {
        let dispatcher = Dispatcher::new();
        let options = ReadOptions::default().with_languages(&["fr"]);
        let document = dispatcher.read_str("1\n00:00:01,000 --> 00:00:02,000\nSalut\n", &options)?;
        assert_eq!(document.default_language(), "fr");
        assert!(document[0].text("fr").is_some());
        Ok(())
    }
}
