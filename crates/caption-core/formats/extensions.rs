//! File extension table
//!
//! Used to pick a codec from a filename and to build output filenames.
//! A dispatcher owns one table; it is only read during conversions.

use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::FormatKind;

/// Extension (with the leading dot) for every format
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct FileExtensions {
    pub srt: String,
    pub sub: String,
    pub ttml: String,
    pub vtt: String,
}

impl Default for FileExtensions {
    fn default() -> Self {
        Self {
            srt: ".srt".to_string(),
            sub: ".sub".to_string(),
            ttml: ".ttml".to_string(),
            vtt: ".vtt".to_string(),
        }
    }
}

fn with_dot(extension: &str) -> String {
    let extension = extension.trim();
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

impl FileExtensions {
    /// Extension used for `kind`
    #[must_use]
    pub fn extension(&self, kind: FormatKind) -> &str {
        match kind {
            FormatKind::Srt => &self.srt,
            FormatKind::Sub => &self.sub,
            FormatKind::Ttml => &self.ttml,
            FormatKind::Vtt => &self.vtt,
        }
    }

    /// Remap the extension of `kind`, such as `.ttml` to `.xml`
    pub fn set(&mut self, kind: FormatKind, extension: &str) {
        let extension = with_dot(extension);
        match kind {
            FormatKind::Srt => self.srt = extension,
            FormatKind::Sub => self.sub = extension,
            FormatKind::Ttml => self.ttml = extension,
            FormatKind::Vtt => self.vtt = extension,
        }
    }

    /// Builder form of [`set`](Self::set)
    #[must_use]
    pub fn with(mut self, kind: FormatKind, extension: &str) -> Self {
        self.set(kind, extension);
        self
    }

    /// Format whose extension is `extension`, dot optional, any case
    #[must_use]
    pub fn kind_for(&self, extension: &str) -> Option<FormatKind> {
        let extension = with_dot(extension);
        FormatKind::ALL
            .into_iter()
            .find(|kind| self.extension(*kind).eq_ignore_ascii_case(&extension))
    }

    /// Format of a path, judged by its extension
    #[must_use]
    pub fn kind_for_path(&self, path: &Path) -> Option<FormatKind> {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(|extension| self.kind_for(extension))
    }

    /// Output filename for `base` in format `kind`
    ///
    /// A trailing extension of `kind` on `base` is replaced rather than
    /// doubled. With `include_languages`, language components already in
    /// the name are moved to the end so `movie.en` with `["en", "fr"]`
    /// becomes `movie.en.fr.srt`; other components are kept.
    #[must_use]
    pub fn make_filename(
        &self,
        base: &Path,
        kind: FormatKind,
        languages: &[String],
        include_languages: bool,
    ) -> PathBuf {
        let extension = self.extension(kind);
        let name = base
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = if name.len() > extension.len()
            && name.to_ascii_lowercase().ends_with(&extension.to_ascii_lowercase())
        {
            &name[..name.len() - extension.len()]
        } else {
            name.as_str()
        };

        let mut filename = if include_languages && !languages.is_empty() {
            let mut parts: Vec<&str> = stem
                .split('.')
                .enumerate()
                .filter(|(index, part)| *index == 0 || !languages.iter().any(|lang| lang == part))
                .map(|(_, part)| part)
                .collect();
            parts.extend(languages.iter().map(String::as_str));
            parts.join(".")
        } else {
            stem.to_string()
        };
        filename.push_str(extension);
        base.with_file_name(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|tag| (*tag).to_string()).collect()
    }

    #[test]
    fn filenames_carry_languages() {
        let extensions = FileExtensions::default();
        let path = extensions.make_filename(
            Path::new("out/movie"),
            FormatKind::Srt,
            &langs(&["en", "fr"]),
            true,
        );
        assert_eq!(path, Path::new("out/movie.en.fr.srt"));

        let path = extensions.make_filename(
            Path::new("movie.final.en.vtt"),
            FormatKind::Vtt,
            &langs(&["en"]),
            true,
        );
        assert_eq!(path, Path::new("movie.final.en.vtt"));

        let path =
            extensions.make_filename(Path::new("movie.srt"), FormatKind::Srt, &langs(&["en"]), false);
        assert_eq!(path, Path::new("movie.srt"));
    }

    #[test]
    fn remapped_extension_is_used_both_ways() {
        let extensions = FileExtensions::default().with(FormatKind::Ttml, "xml");
        assert_eq!(extensions.kind_for(".XML"), Some(FormatKind::Ttml));
        assert_eq!(extensions.kind_for("ttml"), None);
        let path = extensions.make_filename(Path::new("a"), FormatKind::Ttml, &langs(&["de"]), true);
        assert_eq!(path, Path::new("a.de.xml"));
    }
}
