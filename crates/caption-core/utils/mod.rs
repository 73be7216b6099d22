//! Utility functions and shared types for caption-core
//!
//! Contains functionality shared by the time model, the style bridge and the
//! format codecs: error types, colour conversion, language tag handling and
//! hash map construction.
//!
//! # Example
//!
//! ```rust
//! use caption_core::utils::{normalize_language, Color};
//!
//! let blue = Color::from_bgr_hex("$FF0000")?;
//! assert_eq!(blue.to_hex(), "#0000FF");
//! assert_eq!(normalize_language("EN-us"), "en-US");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod color;
pub mod errors;
pub mod hashers;
pub mod language;

pub use color::Color;
pub use errors::{CoreError, ParseError, Result};
pub use hashers::{create_hash_map, HashMap};
pub use language::{languages_from_filename, normalize_language, UNDEFINED_LANGUAGE};

/// Split `input` into lines the way every line oriented codec sees them
///
/// Handles `\n`, `\r\n` and a leading byte order mark.
#[must_use]
pub fn normalize_line(line: &str) -> &str {
    let line = line.strip_prefix('\u{feff}').unwrap_or(line);
    line.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_line_strips_terminators_and_bom() {
        assert_eq!(normalize_line("\u{feff}WEBVTT\r\n"), "WEBVTT");
        assert_eq!(normalize_line("text\n"), "text");
        assert_eq!(normalize_line("  keep  "), "  keep  ");
    }
}
