//! Phrase segmentation

use unicode_segmentation::UnicodeSegmentation;

use crate::utils::language::primary_subtag;

/// Languages written without spaces between words
const UNSPACED_LANGUAGES: &[&str] = &["ja", "zh", "yue", "wuu", "th", "lo", "km", "my", "bo"];

/// Splits text into the units the reflow engine never breaks inside
pub trait PhraseSegmenter {
    /// Phrases of `text` in order
    fn segment(&self, text: &str, language: &str) -> Vec<String>;

    /// String placed between phrases when they share a line
    fn separator(&self, language: &str) -> &'static str;
}

/// Whitespace tokens for spaced scripts, Unicode word boundaries otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSegmenter;

/// Whether `language` is written without inter-word spaces
#[must_use]
pub fn is_unspaced_language(language: &str) -> bool {
    UNSPACED_LANGUAGES.contains(&primary_subtag(language).as_str())
}

impl PhraseSegmenter for DefaultSegmenter {
    fn segment(&self, text: &str, language: &str) -> Vec<String> {
        if !is_unspaced_language(language) {
            return text.split_whitespace().map(str::to_string).collect();
        }

        // Whitespace stays attached to the preceding phrase so joining with
        // an empty separator reproduces the text
        let mut phrases: Vec<String> = Vec::new();
        for token in text.trim().split_word_bounds() {
            let is_space = token.chars().all(char::is_whitespace);
            match phrases.last_mut() {
                Some(last) if is_space => last.push_str(token),
                _ if is_space => {}
                _ => phrases.push(token.to_string()),
            }
        }
        phrases
    }

    fn separator(&self, language: &str) -> &'static str {
        if is_unspaced_language(language) {
            ""
        } else {
            " "
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaced_languages_split_on_whitespace() {
        let phrases = DefaultSegmenter.segment("  hello   big world ", "en-US");
        assert_eq!(phrases, ["hello", "big", "world"]);
        assert_eq!(DefaultSegmenter.separator("en"), " ");
    }

    #[test]
    fn cjk_splits_without_separator() {
        let phrases = DefaultSegmenter.segment("日本語です", "ja");
        assert!(phrases.len() > 1);
        assert_eq!(phrases.concat(), "日本語です");
        assert_eq!(DefaultSegmenter.separator("zh-Hant"), "");
    }
}
