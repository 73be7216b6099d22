//! Text reflow
//!
//! Splits one language's text into display lines under a per-line
//! character budget. Each line `i` gets `floor(character_limit * ratio)`
//! characters where `ratio` is `split_ratios[i]`, repeating the last ratio
//! for lines beyond the list. The defaults (47 characters, `[0.7, 1.0]`)
//! give a shorter first line, which reads better for bottom aligned
//! captions.
//!
//! # Example
//!
//! ```rust
//! use caption_core::reflow::{reflow, ReflowOptions};
//!
//! let text = "The quick brown fox jumps over the lazy dog while the cat watches";
//! let lines = reflow(text, "en", &ReflowOptions::new(2));
//! assert_eq!(lines.len(), 2);
//! assert_eq!(lines.join(" "), text);
//!
//! assert_eq!(reflow(text, "en", &ReflowOptions::new(1)), vec![text.to_string()]);
//! ```

pub mod segment;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use segment::{DefaultSegmenter, PhraseSegmenter};

/// Characters per line used when nothing else is configured
pub const DEFAULT_CHARACTER_LIMIT: usize = 47;

/// Per-line budget ratios used when nothing else is configured
pub const DEFAULT_SPLIT_RATIOS: [f64; 2] = [0.7, 1.0];

/// Reflow parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ReflowOptions {
    /// Target line count; `0` picks one automatically, `1` disables wrapping
    pub lines: usize,
    /// Characters per line before ratios apply
    pub character_limit: usize,
    /// Budget ratio per line, the last one repeating
    pub split_ratios: Vec<f64>,
}

impl Default for ReflowOptions {
    fn default() -> Self {
        Self {
            lines: 0,
            character_limit: DEFAULT_CHARACTER_LIMIT,
            split_ratios: DEFAULT_SPLIT_RATIOS.to_vec(),
        }
    }
}

impl ReflowOptions {
    /// Default budget for `lines` lines
    #[must_use]
    pub fn new(lines: usize) -> Self {
        Self {
            lines,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_character_limit(mut self, character_limit: usize) -> Self {
        self.character_limit = character_limit;
        self
    }

    /// Replace the ratios; an empty list falls back to the defaults
    #[must_use]
    pub fn with_split_ratios(mut self, split_ratios: Vec<f64>) -> Self {
        self.split_ratios = if split_ratios.is_empty() {
            DEFAULT_SPLIT_RATIOS.to_vec()
        } else {
            split_ratios
        };
        self
    }

    fn ratio(ratios: &[f64], line: usize) -> f64 {
        ratios
            .get(line.min(ratios.len().saturating_sub(1)))
            .copied()
            .unwrap_or(1.0)
    }

    fn budget(&self, ratios: &[f64], line: usize) -> usize {
        (self.character_limit as f64 * Self::ratio(ratios, line)).floor() as usize
    }
}

/// Reflow with the default segmenter
#[must_use]
pub fn reflow(text: &str, language: &str, options: &ReflowOptions) -> Vec<String> {
    reflow_with(text, language, options, &DefaultSegmenter)
}

/// Reflow `text` into display lines
///
/// Pure and deterministic. Phrases are never split, so a line may exceed
/// its budget when a single phrase does, and the last phrase always joins
/// the current line rather than starting an orphan line. The returned line
/// count can therefore exceed `options.lines`.
#[must_use]
pub fn reflow_with(
    text: &str,
    language: &str,
    options: &ReflowOptions,
    segmenter: &dyn PhraseSegmenter,
) -> Vec<String> {
    if options.lines == 1 {
        return vec![text.to_string()];
    }
    let phrases = segmenter.segment(text, language);
    if phrases.is_empty() {
        return Vec::new();
    }
    let separator = segmenter.separator(language);
    let separator_len = separator.chars().count();
    let length = text.chars().count();
    let ratios = fitted_ratios(options, length);

    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut count = 0;
    let last = phrases.len() - 1;
    for (index, phrase) in phrases.iter().enumerate() {
        let phrase_len = phrase.chars().count();
        let limit = options.budget(&ratios, lines.len());
        if current.is_empty() {
            current.push(phrase);
            count = phrase_len;
        } else if count + separator_len + phrase_len <= limit || index == last {
            current.push(phrase);
            count += separator_len + phrase_len;
        } else {
            lines.push(join_line(&current, separator));
            current = vec![phrase];
            count = phrase_len;
        }
    }
    if !current.is_empty() {
        lines.push(join_line(&current, separator));
    }
    lines
}

fn join_line(phrases: &[&str], separator: &str) -> String {
    phrases.join(separator).trim_end().to_string()
}

/// Ratios adjusted so `length` characters fit the requested line count
fn fitted_ratios(options: &ReflowOptions, length: usize) -> Vec<f64> {
    let ratios = if options.split_ratios.is_empty() {
        DEFAULT_SPLIT_RATIOS.to_vec()
    } else {
        options.split_ratios.clone()
    };
    if options.lines == 0 || options.character_limit == 0 {
        return ratios;
    }

    let lines = options.lines;
    let available: usize = (0..lines).map(|line| options.budget(&ratios, line)).sum();
    let needed = (length + 1).saturating_sub(lines);
    if available >= needed {
        return ratios;
    }

    let remainder = (needed - available) as f64 / (options.character_limit * lines) as f64;
    let mut inflated: Vec<f64> = (0..lines.max(ratios.len()))
        .map(|line| ReflowOptions::ratio(&ratios, line) + remainder)
        .collect();
    // Rounding down each budget can still leave a character or two short
    while (0..lines)
        .map(|line| options.budget(&inflated, line))
        .sum::<usize>()
        < needed
    {
        for ratio in &mut inflated {
            *ratio += 1.0 / options.character_limit as f64;
        }
    }
    inflated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_is_identity() {
        let options = ReflowOptions::new(1);
        assert_eq!(reflow("  keep   spacing ", "en", &options), ["  keep   spacing "]);
        assert_eq!(reflow("", "en", &options), [""]);
    }

    #[test]
    fn empty_autoformat_is_empty() {
        assert!(reflow("", "en", &ReflowOptions::new(0)).is_empty());
        assert!(reflow("   ", "en", &ReflowOptions::new(2)).is_empty());
    }

    #[test]
    fn autoformat_uses_default_budget() {
        let text = "short caption";
        assert_eq!(reflow(text, "en", &ReflowOptions::default()), [text]);

        let text = "this caption is long enough that the first line budget of thirty two characters is exceeded";
        let lines = reflow(text, "en", &ReflowOptions::default());
        assert!(lines.len() >= 2);
        assert!(lines[0].chars().count() <= 32);
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn last_phrase_is_never_orphaned() {
        let options = ReflowOptions::new(0)
            .with_character_limit(10)
            .with_split_ratios(vec![1.0]);
        let lines = reflow("aaaa bbbb cccc", "en", &options);
        assert_eq!(lines, ["aaaa bbbb cccc"]);
    }

    #[test]
    fn oversized_first_phrase_has_no_empty_line() {
        let options = ReflowOptions::new(0)
            .with_character_limit(4)
            .with_split_ratios(vec![1.0]);
        let lines = reflow("extraordinary word here", "en", &options);
        assert_eq!(lines[0], "extraordinary");
        assert!(lines.iter().all(|line| !line.is_empty()));
    }

    #[test]
    fn ratios_inflate_to_fit_line_count() {
        let options = ReflowOptions::new(2).with_character_limit(10);
        let text = "one two three four five six";
        let lines = reflow(text, "en", &options);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.join(" "), text);

        let ratios = fitted_ratios(&options, text.chars().count());
        assert!(ratios[0] > 0.7);
        assert!((ratios[1] - ratios[0] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn stable_across_calls() {
        let options = ReflowOptions::new(3).with_character_limit(12);
        let text = "repeatable output for identical input every time";
        assert_eq!(reflow(text, "en", &options), reflow(text, "en", &options));
    }

    #[test]
    fn cjk_lines_join_without_separator() {
        let options = ReflowOptions::new(2).with_character_limit(4).with_split_ratios(vec![1.0]);
        let text = "今日は良い天気ですね";
        let lines = reflow(text, "ja", &options);
        assert!(lines.len() >= 2);
        assert_eq!(lines.concat(), text);
    }
}
