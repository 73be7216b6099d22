//! Language tag normalisation
//!
//! Tags are treated as BCP 47 shaped strings: a 2–3 letter primary subtag
//! followed by optional script, region and variant subtags. Anything else
//! degrades to [`UNDEFINED_LANGUAGE`].

use std::path::Path;

/// Tag used when no valid language is known
pub const UNDEFINED_LANGUAGE: &str = "und";

/// Deprecated, three-letter and macrolanguage codes with a preferred form
const PREFERRED_PRIMARY: &[(&str, &str)] = &[
    ("ara", "ar"),
    ("arb", "ar"),
    ("chi", "zh"),
    ("cmn", "zh"),
    ("deu", "de"),
    ("dut", "nl"),
    ("eng", "en"),
    ("fra", "fr"),
    ("fre", "fr"),
    ("ger", "de"),
    ("hin", "hi"),
    ("in", "id"),
    ("ita", "it"),
    ("iw", "he"),
    ("ji", "yi"),
    ("jpn", "ja"),
    ("jw", "jv"),
    ("kor", "ko"),
    ("mo", "ro"),
    ("nld", "nl"),
    ("pes", "fa"),
    ("pol", "pl"),
    ("por", "pt"),
    ("rus", "ru"),
    ("spa", "es"),
    ("swe", "sv"),
    ("tha", "th"),
    ("tur", "tr"),
    ("vie", "vi"),
    ("zho", "zh"),
    ("zsm", "ms"),
];

/// Normalise a language tag, degrading to `und` when it is not valid
///
/// Case is canonicalised (`en-us` becomes `en-US`, `zh-hant` becomes
/// `zh-Hant`), underscores are accepted as separators and preferred primary
/// codes replace deprecated or three-letter ones.
///
/// # Example
///
/// ```rust
/// use caption_core::utils::normalize_language;
///
/// assert_eq!(normalize_language("eng"), "en");
/// assert_eq!(normalize_language("pt_br"), "pt-BR");
/// assert_eq!(normalize_language("not a tag"), "und");
/// ```
#[must_use]
pub fn normalize_language(tag: &str) -> String {
    try_normalize(tag).unwrap_or_else(|| UNDEFINED_LANGUAGE.to_string())
}

/// Whether `tag` is a well formed language tag
#[must_use]
pub fn is_valid_language(tag: &str) -> bool {
    try_normalize(tag).is_some()
}

/// Primary subtag of a tag, lowercased
#[must_use]
pub fn primary_subtag(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn try_normalize(tag: &str) -> Option<String> {
    let tag = tag.trim();
    let mut subtags = tag.split(['-', '_']);
    let primary = subtags.next()?.to_ascii_lowercase();
    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let primary = PREFERRED_PRIMARY
        .iter()
        .find(|(from, _)| *from == primary)
        .map_or(primary.clone(), |(_, to)| (*to).to_string());

    let mut out = primary;
    for subtag in subtags {
        if subtag.is_empty() || subtag.len() > 8 || !subtag.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }
        out.push('-');
        match subtag.len() {
            4 if subtag.chars().all(|c| c.is_ascii_alphabetic()) => {
                let mut chars = subtag.chars();
                if let Some(first) = chars.next() {
                    out.push(first.to_ascii_uppercase());
                }
                out.extend(chars.map(|c| c.to_ascii_lowercase()));
            }
            2 if subtag.chars().all(|c| c.is_ascii_alphabetic()) => {
                out.push_str(&subtag.to_ascii_uppercase());
            }
            _ => out.push_str(&subtag.to_ascii_lowercase()),
        }
    }
    Some(out)
}

/// Languages encoded in a filename such as `movie.en.fr.srt`
///
/// The first dot-separated component is the base name and the last one is
/// the extension; neither is ever taken as a language.
#[must_use]
pub fn languages_from_filename(path: &Path) -> Vec<String> {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    stem.split('.')
        .skip(1)
        .filter(|part| is_valid_language(part))
        .map(ToString::to_string)
        .collect()
}
