//! MicroDVD control codes
//!
//! Codes are written `{X:value}`. Upper case codes apply to every line of
//! the cue, lower case ones to the line they appear on. `Y` (b, i, u, s),
//! `F`, `S`, `C` and `H` are understood; anything else is kept verbatim
//! under a `micro_dvd_N` class registered in [`MicroDvdCodes`].

use std::sync::OnceLock;

use regex::Regex;

use super::point_size;
use crate::model::options::MICRO_DVD_CLASS_PREFIX;
use crate::model::{MicroDvdCodes, Segment, SpanStyle, StyledText, TextFlags};
use crate::utils::Color;

const STYLE_FLAGS: [(char, TextFlags); 4] = [
    ('b', TextFlags::BOLD),
    ('i', TextFlags::ITALIC),
    ('u', TextFlags::UNDERLINE),
    ('s', TextFlags::STRIKETHROUGH),
];

fn code_regex() -> &'static Regex {
    static CODE: OnceLock<Regex> = OnceLock::new();
    CODE.get_or_init(|| {
        Regex::new(r"\{([A-Za-z]):([^{}]*)\}")
            .unwrap_or_else(|_| unreachable!("control code pattern is valid"))
    })
}

enum Piece<'a> {
    Text(&'a str),
    Code { letter: char, value: &'a str },
}

fn pieces(line: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for captures in code_regex().captures_iter(line) {
        let (Some(whole), Some(letter), Some(value)) = (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        if whole.start() > last {
            pieces.push(Piece::Text(&line[last..whole.start()]));
        }
        last = whole.end();
        if let Some(letter) = letter.as_str().chars().next() {
            pieces.push(Piece::Code {
                letter,
                value: value.as_str(),
            });
        }
    }
    if last < line.len() {
        pieces.push(Piece::Text(&line[last..]));
    }
    pieces
}

/// A code this module maps onto span attributes
fn is_known(letter: char, value: &str) -> bool {
    match letter.to_ascii_uppercase() {
        'Y' | 'F' | 'S' | 'H' => true,
        'C' => Color::from_bgr_hex(value).is_ok(),
        _ => false,
    }
}

fn apply_code(style: &mut SpanStyle, letter: char, value: &str) {
    match letter.to_ascii_uppercase() {
        'Y' => {
            for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
                match STYLE_FLAGS.iter().find(|(code, _)| name.eq_ignore_ascii_case(&code.to_string())) {
                    Some((_, flag)) => style.flags |= *flag,
                    None => log::warn!("Ignoring MicroDVD style {name}"),
                }
            }
        }
        'F' => style.font_family = Some(value.trim().to_string()),
        'S' => style.font_size = Some(format!("{}pt", value.trim())),
        'C' => {
            if let Ok(color) = Color::from_bgr_hex(value) {
                style.color = Some(color);
            }
        }
        _ => {}
    }
}

/// Text of one MicroDVD cue or column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubText {
    pub text: StyledText,
    /// Value of an `H` code
    pub language: Option<String>,
}

/// Parse MicroDVD text, `|` separating lines
///
/// Upper case codes are registered in `codes` as one class per line that
/// every following span of the cue carries, so the cue scope survives a
/// round trip. Unrecognised lower case codes get a class of their own on
/// the line they govern. Registered codes keep their letter case.
pub fn from_sub(text: &str, codes: &mut MicroDvdCodes) -> SubText {
    let mut result = SubText::default();
    let mut cue_style = SpanStyle::plain();
    for (index, line) in text.split('|').enumerate() {
        if index > 0 {
            result.text.push_line_break();
        }
        let pieces = pieces(line);

        let mut cue_codes = Vec::new();
        let mut line_opaque = Vec::new();
        for piece in &pieces {
            if let Piece::Code { letter, value } = piece {
                if letter.eq_ignore_ascii_case(&'H') {
                    continue;
                }
                let code = (letter.to_string(), (*value).to_string());
                if letter.is_ascii_uppercase() {
                    cue_codes.push(code);
                } else if !is_known(*letter, value) {
                    line_opaque.push(code);
                }
            }
        }
        if !cue_codes.is_empty() {
            let class = codes.register(cue_codes);
            cue_style = cue_style.with_class(&class);
        }
        let mut line_style = cue_style.clone();
        if !line_opaque.is_empty() {
            line_style = line_style.with_class(&codes.register(line_opaque));
        }

        for piece in pieces {
            match piece {
                Piece::Text(text) => result.text.push_text(text, line_style.clone()),
                Piece::Code { letter, value } => {
                    if letter.eq_ignore_ascii_case(&'H') {
                        result.language = Some(value.trim().to_string());
                    } else if is_known(letter, value) {
                        apply_code(&mut line_style, letter, value);
                        if letter.is_ascii_uppercase() {
                            apply_code(&mut cue_style, letter, value);
                        }
                    }
                }
            }
        }
    }
    result
}

/// Whether a registered class holds cue scope codes
fn is_cue_class(class: &str, codes: &MicroDvdCodes) -> bool {
    class.starts_with(MICRO_DVD_CLASS_PREFIX)
        && codes.codes(class).is_some_and(|stored| {
            !stored.is_empty()
                && stored
                    .iter()
                    .all(|(code, _)| code.chars().all(|c| c.is_ascii_uppercase()))
        })
}

/// Attributes of a span as MicroDVD codes
#[derive(Debug, Clone, Default, PartialEq)]
struct CodeSet {
    flags: TextFlags,
    font: Option<String>,
    size: Option<String>,
    color: Option<Color>,
    opaque: Vec<(String, String)>,
}

impl CodeSet {
    /// Line scope codes of `style`; classes in `cue_classes` are left out
    fn of(style: &SpanStyle, codes: &MicroDvdCodes, cue_classes: &[String]) -> Self {
        let opaque = style
            .classes
            .iter()
            .filter(|class| class.starts_with(MICRO_DVD_CLASS_PREFIX) && !cue_classes.contains(class))
            .filter_map(|class| codes.codes(class))
            .flatten()
            .filter(|(code, value)| {
                !code
                    .chars()
                    .next()
                    .is_some_and(|letter| is_known(letter, value))
            })
            .cloned()
            .collect();
        Self {
            flags: style.flags,
            font: style.font_family.clone(),
            size: style
                .font_size
                .as_deref()
                .and_then(point_size)
                .map(str::to_string),
            color: style.color,
            opaque,
        }
    }

    fn without(&self, other: &Self) -> Self {
        Self {
            flags: self.flags - other.flags,
            font: self.font.clone().filter(|font| other.font.as_ref() != Some(font)),
            size: self.size.clone().filter(|size| other.size.as_ref() != Some(size)),
            color: self.color.filter(|color| other.color != Some(*color)),
            opaque: self
                .opaque
                .iter()
                .filter(|code| !other.opaque.contains(code))
                .cloned()
                .collect(),
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Line scope rendering, every letter in lower case
    fn render(&self) -> String {
        let mut out = String::new();
        let styles: Vec<String> = STYLE_FLAGS
            .iter()
            .filter(|(_, flag)| self.flags.contains(*flag))
            .map(|(code, _)| code.to_string())
            .collect();
        if !styles.is_empty() {
            out.push_str(&format!("{{y:{}}}", styles.join(",")));
        }
        if let Some(font) = &self.font {
            out.push_str(&format!("{{f:{font}}}"));
        }
        if let Some(size) = &self.size {
            out.push_str(&format!("{{s:{size}}}"));
        }
        if let Some(color) = self.color {
            out.push_str(&format!("{{c:{}}}", color.to_bgr_hex()));
        }
        for (code, value) in &self.opaque {
            out.push_str(&format!("{{{}:{value}}}", code.to_ascii_lowercase()));
        }
        out
    }
}

/// Cue scope prefix of `spans` and the style it implies
///
/// A cue class counts only when every span carries it, and a recognised
/// code in it only while every span still has the attribute it sets.
fn cue_prefix(spans: &[&SpanStyle], codes: &MicroDvdCodes) -> (Vec<String>, String, SpanStyle) {
    let Some(first) = spans.first() else {
        return (Vec::new(), String::new(), SpanStyle::plain());
    };
    let cue_classes: Vec<String> = first
        .classes
        .iter()
        .filter(|class| is_cue_class(class, codes))
        .filter(|class| spans.iter().all(|style| style.classes.contains(class)))
        .cloned()
        .collect();

    let mut prefix = String::new();
    let mut implied = SpanStyle::plain();
    for (code, value) in cue_classes
        .iter()
        .filter_map(|class| codes.codes(class))
        .flatten()
    {
        let Some(letter) = code.chars().next() else {
            continue;
        };
        if is_known(letter, value) {
            let holds = spans.iter().all(|style| {
                let mut applied = (*style).clone();
                apply_code(&mut applied, letter, value);
                applied == **style
            });
            if !holds {
                continue;
            }
            apply_code(&mut implied, letter, value);
        }
        prefix.push_str(&format!("{{{code}:{value}}}"));
    }
    (cue_classes, prefix, implied)
}

/// Render styled text as MicroDVD
///
/// Lines are joined with `|`, or with a space when `single_line` is set.
/// Cue scope codes recorded by [`from_sub`] are written once in upper case;
/// everything else is written per line in lower case. A span that drops an
/// attribute of the span before it cannot be expressed and keeps it.
#[must_use]
pub fn to_sub(text: &StyledText, codes: &MicroDvdCodes, single: bool) -> String {
    let flattened;
    let text = if single {
        flattened = text.single_line();
        &flattened
    } else {
        text
    };

    let spans: Vec<&SpanStyle> = text
        .segments()
        .iter()
        .filter_map(|segment| match segment {
            Segment::Text { style, .. } => Some(style),
            Segment::LineBreak => None,
        })
        .collect();
    let (cue_classes, prefix, implied) = cue_prefix(&spans, codes);
    let cue = CodeSet::of(&implied, codes, &cue_classes);

    let rendered: Vec<String> = text
        .lines()
        .map(|line| {
            let mut out = String::new();
            let mut previous = cue.clone();
            for segment in line {
                if let Segment::Text { text, style } = segment {
                    let set = CodeSet::of(style, codes, &cue_classes);
                    if !previous.without(&set).is_empty() {
                        log::warn!("MicroDVD cannot end a style mid-line; \"{text}\" keeps it");
                    }
                    out.push_str(&set.without(&previous).render());
                    out.push_str(text);
                    previous = set;
                }
            }
            out
        })
        .collect();
    let mut out = prefix;
    out.push_str(&rendered.join("|"));
    out
}
