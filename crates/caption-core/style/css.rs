//! Minimal CSS handling for caption styles
//!
//! Covers what caption formats put in stylesheets: flat rules made of a
//! selector list and `property: value` declarations. Comments are dropped;
//! at-rules and nesting are not supported and are kept as opaque rules.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{SpanStyle, TextFlags};
use crate::utils::Color;

/// One `selector { declarations }` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssRule {
    pub selector: String,
    pub declarations: Vec<(String, String)>,
}

/// Parse `prop: value; prop: value`
///
/// Property names are lowercased; values keep their case.
#[must_use]
pub fn parse_declarations(text: &str) -> Vec<(String, String)> {
    text.split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some((property, value.to_string()))
        })
        .collect()
}

/// Render declarations as `prop: value; prop: value`
#[must_use]
pub fn format_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{property}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = rest[start + 2..]
            .find("*/")
            .map_or("", |end| &rest[start + 2 + end + 2..]);
    }
    out.push_str(rest);
    out
}

/// Parse a stylesheet into rules
#[must_use]
pub fn parse_stylesheet(text: &str) -> Vec<CssRule> {
    let text = strip_comments(text);
    let mut rules = Vec::new();
    let mut rest = text.as_str();
    while let Some(open) = rest.find('{') {
        let selector = rest[..open].trim();
        let body = &rest[open + 1..];
        let (declarations, next) = match body.find('}') {
            Some(close) => (&body[..close], &body[close + 1..]),
            None => (body, ""),
        };
        if !selector.is_empty() {
            rules.push(CssRule {
                selector: selector.split_whitespace().collect::<Vec<_>>().join(" "),
                declarations: parse_declarations(declarations),
            });
        }
        rest = next;
    }
    rules
}

/// Render rules in a stable layout
#[must_use]
pub fn format_stylesheet(rules: &[CssRule]) -> String {
    rules
        .iter()
        .map(|rule| {
            let body: String = rule
                .declarations
                .iter()
                .map(|(property, value)| format!("  {property}: {value};\n"))
                .collect();
            format!("{} {{\n{body}}}", rule.selector)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn id_selector_regex() -> &'static Regex {
    static ID: OnceLock<Regex> = OnceLock::new();
    ID.get_or_init(|| {
        Regex::new(r"#([^\s.#:\[\]()>+~,{}]+)")
            .unwrap_or_else(|_| unreachable!("id selector pattern is valid"))
    })
}

/// Every `#id` in a selector
#[must_use]
pub fn selector_ids(selector: &str) -> Vec<&str> {
    id_selector_regex()
        .captures_iter(selector)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str()))
        .collect()
}

/// Rewrite the `#id` selectors of a single selector string
pub fn rename_selector_ids(selector: &str, mut rename: impl FnMut(&str) -> Option<String>) -> String {
    id_selector_regex()
        .replace_all(selector, |captures: &regex::Captures<'_>| {
            let id = captures.get(1).map_or("", |m| m.as_str());
            format!("#{}", rename(id).unwrap_or_else(|| id.to_string()))
        })
        .into_owned()
}

/// Rewrite `#id` selectors of a stylesheet, leaving declarations untouched
///
/// Ids for which `rename` returns `None` are kept.
pub fn rename_ids(css: &str, mut rename: impl FnMut(&str) -> Option<String>) -> String {
    let rules: Vec<CssRule> = parse_stylesheet(css)
        .into_iter()
        .map(|rule| CssRule {
            selector: rename_selector_ids(&rule.selector, &mut rename),
            declarations: rule.declarations,
        })
        .collect();
    format_stylesheet(&rules)
}

/// Target of a `::cue(...)` selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueTarget<'a> {
    /// `::cue` with no argument
    All,
    /// `::cue(#id)`
    Id(&'a str),
    /// `::cue(.class)` or `::cue(tag.class)`
    Class(&'a str),
    /// Anything else
    Other(&'a str),
}

/// Targets of a selector list such as `::cue(.a), ::cue(#b)`
#[must_use]
pub fn cue_targets(selector: &str) -> Vec<CueTarget<'_>> {
    selector
        .split(',')
        .map(|part| {
            let part = part.trim();
            let Some(inner) = part.strip_prefix("::cue") else {
                return CueTarget::Other(part);
            };
            let inner = inner.trim();
            if inner.is_empty() {
                return CueTarget::All;
            }
            let Some(argument) = inner.strip_prefix('(').and_then(|i| i.strip_suffix(')')) else {
                return CueTarget::Other(part);
            };
            let argument = argument.trim();
            if let Some(id) = argument.strip_prefix('#') {
                CueTarget::Id(id)
            } else if let Some((_, class)) = argument.split_once('.') {
                if class.contains(['.', ' ', ':', '#']) {
                    CueTarget::Other(part)
                } else {
                    CueTarget::Class(class)
                }
            } else {
                CueTarget::Other(part)
            }
        })
        .collect()
}

/// Apply one CSS declaration to a span style
///
/// Properties without a dedicated field go to `style.extra`. An
/// unparseable colour is dropped with a warning.
pub fn apply_declaration(style: &mut SpanStyle, property: &str, value: &str) {
    let lower = value.trim().to_ascii_lowercase();
    match property {
        "color" => match Color::parse(value) {
            Ok(color) => style.color = Some(color),
            Err(err) => log::warn!("Dropping colour: {err}"),
        },
        "font-weight" => {
            let numeric = lower.parse::<u32>().ok();
            if lower == "bold" || lower == "bolder" || numeric.is_some_and(|weight| weight >= 600) {
                style.flags |= TextFlags::BOLD;
            } else {
                style.flags.remove(TextFlags::BOLD);
            }
        }
        "font-style" => {
            if lower == "italic" || lower == "oblique" {
                style.flags |= TextFlags::ITALIC;
            } else {
                style.flags.remove(TextFlags::ITALIC);
            }
        }
        "text-decoration" | "text-decoration-line" => {
            style.flags.set(TextFlags::UNDERLINE, lower.contains("underline"));
            style
                .flags
                .set(TextFlags::STRIKETHROUGH, lower.contains("line-through"));
            if lower.contains("overline") {
                style.extra.insert("text-decoration-overline".to_string(), "overline".to_string());
            }
        }
        "font-family" => {
            style.font_family = Some(value.trim().trim_matches(['"', '\'']).to_string());
        }
        "font-size" => style.font_size = Some(value.trim().to_string()),
        _ => {
            style
                .extra
                .insert(property.to_string(), value.trim().to_string());
        }
    }
}

/// Apply a declaration list in order
pub fn apply_declarations(style: &mut SpanStyle, declarations: &[(String, String)]) {
    for (property, value) in declarations {
        apply_declaration(style, property, value);
    }
}

/// CSS declarations describing `style`
///
/// Classes and keys that are not CSS property names (anything with a `:`)
/// are left out.
#[must_use]
pub fn declarations_for(style: &SpanStyle) -> Vec<(String, String)> {
    let mut declarations = Vec::new();
    if let Some(color) = style.color {
        declarations.push(("color".to_string(), color.to_hex()));
    }
    if let Some(family) = &style.font_family {
        let family = if family.contains(' ') {
            format!("\"{family}\"")
        } else {
            family.clone()
        };
        declarations.push(("font-family".to_string(), family));
    }
    if let Some(size) = &style.font_size {
        declarations.push(("font-size".to_string(), size.clone()));
    }
    if style.flags.contains(TextFlags::BOLD) {
        declarations.push(("font-weight".to_string(), "bold".to_string()));
    }
    if style.flags.contains(TextFlags::ITALIC) {
        declarations.push(("font-style".to_string(), "italic".to_string()));
    }
    let mut decorations = Vec::new();
    if style.flags.contains(TextFlags::UNDERLINE) {
        decorations.push("underline");
    }
    if style.flags.contains(TextFlags::STRIKETHROUGH) {
        decorations.push("line-through");
    }
    if style.extra.contains_key("text-decoration-overline") {
        decorations.push("overline");
    }
    if !decorations.is_empty() {
        declarations.push(("text-decoration".to_string(), decorations.join(" ")));
    }
    for (property, value) in &style.extra {
        if !property.contains(':') && property != "text-decoration-overline" {
            declarations.push((property.clone(), value.clone()));
        }
    }
    declarations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_parses_rules() {
        let css = "/* speaker */ ::cue(#one) { color: red; font-weight: bold }\n::cue(.loud) {font-size:120%;}";
        let rules = parse_stylesheet(css);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].selector, "::cue(#one)");
        assert_eq!(rules[0].declarations[1], ("font-weight".to_string(), "bold".to_string()));
        assert_eq!(cue_targets(&rules[1].selector), [CueTarget::Class("loud")]);
    }

    #[test]
    fn renaming_touches_only_selectors() {
        let css = "::cue(#a) { color: #ff0000; }";
        let renamed = rename_ids(css, |id| (id == "a").then(|| "style1".to_string()));
        assert_eq!(renamed, "::cue(#style1) {\n  color: #ff0000;\n}");
    }

    #[test]
    fn declarations_map_to_span_fields() {
        let mut style = SpanStyle::plain();
        apply_declarations(
            &mut style,
            &parse_declarations("color: #00ff00; font-style: italic; text-decoration: underline; font-family: 'Open Sans'; opacity: 0.5"),
        );
        assert_eq!(style.color, Some(Color::new(0, 255, 0)));
        assert!(style.flags.contains(TextFlags::ITALIC | TextFlags::UNDERLINE));
        assert_eq!(style.font_family.as_deref(), Some("Open Sans"));
        assert_eq!(style.extra["opacity"], "0.5");

        let mut back = SpanStyle::plain();
        apply_declarations(&mut back, &declarations_for(&style));
        assert_eq!(back, style);
    }

    #[test]
    fn bad_colour_is_dropped() {
        let mut style = SpanStyle::plain();
        apply_declaration(&mut style, "color", "not-a-colour");
        assert!(style.color.is_none());
    }
}
