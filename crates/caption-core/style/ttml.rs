//! TTML `tts:*` styling attributes
//!
//! Each attribute either maps to a CSS property, with a keyword table for
//! values that are spelled differently, or has no CSS counterpart. The
//! latter are kept in `SpanStyle::extra` under their `tts:` name and
//! written back untouched.

use std::collections::BTreeMap;

use super::css::{apply_declaration, declarations_for};
use crate::model::{SpanStyle, TextFlags};
use crate::utils::Color;

/// Styling namespace prefix used for attribute names
pub const TTS_PREFIX: &str = "tts:";

/// One row of the TTML to CSS property table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtmlProperty {
    /// Attribute name without the `tts:` prefix
    pub ttml: &'static str,
    /// CSS property, if there is one
    pub css: Option<&'static str>,
    /// `(ttml keyword, css keyword)` pairs
    pub values: &'static [(&'static str, &'static str)],
}

const COLOR_KEYWORDS: &[(&str, &str)] = &[("fuchsia", "magenta"), ("aqua", "cyan")];

const fn mapped(
    ttml: &'static str,
    css: &'static str,
    values: &'static [(&'static str, &'static str)],
) -> TtmlProperty {
    TtmlProperty {
        ttml,
        css: Some(css),
        values,
    }
}

const fn opaque(ttml: &'static str) -> TtmlProperty {
    TtmlProperty {
        ttml,
        css: None,
        values: &[],
    }
}

/// Every `tts:*` attribute this crate knows
pub const PROPERTIES: &[TtmlProperty] = &[
    mapped("backgroundClip", "background-clip", &[]),
    mapped("backgroundColor", "background-color", COLOR_KEYWORDS),
    mapped("backgroundExtent", "background-size", &[]),
    mapped("backgroundImage", "background-image", &[]),
    mapped("backgroundOrigin", "background-origin", &[]),
    mapped("backgroundPosition", "background-position", &[]),
    mapped(
        "backgroundRepeat",
        "background-repeat",
        &[("repeatX", "repeat-x"), ("repeatY", "repeat-y"), ("noRepeat", "no-repeat")],
    ),
    mapped("border", "border", &[]),
    opaque("bpd"),
    mapped("color", "color", COLOR_KEYWORDS),
    mapped("direction", "direction", &[]),
    opaque("disparity"),
    mapped("display", "display", &[("inlineBlock", "inline-block")]),
    opaque("displayAlign"),
    opaque("extent"),
    mapped("fontFamily", "font-family", &[]),
    mapped("fontKerning", "font-kerning", &[]),
    opaque("fontSelectionStrategy"),
    opaque("fontShear"),
    mapped("fontSize", "font-size", &[]),
    mapped("fontStyle", "font-style", &[]),
    opaque("fontVariant"),
    mapped("fontWeight", "font-weight", &[]),
    opaque("ipd"),
    mapped("letterSpacing", "letter-spacing", &[]),
    mapped("lineHeight", "line-height", &[]),
    opaque("lineShear"),
    opaque("luminanceGain"),
    mapped("opacity", "opacity", &[]),
    opaque("origin"),
    mapped("overflow", "overflow", &[]),
    mapped("padding", "padding", &[]),
    opaque("position"),
    mapped("ruby", "ruby", &[]),
    mapped(
        "rubyAlign",
        "ruby-align",
        &[("spaceAround", "space-around"), ("spaceBetween", "space-between")],
    ),
    opaque("rubyPosition"),
    opaque("rubyReserve"),
    opaque("shear"),
    opaque("showBackground"),
    mapped("textAlign", "text-align", &[]),
    mapped("textCombine", "text-combine-upright", &[]),
    mapped(
        "textDecoration",
        "text-decoration",
        &[
            ("lineThrough", "line-through"),
            ("noUnderline", "none"),
            ("noLineThrough", "none"),
            ("noOverline", "none"),
        ],
    ),
    mapped("textEmphasis", "text-emphasis", &[]),
    mapped(
        "textOrientation",
        "text-orientation",
        &[("sidewaysLeft", "sideways-left"), ("sidewaysRight", "sideways-right")],
    ),
    opaque("textOutline"),
    mapped("textShadow", "text-shadow", &[]),
    mapped(
        "unicodeBidi",
        "unicode-bidi",
        &[("bidiOverride", "bidi-override")],
    ),
    mapped("visibility", "visibility", &[]),
    opaque("wrapOption"),
    opaque("writingMode"),
    mapped("zIndex", "z-index", &[]),
];

/// Table row for a TTML attribute name, with or without the prefix
#[must_use]
pub fn property_by_ttml(name: &str) -> Option<&'static TtmlProperty> {
    let name = name.strip_prefix(TTS_PREFIX).unwrap_or(name);
    PROPERTIES.iter().find(|property| property.ttml == name)
}

/// Table row for a CSS property name
#[must_use]
pub fn property_by_css(name: &str) -> Option<&'static TtmlProperty> {
    PROPERTIES
        .iter()
        .find(|property| property.css == Some(name))
}

fn translate_words(value: &str, lookup: impl Fn(&str) -> Option<&'static str>) -> String {
    value
        .split_whitespace()
        .map(|word| lookup(word).unwrap_or(word))
        .collect::<Vec<_>>()
        .join(" ")
}

impl TtmlProperty {
    /// CSS spelling of a TTML value
    #[must_use]
    pub fn css_value(&self, value: &str) -> String {
        translate_words(value, |word| {
            self.values
                .iter()
                .find(|(ttml, _)| *ttml == word)
                .map(|(_, css)| *css)
        })
    }

    /// TTML spelling of a CSS value
    #[must_use]
    pub fn ttml_value(&self, value: &str) -> String {
        translate_words(value, |word| {
            self.values
                .iter()
                .find(|(_, css)| *css == word)
                .map(|(ttml, _)| *ttml)
        })
    }
}

/// Apply one `tts:*` attribute to a span style
///
/// `name` may carry the `tts:` prefix. Attributes outside the table, and
/// colours this crate cannot represent, are stored verbatim in `extra`.
pub fn apply_ttml_attribute(style: &mut SpanStyle, name: &str, value: &str) {
    let local = name.strip_prefix(TTS_PREFIX).unwrap_or(name);
    let key = format!("{TTS_PREFIX}{local}");
    let Some(property) = property_by_ttml(local) else {
        log::debug!("Keeping unknown TTML attribute {key}");
        style.extra.insert(key, value.to_string());
        return;
    };
    let Some(css) = property.css else {
        style.extra.insert(key, value.to_string());
        return;
    };
    let css_value = property.css_value(value);
    if css == "color" && Color::parse(&css_value).is_err() {
        style.extra.insert(key, value.to_string());
        return;
    }
    style.extra.remove(&key);
    apply_declaration(style, css, &css_value);
}

/// `base` with a set of TTML attributes applied in order
#[must_use]
pub fn style_from_attributes<'a>(
    base: &SpanStyle,
    attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> SpanStyle {
    let mut style = base.clone();
    for (name, value) in attributes {
        apply_ttml_attribute(&mut style, name, value);
    }
    style
}

/// `tts:*` attributes describing `style`
///
/// CSS properties without a TTML counterpart are dropped with a warning.
#[must_use]
pub fn ttml_attributes(style: &SpanStyle) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    for (css, value) in declarations_for(style) {
        match property_by_css(&css) {
            Some(property) => {
                let value = if css == "font-family" {
                    value.trim_matches('"').to_string()
                } else {
                    property.ttml_value(&value)
                };
                attributes.push((format!("{TTS_PREFIX}{}", property.ttml), value));
            }
            None => log::warn!("CSS property {css} has no TTML equivalent, dropping it"),
        }
    }
    for (key, value) in &style.extra {
        if key.starts_with(TTS_PREFIX) {
            attributes.push((key.clone(), value.clone()));
        }
    }
    attributes
}

/// Attributes needed on top of what `implied` (inherited or referenced
/// styles) already gives
#[must_use]
pub fn ttml_attributes_beyond(style: &SpanStyle, implied: &SpanStyle) -> Vec<(String, String)> {
    let inherited = ttml_attributes(implied);
    let mut attributes: Vec<(String, String)> = ttml_attributes(style)
        .into_iter()
        .filter(|attribute| !inherited.contains(attribute))
        .collect();

    let cleared = implied.flags - style.flags;
    if cleared.contains(TextFlags::BOLD) {
        attributes.push((format!("{TTS_PREFIX}fontWeight"), "normal".to_string()));
    }
    if cleared.contains(TextFlags::ITALIC) {
        attributes.push((format!("{TTS_PREFIX}fontStyle"), "normal".to_string()));
    }
    if cleared.intersects(TextFlags::UNDERLINE | TextFlags::STRIKETHROUGH)
        && !attributes.iter().any(|(name, _)| name == "tts:textDecoration")
    {
        let mut words = Vec::new();
        if cleared.contains(TextFlags::UNDERLINE) {
            words.push("noUnderline");
        }
        if cleared.contains(TextFlags::STRIKETHROUGH) {
            words.push("noLineThrough");
        }
        attributes.push((format!("{TTS_PREFIX}textDecoration"), words.join(" ")));
    }
    attributes
}

/// Property map stored in a style block: CSS names where one exists,
/// `tts:` names for the rest
#[must_use]
pub fn style_properties(style: &SpanStyle) -> BTreeMap<String, String> {
    let mut properties: BTreeMap<String, String> = declarations_for(style).into_iter().collect();
    for (key, value) in &style.extra {
        if key.starts_with(TTS_PREFIX) {
            properties.insert(key.clone(), value.clone());
        }
    }
    properties
}

/// Span style described by a stored property map
#[must_use]
pub fn style_from_properties(properties: &BTreeMap<String, String>) -> SpanStyle {
    let mut style = SpanStyle::plain();
    for (key, value) in properties {
        if key.starts_with(TTS_PREFIX) {
            apply_ttml_attribute(&mut style, key, value);
        } else {
            apply_declaration(&mut style, key, value);
        }
    }
    style
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_translate_both_ways() {
        let repeat = property_by_ttml("tts:backgroundRepeat").map(|p| p.css_value("repeatX"));
        assert_eq!(repeat.as_deref(), Some("repeat-x"));
        let back = property_by_css("background-repeat").map(|p| p.ttml_value("repeat-x"));
        assert_eq!(back.as_deref(), Some("repeatX"));
    }

    #[test]
    fn mapped_attributes_become_span_fields() {
        let style = style_from_attributes(
            &SpanStyle::plain(),
            [
                ("tts:color", "aqua"),
                ("tts:fontWeight", "bold"),
                ("tts:textDecoration", "underline lineThrough"),
                ("tts:textOutline", "black 1px"),
            ],
        );
        assert_eq!(style.color, Some(Color::new(0, 255, 255)));
        assert!(style.flags.contains(TextFlags::BOLD | TextFlags::UNDERLINE | TextFlags::STRIKETHROUGH));
        assert_eq!(style.extra["tts:textOutline"], "black 1px");
    }

    #[test]
    fn attributes_round_trip() {
        let source = [
            ("tts:color", "#FF0000"),
            ("tts:fontStyle", "italic"),
            ("tts:textDecoration", "lineThrough"),
            ("tts:backgroundRepeat", "repeatY"),
            ("tts:wrapOption", "noWrap"),
        ];
        let style = style_from_attributes(&SpanStyle::plain(), source);
        let mut written = ttml_attributes(&style);
        written.sort();
        let mut expected: Vec<(String, String)> = source
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        expected.sort();
        assert_eq!(written, expected);
    }

    #[test]
    fn unrepresentable_colour_is_kept() {
        let style = style_from_attributes(&SpanStyle::plain(), [("tts:color", "transparent")]);
        assert!(style.color.is_none());
        assert_eq!(
            ttml_attributes(&style),
            [("tts:color".to_string(), "transparent".to_string())]
        );
    }

    #[test]
    fn property_maps_round_trip() {
        let style = style_from_attributes(
            &SpanStyle::plain(),
            [("tts:color", "lime"), ("tts:textOutline", "black 2px")],
        );
        let properties = style_properties(&style);
        assert_eq!(properties["color"], "#00FF00");
        assert_eq!(properties["tts:textOutline"], "black 2px");
        assert_eq!(style_from_properties(&properties), style);
    }

    #[test]
    fn cleared_flags_are_written_explicitly() {
        let implied = SpanStyle::plain().with_flags(TextFlags::BOLD);
        let attributes = ttml_attributes_beyond(&SpanStyle::plain(), &implied);
        assert_eq!(attributes, [("tts:fontWeight".to_string(), "normal".to_string())]);
    }
}
