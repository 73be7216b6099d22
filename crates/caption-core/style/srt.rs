//! SRT inline markup: `<b>`, `<i>`, `<u>`, `<s>` and `<font>`

use std::borrow::Cow;

use super::markup::{build_styled, emit_nested, tokenize, TagPair};
use super::point_size;
use crate::model::{SpanStyle, StyledText, TextFlags};
use crate::utils::Color;

/// Parse SRT caption text into styled text
///
/// `<font color size face>` attributes become span attributes; sizes are
/// points. Unknown tags stay as literal text.
#[must_use]
pub fn from_srt(text: &str) -> StyledText {
    build_styled(
        &tokenize(text),
        SpanStyle::plain(),
        |tag, current| {
            let mut style = current.clone();
            match tag.name.as_str() {
                "b" => style.flags |= TextFlags::BOLD,
                "i" => style.flags |= TextFlags::ITALIC,
                "u" => style.flags |= TextFlags::UNDERLINE,
                "s" => style.flags |= TextFlags::STRIKETHROUGH,
                "font" => {
                    if let Some(color) = tag.attribute("color") {
                        match Color::parse(color) {
                            Ok(color) => style.color = Some(color),
                            Err(err) => log::warn!("Dropping SRT font colour: {err}"),
                        }
                    }
                    if let Some(size) = tag.attribute("size") {
                        style.font_size = Some(format!("{}pt", size.trim()));
                    }
                    if let Some(face) = tag.attribute("face") {
                        style.font_family = Some(face.trim().to_string());
                    }
                }
                _ => return None,
            }
            Some(style)
        },
        |text: &str| Cow::Borrowed(text),
    )
}

fn srt_tags(style: &SpanStyle) -> Vec<TagPair> {
    let mut tags = Vec::new();
    let mut font = String::new();
    if let Some(color) = style.color {
        font.push_str(&format!(" color=\"{}\"", color.to_hex()));
    }
    if let Some(size) = style.font_size.as_deref().and_then(point_size) {
        font.push_str(&format!(" size=\"{size}\""));
    }
    if let Some(face) = &style.font_family {
        font.push_str(&format!(" face=\"{face}\""));
    }
    if !font.is_empty() {
        tags.push(TagPair::new(format!("<font{font}>"), "</font>"));
    }
    for (flag, name) in [
        (TextFlags::BOLD, "b"),
        (TextFlags::ITALIC, "i"),
        (TextFlags::UNDERLINE, "u"),
        (TextFlags::STRIKETHROUGH, "s"),
    ] {
        if style.flags.contains(flag) {
            tags.push(TagPair::new(format!("<{name}>"), format!("</{name}>")));
        }
    }
    tags
}

/// Render styled text as SRT markup
///
/// Tags nest as `font > b > i > u > s`. Line breaks become `\n`, or a space
/// when `single_line` is set.
#[must_use]
pub fn to_srt(text: &StyledText, single_line: bool) -> String {
    emit_nested(
        text.segments(),
        srt_tags,
        |text: &str| Cow::Borrowed(text),
        if single_line { " " } else { "\n" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Segment;

    #[test]
    fn font_attributes_become_span_attributes() {
        let text = from_srt(r#"<font color="red" size="14" face="Arial">Hi</font> there"#);
        let Segment::Text { text: hi, style } = &text.segments()[0] else {
            panic!("expected text");
        };
        assert_eq!(hi, "Hi");
        assert_eq!(style.color, Some(Color::new(255, 0, 0)));
        assert_eq!(style.font_size.as_deref(), Some("14pt"));
        assert_eq!(style.font_family.as_deref(), Some("Arial"));
        assert_eq!(text.plain_text(), "Hi there");
    }

    #[test]
    fn writes_canonical_nesting() {
        let text = from_srt("<i><b>both</b></i> <font color=\"#00FF00\">green</font>");
        assert_eq!(
            to_srt(&text, false),
            "<b><i>both</i></b> <font color=\"#00FF00\">green</font>"
        );
    }

    #[test]
    fn round_trips_canonical_markup() {
        let source = "<font color=\"#FF0000\"><b>red bold</b> red</font>\n<u>under</u>";
        let text = from_srt(source);
        assert_eq!(to_srt(&text, false), source);
        assert_eq!(from_srt(&to_srt(&text, false)), text);
    }

    #[test]
    fn single_line_joins_with_space() {
        let text = from_srt("<i>one\ntwo</i>");
        assert_eq!(to_srt(&text, true), "<i>one two</i>");
    }

    #[test]
    fn unknown_tags_stay_text() {
        let text = from_srt("<span>x</span> <b>y");
        assert_eq!(text.plain_text(), "<span>x</span> y");
    }
}
