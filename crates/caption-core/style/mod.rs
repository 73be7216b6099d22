//! Style bridge between [`StyledText`](crate::StyledText) and each
//! format's native markup
//!
//! Every format module exposes a `from_*` parser and a `to_*` writer; the
//! writer's output parses back to the same styled text. Markup a parser
//! does not understand is kept as literal text, or as opaque round-trip
//! data where the format allows it.

pub mod css;
pub mod markup;
pub mod srt;
pub mod sub;
pub mod ttml;
pub mod vtt;

pub use srt::{from_srt, to_srt};
pub use sub::{from_sub, to_sub, SubText};
pub use ttml::{
    style_from_attributes, style_from_properties, style_properties, ttml_attributes,
    ttml_attributes_beyond, TtmlProperty,
};
pub use vtt::{from_vtt, to_vtt, SynthesizedClasses, VttStyleRules};

/// Numeric point size of a canonical font size, for formats that only
/// take a bare number
pub(crate) fn point_size(size: &str) -> Option<&str> {
    let size = size.trim();
    let number = size.strip_suffix("pt").unwrap_or(size).trim();
    if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        Some(number)
    } else {
        log::warn!("Font size {size} cannot be written as a point size");
        None
    }
}
