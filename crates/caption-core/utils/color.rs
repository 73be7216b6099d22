//! RGB colour values and their textual encodings
//!
//! Captions carry colours in three byte orders: `#RRGGBB` for SRT, VTT CSS
//! and TTML, `$BBGGRR` for MicroDVD control codes, plus CSS functional and
//! named forms. Everything is normalised to [`Color`].

use core::fmt;

use super::errors::{CoreError, Result};

/// Opaque 24-bit colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Named colours understood by caption renderers
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0x00, 0x00, 0x00]),
    ("silver", [0xC0, 0xC0, 0xC0]),
    ("gray", [0x80, 0x80, 0x80]),
    ("grey", [0x80, 0x80, 0x80]),
    ("white", [0xFF, 0xFF, 0xFF]),
    ("maroon", [0x80, 0x00, 0x00]),
    ("red", [0xFF, 0x00, 0x00]),
    ("purple", [0x80, 0x00, 0x80]),
    ("fuchsia", [0xFF, 0x00, 0xFF]),
    ("magenta", [0xFF, 0x00, 0xFF]),
    ("green", [0x00, 0x80, 0x00]),
    ("lime", [0x00, 0xFF, 0x00]),
    ("olive", [0x80, 0x80, 0x00]),
    ("yellow", [0xFF, 0xFF, 0x00]),
    ("navy", [0x00, 0x00, 0x80]),
    ("blue", [0x00, 0x00, 0xFF]),
    ("teal", [0x00, 0x80, 0x80]),
    ("aqua", [0x00, 0xFF, 0xFF]),
    ("cyan", [0x00, 0xFF, 0xFF]),
    ("orange", [0xFF, 0xA5, 0x00]),
];

impl Color {
    /// Create a colour from its components
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse any supported textual colour
    ///
    /// Accepts `#RGB`, `#RRGGBB`, `#RRGGBBAA` (alpha ignored), `rgb(r,g,b)`,
    /// `rgba(r,g,b,a)` and CSS named colours.
    ///
    /// # Errors
    ///
    /// Returns an error if the value matches none of the forms.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            return Self::from_rgb_hex(hex).ok_or_else(|| invalid(value));
        }
        if let Some(args) = functional_args(trimmed) {
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            if parts.len() < 3 {
                return Err(invalid(value));
            }
            let channel = |part: &str| -> Result<u8> {
                if let Some(percent) = part.strip_suffix('%') {
                    let p: f64 = percent.trim().parse().map_err(|_| invalid(value))?;
                    Ok((p.clamp(0.0, 100.0) * 2.55).round() as u8)
                } else {
                    let v: f64 = part.parse().map_err(|_| invalid(value))?;
                    Ok(v.clamp(0.0, 255.0).round() as u8)
                }
            };
            return Ok(Self::new(
                channel(parts[0])?,
                channel(parts[1])?,
                channel(parts[2])?,
            ));
        }
        let lower = trimmed.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, [r, g, b])| Self::new(*r, *g, *b))
            .ok_or_else(|| invalid(value))
    }

    /// Parse hex digits in `RRGGBB` order (without the leading `#`)
    #[must_use]
    pub fn from_rgb_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let expand = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
                Some(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            6 | 8 => {
                let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
                Some(Self::new(byte(0)?, byte(2)?, byte(4)?))
            }
            _ => None,
        }
    }

    /// Parse a MicroDVD colour (`$BBGGRR`, the `$` is optional)
    ///
    /// # Errors
    ///
    /// Returns an error unless the value holds exactly six hex digits.
    pub fn from_bgr_hex(value: &str) -> Result<Self> {
        let hex = value.trim().trim_start_matches('$');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid(value));
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid(value));
        let blue = byte(0)?;
        let green = byte(2)?;
        let red = byte(4)?;
        Ok(Self::new(red, green, blue))
    }

    /// Format as `#RRGGBB`
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Format as MicroDVD `$BBGGRR`
    #[must_use]
    pub fn to_bgr_hex(self) -> String {
        format!("${:02X}{:02X}{:02X}", self.b, self.g, self.r)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn functional_args(value: &str) -> Option<&str> {
    let lower_prefix = value.get(..4)?.to_ascii_lowercase();
    let rest = if lower_prefix == "rgba" {
        value.get(4..)?
    } else if lower_prefix.starts_with("rgb") {
        value.get(3..)?
    } else {
        return None;
    };
    rest.trim().strip_prefix('(')?.strip_suffix(')')
}

fn invalid(value: &str) -> CoreError {
    CoreError::Serialization(format!("Invalid color value '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Color::parse("#ff0000").unwrap(), Color::new(255, 0, 0));
        assert_eq!(Color::parse("#0F0").unwrap(), Color::new(0, 255, 0));
        assert_eq!(Color::parse("#0000FFCC").unwrap(), Color::new(0, 0, 255));
    }

    #[test]
    fn parses_functional_and_named() {
        assert_eq!(Color::parse("rgb(1, 2, 3)").unwrap(), Color::new(1, 2, 3));
        assert_eq!(
            Color::parse("rgba(255,255,255,0.5)").unwrap(),
            Color::new(255, 255, 255)
        );
        assert_eq!(Color::parse("Yellow").unwrap(), Color::new(255, 255, 0));
        assert!(Color::parse("not-a-colour").is_err());
        assert!(Color::parse("#12").is_err());
    }

    #[test]
    fn microdvd_byte_order_is_reversed() {
        // $BBGGRR: 0000FF is red in MicroDVD
        let red = Color::from_bgr_hex("$0000FF").unwrap();
        assert_eq!(red.to_hex(), "#FF0000");
        assert_eq!(red.to_bgr_hex(), "$0000FF");

        let blue = Color::parse("#0000FF").unwrap();
        assert_eq!(blue.to_bgr_hex(), "$FF0000");
        assert!(Color::from_bgr_hex("$FFF").is_err());
    }
}
