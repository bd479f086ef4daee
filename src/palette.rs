use crate::model::{ColorScheme, Theme};

/// Straight (non-premultiplied) RGBA8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`. Returns `None` on anything
    /// else; callers fall back to theme defaults.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        match hex.len() {
            3 => {
                let mut v = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let d = c.to_digit(16)? as u8;
                    v[i] = d << 4 | d;
                }
                Some(Self::opaque(v[0], v[1], v[2]))
            }
            6 | 8 => {
                let mut v = [255u8; 4];
                for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
                    let s = std::str::from_utf8(chunk).ok()?;
                    v[i] = u8::from_str_radix(s, 16).ok()?;
                }
                Some(Self::new(v[0], v[1], v[2], v[3]))
            }
            _ => None,
        }
    }
}

/// Theme-derived colors for the generated feedback overlays. Derived once
/// per scene activation so effects never clash with the screenshot palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Palette {
    pub cursor: Rgba8,
    pub highlight: Rgba8,
    pub ripple: Rgba8,
    pub glow: Rgba8,
    pub typed_text: Rgba8,
}

const LIGHT_ACCENT: Rgba8 = Rgba8::opaque(0x1a, 0x73, 0xe8);
const DARK_ACCENT: Rgba8 = Rgba8::opaque(0x8a, 0xb4, 0xf8);
const LIGHT_INK: Rgba8 = Rgba8::opaque(0x1f, 0x29, 0x37);
const DARK_INK: Rgba8 = Rgba8::opaque(0xf3, 0xf4, 0xf6);

impl Palette {
    pub fn from_scheme(scheme: &ColorScheme) -> Self {
        let (default_accent, ink) = match scheme.theme {
            Theme::Light => (LIGHT_ACCENT, LIGHT_INK),
            Theme::Dark => (DARK_ACCENT, DARK_INK),
        };
        let accent = Rgba8::parse_hex(&scheme.accent).unwrap_or(default_accent);
        let text = Rgba8::parse_hex(&scheme.primary).unwrap_or(ink);

        Self {
            cursor: ink,
            highlight: accent.with_alpha(230),
            ripple: accent.with_alpha(200),
            glow: accent.with_alpha(120),
            typed_text: text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme(accent: &str, theme: Theme) -> ColorScheme {
        ColorScheme {
            primary: "#202124".to_string(),
            background: "#ffffff".to_string(),
            accent: accent.to_string(),
            theme,
        }
    }

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(Rgba8::parse_hex("#fff"), Some(Rgba8::opaque(255, 255, 255)));
        assert_eq!(
            Rgba8::parse_hex("#1a73e8"),
            Some(Rgba8::opaque(0x1a, 0x73, 0xe8))
        );
        assert_eq!(
            Rgba8::parse_hex("#1a73e880"),
            Some(Rgba8::new(0x1a, 0x73, 0xe8, 0x80))
        );
    }

    #[test]
    fn rejects_malformed_hex() {
        assert_eq!(Rgba8::parse_hex("1a73e8"), None);
        assert_eq!(Rgba8::parse_hex("#12345"), None);
        assert_eq!(Rgba8::parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn accent_drives_highlight_and_ripple() {
        let p = Palette::from_scheme(&scheme("#ff0000", Theme::Light));
        assert_eq!(p.highlight, Rgba8::new(255, 0, 0, 230));
        assert_eq!(p.ripple, Rgba8::new(255, 0, 0, 200));
    }

    #[test]
    fn malformed_accent_falls_back_to_theme_default() {
        let p = Palette::from_scheme(&scheme("not-a-color", Theme::Dark));
        assert_eq!(p.highlight, DARK_ACCENT.with_alpha(230));
        assert_eq!(p.cursor, DARK_INK);
    }
}
