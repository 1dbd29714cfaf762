//! Concrete, fully-inherited style attributes for one rendered node.

use ratatui::style::{Color, Modifier, Style};
use std::fmt;
use std::str::FromStr;

/// Family used when neither the configuration nor any ancestor names one.
pub const DEFAULT_FONT_FAMILY: &str = "System";
/// Size in points used when nothing else applies.
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// CSS-like numeric font weight (100..=900).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: Self = Self(400);
    pub const BOLD: Self = Self(700);

    pub fn is_bold(self) -> bool {
        self.0 >= 600
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseFontWeightError(String);

impl fmt::Display for ParseFontWeightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid font weight: {:?}", self.0)
    }
}

impl std::error::Error for ParseFontWeightError {}

impl FromStr for FontWeight {
    type Err = ParseFontWeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        match raw.to_ascii_lowercase().as_str() {
            "normal" | "regular" => return Ok(Self::NORMAL),
            "bold" => return Ok(Self::BOLD),
            "light" => return Ok(Self(300)),
            "medium" => return Ok(Self(500)),
            "semibold" => return Ok(Self(600)),
            "heavy" | "black" => return Ok(Self(900)),
            _ => {}
        }
        match raw.parse::<u16>() {
            Ok(n) if (1..=1000).contains(&n) => Ok(Self(n)),
            _ => Err(ParseFontWeightError(s.to_string())),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for FontWeight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u16),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n
                .to_string()
                .parse()
                .map_err(serde::de::Error::custom),
            Raw::Name(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
}

/// The attribute set computed for one node after inheritance.
///
/// Sizes and spacing are absolute points, never relative to a parent.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStyle {
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub slant: FontSlant,
    pub color: Color,
    pub background: Option<Color>,
    pub underline: bool,
    pub line_height: Option<f32>,
    /// Space after the block this style belongs to.
    pub margin_bottom: f32,
    /// Leading offset contributed by blockquote and list nesting.
    pub indent: f32,
    pub preserve_whitespace: bool,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            font_weight: FontWeight::NORMAL,
            slant: FontSlant::Normal,
            color: Color::Reset,
            background: None,
            underline: false,
            line_height: None,
            margin_bottom: 0.0,
            indent: 0.0,
            preserve_whitespace: false,
        }
    }
}

impl ResolvedStyle {
    pub fn is_bold(&self) -> bool {
        self.font_weight.is_bold()
    }

    pub fn is_italic(&self) -> bool {
        self.slant == FontSlant::Italic
    }

    /// Terminal approximation: sizes and families are dropped.
    pub fn to_ratatui(&self) -> Style {
        let mut style = Style::default();
        if self.color != Color::Reset {
            style = style.fg(self.color);
        }
        if let Some(bg) = self.background {
            style = style.bg(bg);
        }
        let mut modifier = Modifier::empty();
        if self.is_bold() {
            modifier |= Modifier::BOLD;
        }
        if self.is_italic() {
            modifier |= Modifier::ITALIC;
        }
        if self.underline {
            modifier |= Modifier::UNDERLINED;
        }
        style.add_modifier(modifier)
    }
}

/// Best-effort sRGB value for a ratatui colour. `Reset` has none.
pub fn color_to_rgb(color: Color) -> Option<(u8, u8, u8)> {
    let rgb = match color {
        Color::Reset => return None,
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0x00, 0x00, 0x00),
        Color::Red => (0x80, 0x00, 0x00),
        Color::Green => (0x00, 0x80, 0x00),
        Color::Yellow => (0x80, 0x80, 0x00),
        Color::Blue => (0x00, 0x00, 0x80),
        Color::Magenta => (0x80, 0x00, 0x80),
        Color::Cyan => (0x00, 0x80, 0x80),
        Color::Gray => (0xc0, 0xc0, 0xc0),
        Color::DarkGray => (0x80, 0x80, 0x80),
        Color::LightRed => (0xff, 0x00, 0x00),
        Color::LightGreen => (0x00, 0xff, 0x00),
        Color::LightYellow => (0xff, 0xff, 0x00),
        Color::LightBlue => (0x00, 0x00, 0xff),
        Color::LightMagenta => (0xff, 0x00, 0xff),
        Color::LightCyan => (0x00, 0xff, 0xff),
        Color::White => (0xff, 0xff, 0xff),
        Color::Indexed(i) => indexed_to_rgb(i),
    };
    Some(rgb)
}

/// `#rrggbb`, or `None` for `Color::Reset`.
pub fn color_to_hex(color: Color) -> Option<String> {
    color_to_rgb(color).map(|(r, g, b)| format!("#{r:02x}{g:02x}{b:02x}"))
}

fn indexed_to_rgb(i: u8) -> (u8, u8, u8) {
    const BASIC: [Color; 16] = [
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::Gray,
        Color::DarkGray,
        Color::LightRed,
        Color::LightGreen,
        Color::LightYellow,
        Color::LightBlue,
        Color::LightMagenta,
        Color::LightCyan,
        Color::White,
    ];
    match i {
        0..=15 => color_to_rgb(BASIC[i as usize]).unwrap_or((0, 0, 0)),
        16..=231 => {
            let n = i - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (level(n / 36), level((n / 6) % 6), level(n % 6))
        }
        _ => {
            let v = 8 + (i - 232) * 10;
            (v, v, v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_weight_parses_names_and_numbers() {
        assert_eq!("bold".parse::<FontWeight>(), Ok(FontWeight::BOLD));
        assert_eq!("700".parse::<FontWeight>(), Ok(FontWeight::BOLD));
        assert_eq!(" Normal ".parse::<FontWeight>(), Ok(FontWeight::NORMAL));
        assert!("900".parse::<FontWeight>().is_ok_and(FontWeight::is_bold));
        assert!("extra".parse::<FontWeight>().is_err());
        assert!("0".parse::<FontWeight>().is_err());
    }

    #[test]
    fn to_ratatui_maps_weight_slant_and_decorations() {
        let style = ResolvedStyle {
            font_weight: FontWeight::BOLD,
            slant: FontSlant::Italic,
            underline: true,
            color: Color::Cyan,
            ..ResolvedStyle::default()
        };
        let s = style.to_ratatui();
        assert_eq!(s.fg, Some(Color::Cyan));
        assert!(s.add_modifier.contains(Modifier::BOLD));
        assert!(s.add_modifier.contains(Modifier::ITALIC));
        assert!(s.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn reset_color_leaves_foreground_unset() {
        assert_eq!(ResolvedStyle::default().to_ratatui().fg, None);
        assert_eq!(color_to_hex(Color::Reset), None);
    }

    #[test]
    fn color_to_hex_handles_rgb_named_and_indexed() {
        assert_eq!(
            color_to_hex(Color::Rgb(0x12, 0xab, 0xff)).as_deref(),
            Some("#12abff")
        );
        assert_eq!(color_to_hex(Color::White).as_deref(), Some("#ffffff"));
        assert_eq!(color_to_hex(Color::Indexed(16)).as_deref(), Some("#000000"));
        assert_eq!(color_to_hex(Color::Indexed(231)).as_deref(), Some("#ffffff"));
        assert_eq!(color_to_hex(Color::Indexed(232)).as_deref(), Some("#080808"));
    }
}
