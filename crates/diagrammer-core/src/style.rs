//! Colors and fonts carried by shape records.

use serde::{Deserialize, Serialize};

/// 32-bit ARGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const BLUE: Color = Color(0xFF00_00FF);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Color from a stored integer. Values outside 32 bits keep their low word.
    pub fn from_stored(value: i64) -> Self {
        Self(value as u32)
    }

    /// `#rrggbb` for SVG and other CSS consumers
    pub fn to_css(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red(), self.green(), self.blue())
    }

    /// Alpha as a 0..=1 opacity
    pub fn opacity(self) -> f64 {
        f64::from(self.alpha()) / 255.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

/// Font weight/slant, stored as a bit set (bold = 1, italic = 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Plain,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn code(self) -> i64 {
        match self {
            FontStyle::Plain => 0,
            FontStyle::Bold => 1,
            FontStyle::Italic => 2,
            FontStyle::BoldItalic => 3,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code & 3 {
            1 => FontStyle::Bold,
            2 => FontStyle::Italic,
            3 => FontStyle::BoldItalic,
            _ => FontStyle::Plain,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }
}

/// Family, style, and point size of a text record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontSpec {
    pub name: String,
    pub style: FontStyle,
    pub size: u32,
}

impl FontSpec {
    pub const DEFAULT_FAMILY: &'static str = "SansSerif";
    pub const MIN_SIZE: u32 = 12;

    pub fn new(name: impl Into<String>, style: FontStyle, size: u32) -> Self {
        Self {
            name: name.into(),
            style,
            size,
        }
    }

    /// Default font for a text box `height` units tall: plain, `max(12, height / 2)`
    pub fn for_box_height(height: f64) -> Self {
        let size = (height / 2.0).max(0.0) as u32;
        Self::new(Self::DEFAULT_FAMILY, FontStyle::Plain, size.max(Self::MIN_SIZE))
    }

    /// Approximate metrics used for text layout
    pub fn ascent(&self) -> f64 {
        f64::from(self.size) * 0.8
    }

    pub fn line_height(&self) -> f64 {
        f64::from(self.size) * 1.2
    }

    pub fn advance(&self, text: &str) -> f64 {
        text.chars().count() as f64 * f64::from(self.size) * 0.6
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FAMILY, FontStyle::Plain, Self::MIN_SIZE)
    }
}
