//! Terminal color representation
//!
//! Cells carry either the default color, one of the 16 named ANSI colors,
//! or a 24-bit RGB value. SGR indexed colors (256-color mode) are resolved
//! when the SGR is applied: indices 0-15 map to named colors, 16-255 map
//! through the standard xterm palette to RGB.

use serde::{Deserialize, Serialize};

/// Represents a terminal color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    /// Default foreground or background color
    #[default]
    Default,
    /// Named color from the 16-color palette (0-15)
    Named(NamedColor),
    /// 24-bit RGB color
    Rgb(Rgb),
}

impl Color {
    /// Resolve a 256-color palette index to a concrete color
    pub fn from_index(index: u8) -> Self {
        match NamedColor::from_index(index) {
            Some(named) => Color::Named(named),
            None => Color::Rgb(xterm_256_color(index)),
        }
    }
}

/// Named colors from the standard 16-color ANSI palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NamedColor {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
    BrightBlack = 8,
    BrightRed = 9,
    BrightGreen = 10,
    BrightYellow = 11,
    BrightBlue = 12,
    BrightMagenta = 13,
    BrightCyan = 14,
    BrightWhite = 15,
}

impl NamedColor {
    /// Convert from SGR color code (30-37 for fg, 40-47 for bg)
    pub fn from_sgr_normal(code: u8) -> Option<Self> {
        Self::from_index(code)
    }

    /// Convert from SGR bright color code (90-97 for fg, 100-107 for bg)
    pub fn from_sgr_bright(code: u8) -> Option<Self> {
        if code < 8 {
            Self::from_index(code + 8)
        } else {
            None
        }
    }

    /// Convert from a palette index in 0..16
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(NamedColor::Black),
            1 => Some(NamedColor::Red),
            2 => Some(NamedColor::Green),
            3 => Some(NamedColor::Yellow),
            4 => Some(NamedColor::Blue),
            5 => Some(NamedColor::Magenta),
            6 => Some(NamedColor::Cyan),
            7 => Some(NamedColor::White),
            8 => Some(NamedColor::BrightBlack),
            9 => Some(NamedColor::BrightRed),
            10 => Some(NamedColor::BrightGreen),
            11 => Some(NamedColor::BrightYellow),
            12 => Some(NamedColor::BrightBlue),
            13 => Some(NamedColor::BrightMagenta),
            14 => Some(NamedColor::BrightCyan),
            15 => Some(NamedColor::BrightWhite),
            _ => None,
        }
    }

    /// Get the index in the palette
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parse a "#rrggbb" string
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        Some(Rgb::new(r, g, b))
    }

    /// Format as "#rrggbb"
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Resolve an index in 16..256 through the standard xterm palette:
/// 16-231 form a 6x6x6 color cube, 232-255 a grayscale ramp.
/// Indices below 16 resolve through the default 16-color values.
pub fn xterm_256_color(index: u8) -> Rgb {
    const BASE: [Rgb; 16] = [
        Rgb::new(0, 0, 0),
        Rgb::new(205, 0, 0),
        Rgb::new(0, 205, 0),
        Rgb::new(205, 205, 0),
        Rgb::new(0, 0, 238),
        Rgb::new(205, 0, 205),
        Rgb::new(0, 205, 205),
        Rgb::new(229, 229, 229),
        Rgb::new(127, 127, 127),
        Rgb::new(255, 0, 0),
        Rgb::new(0, 255, 0),
        Rgb::new(255, 255, 0),
        Rgb::new(92, 92, 255),
        Rgb::new(255, 0, 255),
        Rgb::new(0, 255, 255),
        Rgb::new(255, 255, 255),
    ];

    if index < 16 {
        return BASE[index as usize];
    }
    if index < 232 {
        let cube = index - 16;
        let steps = [0u8, 95, 135, 175, 215, 255];
        let r = steps[(cube / 36) as usize];
        let g = steps[((cube % 36) / 6) as usize];
        let b = steps[(cube % 6) as usize];
        return Rgb::new(r, g, b);
    }
    let gray = (index - 232) * 10 + 8;
    Rgb::new(gray, gray, gray)
}

/// A terminal color theme: default foreground and background plus the
/// 16-color palette, as carried in an asciicast v2 header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub foreground: Rgb,
    pub background: Rgb,
    pub palette: Vec<Rgb>,
}

impl Theme {
    /// Build a theme from "#rrggbb" strings; the palette is a colon
    /// separated list of 8 or 16 colors. Extra entries past the first 16
    /// are ignored; fewer than 8 valid entries is an error.
    pub fn from_strings(fg: &str, bg: &str, palette: &str) -> Option<Self> {
        let foreground = Rgb::from_hex(fg)?;
        let background = Rgb::from_hex(bg)?;

        let colors: Vec<Rgb> = palette
            .split(':')
            .take(16)
            .map_while(Rgb::from_hex)
            .collect();
        let palette = if colors.len() >= 16 {
            colors[..16].to_vec()
        } else if colors.len() >= 8 {
            colors[..8].to_vec()
        } else {
            return None;
        };

        Some(Theme {
            foreground,
            background,
            palette,
        })
    }
}
