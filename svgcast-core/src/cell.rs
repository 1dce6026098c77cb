//! Terminal cell representation
//!
//! A cell is a single character position in the terminal grid. Each cell
//! carries one user-perceived character (a grapheme, so combining marks
//! ride along with their base), foreground and background colors, and a
//! set of text attributes.
//!
//! The right half of a wide glyph is a *spacer* cell: its text is empty
//! and it inherits the style of the glyph to its left.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Flags for cell text attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Attrs {
    bits: u8,
}

impl Attrs {
    pub const BOLD: u8 = 1 << 0;
    pub const ITALIC: u8 = 1 << 1;
    pub const UNDERLINE: u8 = 1 << 2;
    pub const STRIKETHROUGH: u8 = 1 << 3;
    pub const INVERSE: u8 = 1 << 4;
    pub const BLINK: u8 = 1 << 5;

    pub const fn empty() -> Self {
        Attrs { bits: 0 }
    }

    pub fn contains(&self, flag: u8) -> bool {
        self.bits & flag != 0
    }

    pub fn set(&mut self, flag: u8, value: bool) {
        if value {
            self.bits |= flag;
        } else {
            self.bits &= !flag;
        }
    }

    pub fn insert(&mut self, flag: u8) {
        self.bits |= flag;
    }

    pub fn remove(&mut self, flag: u8) {
        self.bits &= !flag;
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Attributes without the inverse bit. Inverse is consumed by the
    /// fg/bg swap during layout and must not split otherwise equal runs.
    pub fn without_inverse(&self) -> Attrs {
        Attrs {
            bits: self.bits & !Self::INVERSE,
        }
    }
}

/// A single cell in the terminal grid
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// The character stored in this cell. A `String` so that zero-width
    /// combining characters can attach to their base. Empty for the
    /// spacer half of a wide glyph.
    pub text: String,
    /// Foreground color
    pub fg: Color,
    /// Background color
    pub bg: Color,
    /// Text attributes
    pub attrs: Attrs,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            text: String::from(" "),
            fg: Color::Default,
            bg: Color::Default,
            attrs: Attrs::empty(),
        }
    }
}

impl Cell {
    /// Create a new cell with the given character and style
    pub fn new(c: char, fg: Color, bg: Color, attrs: Attrs) -> Self {
        Cell {
            text: c.to_string(),
            fg,
            bg,
            attrs,
        }
    }

    /// Create the spacer cell for the right half of a wide glyph
    pub fn wide_spacer(fg: Color, bg: Color, attrs: Attrs) -> Self {
        Cell {
            text: String::new(),
            fg,
            bg,
            attrs,
        }
    }

    /// Check if this cell is a wide-glyph spacer
    pub fn is_wide_spacer(&self) -> bool {
        self.text.is_empty()
    }

    /// Check if this cell is a blank with default colors and no attributes
    pub fn is_blank(&self) -> bool {
        self.text == " "
            && self.fg == Color::Default
            && self.bg == Color::Default
            && self.attrs.is_empty()
    }

    /// Reset the cell to a blank with the given background
    pub fn clear_with_bg(&mut self, bg: Color) {
        self.text.clear();
        self.text.push(' ');
        self.fg = Color::Default;
        self.bg = bg;
        self.attrs = Attrs::empty();
    }

    /// Display width of the cell in columns
    pub fn width(&self) -> usize {
        if self.text.is_empty() {
            0
        } else {
            use unicode_width::UnicodeWidthStr;
            self.text.as_str().width().max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_default() {
        let cell = Cell::default();
        assert_eq!(cell.text, " ");
        assert_eq!(cell.fg, Color::Default);
        assert_eq!(cell.bg, Color::Default);
        assert!(cell.attrs.is_empty());
        assert!(cell.is_blank());
    }

    #[test]
    fn test_attrs_flags() {
        let mut attrs = Attrs::empty();
        assert!(!attrs.contains(Attrs::BOLD));

        attrs.insert(Attrs::BOLD);
        attrs.insert(Attrs::ITALIC);
        assert!(attrs.contains(Attrs::BOLD));
        assert!(attrs.contains(Attrs::ITALIC));

        attrs.remove(Attrs::BOLD);
        assert!(!attrs.contains(Attrs::BOLD));
        assert!(attrs.contains(Attrs::ITALIC));
    }

    #[test]
    fn test_without_inverse() {
        let mut attrs = Attrs::empty();
        attrs.insert(Attrs::INVERSE);
        attrs.insert(Attrs::UNDERLINE);

        let stripped = attrs.without_inverse();
        assert!(!stripped.contains(Attrs::INVERSE));
        assert!(stripped.contains(Attrs::UNDERLINE));
    }

    #[test]
    fn test_wide_spacer() {
        let spacer = Cell::wide_spacer(Color::Default, Color::Default, Attrs::empty());
        assert!(spacer.is_wide_spacer());
        assert_eq!(spacer.width(), 0);
    }

    #[test]
    fn test_cell_width() {
        assert_eq!(
            Cell::new('A', Color::Default, Color::Default, Attrs::empty()).width(),
            1
        );
        assert_eq!(
            Cell::new('中', Color::Default, Color::Default, Attrs::empty()).width(),
            2
        );
    }
}
