//! Cursor state for terminal emulation.
//!
//! The cursor tracks its position and visibility (DECTCEM). Saved state
//! for DECSC/DECRC additionally captures the pen style and the origin
//! and autowrap modes, which DECRC restores.

use serde::{Deserialize, Serialize};

use crate::cell::Attrs;
use crate::color::Color;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
    pub visible: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor {
            row: 0,
            col: 0,
            visible: true,
        }
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedCursor {
    pub row: usize,
    pub col: usize,
    pub attrs: Attrs,
    pub fg: Color,
    pub bg: Color,
    pub origin_mode: bool,
    pub autowrap: bool,
}

impl SavedCursor {
    pub fn capture(
        cursor: &Cursor,
        attrs: Attrs,
        fg: Color,
        bg: Color,
        origin_mode: bool,
        autowrap: bool,
    ) -> Self {
        SavedCursor {
            row: cursor.row,
            col: cursor.col,
            attrs,
            fg,
            bg,
            origin_mode,
            autowrap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_default() {
        let cursor = Cursor::new();
        assert_eq!(cursor.row, 0);
        assert_eq!(cursor.col, 0);
        assert!(cursor.visible);
    }

    #[test]
    fn test_saved_cursor_capture() {
        let cursor = Cursor {
            row: 5,
            col: 12,
            visible: true,
        };
        let mut attrs = Attrs::empty();
        attrs.insert(Attrs::BOLD);

        let saved = SavedCursor::capture(&cursor, attrs, Color::Default, Color::Default, false, true);
        assert_eq!(saved.row, 5);
        assert_eq!(saved.col, 12);
        assert!(saved.attrs.contains(Attrs::BOLD));
        assert!(saved.autowrap);
    }
}
