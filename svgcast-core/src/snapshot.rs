//! Immutable screen snapshots.
//!
//! A snapshot is a deep copy of the visible grid plus the cursor state.
//! Snapshots are the unit of frame deduplication: two snapshots are
//! screen-equal iff their cells, cursor position and cursor visibility
//! are equal (the color palette is fixed per session).

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::screen::Screen;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotCursor {
    pub row: usize,
    pub col: usize,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    pub cols: usize,
    pub rows: usize,
    /// Row-major cell grid
    cells: Vec<Vec<Cell>>,
    pub cursor: SnapshotCursor,
}

impl ScreenSnapshot {
    pub fn from_screen(screen: &Screen) -> Self {
        let cells: Vec<Vec<Cell>> = (0..screen.rows())
            .map(|row| {
                (0..screen.cols())
                    .map(|col| {
                        screen
                            .get_cell(row, col)
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        ScreenSnapshot {
            cols: screen.cols(),
            rows: screen.rows(),
            cells,
            cursor: SnapshotCursor {
                row: screen.cursor().row,
                col: screen.cursor().col,
                visible: screen.cursor().visible,
            },
        }
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row]
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Text content of one row with trailing blanks trimmed
    pub fn row_text(&self, row: usize) -> String {
        match self.cells.get(row) {
            Some(cells) => {
                let line: String = cells.iter().map(|c| c.text.as_str()).collect();
                line.trim_end().to_string()
            }
            None => String::new(),
        }
    }

    /// Full text content, one line per row
    pub fn text(&self) -> String {
        (0..self.rows)
            .map(|r| self.row_text(r))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serialize to JSON for debugging
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
