//! Line representation for the terminal grid.
//!
//! A line is one row of cells.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::color::Color;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    cells: Vec<Cell>,
}

impl Line {
    pub fn new(cols: usize) -> Self {
        Line {
            cells: vec![Cell::default(); cols],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    pub fn get_mut(&mut self, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(col)
    }

    pub fn set(&mut self, col: usize, cell: Cell) {
        if col < self.cells.len() {
            self.cells[col] = cell;
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn clear_with_bg(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.clear_with_bg(bg);
        }
    }

    pub fn clear_range_with_bg(&mut self, start: usize, end: usize, bg: Color) {
        let end = end.min(self.cells.len());
        for col in start..end {
            self.cells[col].clear_with_bg(bg);
        }
    }

    pub fn resize(&mut self, new_cols: usize) {
        if new_cols > self.cells.len() {
            self.cells.resize(new_cols, Cell::default());
        } else {
            self.cells.truncate(new_cols);
        }
    }

    /// Insert `count` blank cells at `col`, shifting the rest right.
    /// Cells pushed past the end of the line are discarded.
    pub fn insert_cells(&mut self, col: usize, count: usize) {
        if col >= self.cells.len() {
            return;
        }
        let count = count.min(self.cells.len() - col);
        for _ in 0..count {
            self.cells.pop();
            self.cells.insert(col, Cell::default());
        }
    }

    /// Delete `count` cells at `col`, shifting the rest left and filling
    /// the tail with blanks.
    pub fn delete_cells(&mut self, col: usize, count: usize) {
        if col >= self.cells.len() {
            return;
        }
        let cols = self.cells.len();
        let count = count.min(cols - col);
        for _ in 0..count {
            self.cells.remove(col);
        }
        self.cells.resize(cols, Cell::default());
    }

    /// Text content of the line with trailing blanks trimmed
    pub fn text_content(&self) -> String {
        let mut s = String::new();
        for cell in &self.cells {
            s.push_str(&cell.text);
        }
        s.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Attrs;

    fn plain(c: char) -> Cell {
        Cell::new(c, Color::Default, Color::Default, Attrs::empty())
    }

    #[test]
    fn test_new_line() {
        let line = Line::new(80);
        assert_eq!(line.len(), 80);
        assert!(line.get(0).unwrap().is_blank());
    }

    #[test]
    fn test_set_get_cell() {
        let mut line = Line::new(80);
        line.set(10, plain('A'));
        assert_eq!(line.get(10).unwrap().text, "A");
    }

    #[test]
    fn test_clear_range() {
        let mut line = Line::new(80);
        for i in 0..10 {
            line.set(i, plain((b'A' + i as u8) as char));
        }
        line.clear_range_with_bg(3, 7, Color::Default);
        assert_eq!(line.get(2).unwrap().text, "C");
        assert_eq!(line.get(3).unwrap().text, " ");
        assert_eq!(line.get(6).unwrap().text, " ");
        assert_eq!(line.get(7).unwrap().text, "H");
    }

    #[test]
    fn test_insert_cells() {
        let mut line = Line::new(10);
        for i in 0..10 {
            line.set(i, plain((b'A' + i as u8) as char));
        }
        line.insert_cells(3, 2);
        assert_eq!(line.get(2).unwrap().text, "C");
        assert_eq!(line.get(3).unwrap().text, " ");
        assert_eq!(line.get(4).unwrap().text, " ");
        assert_eq!(line.get(5).unwrap().text, "D");
        assert_eq!(line.len(), 10);
    }

    #[test]
    fn test_delete_cells() {
        let mut line = Line::new(10);
        for i in 0..10 {
            line.set(i, plain((b'A' + i as u8) as char));
        }
        line.delete_cells(3, 2);
        assert_eq!(line.get(2).unwrap().text, "C");
        assert_eq!(line.get(3).unwrap().text, "F");
        assert_eq!(line.len(), 10);
        assert_eq!(line.get(9).unwrap().text, " ");
    }

    #[test]
    fn test_text_content() {
        let mut line = Line::new(80);
        for (i, c) in "Hello".chars().enumerate() {
            line.set(i, plain(c));
        }
        assert_eq!(line.text_content(), "Hello");
    }
}
