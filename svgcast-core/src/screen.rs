//! Screen model for terminal emulation.
//!
//! The Screen maintains:
//! - Primary and alternate grids (full-screen apps switch to the latter)
//! - Cursor state and saved cursors
//! - Scroll region, tab stops, terminal modes
//! - The current pen (colors and attributes)
//! - A dirty-row set recording which rows changed since the last flush

use std::collections::BTreeSet;

use crate::cell::{Attrs, Cell};
use crate::color::Color;
use crate::cursor::{Cursor, SavedCursor};
use crate::line::Line;
use crate::snapshot::ScreenSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    pub top: usize,
    pub bottom: usize,
}

impl ScrollRegion {
    pub fn new(top: usize, bottom: usize) -> Self {
        ScrollRegion { top, bottom }
    }

    pub fn full(rows: usize) -> Self {
        ScrollRegion {
            top: 0,
            bottom: rows.saturating_sub(1),
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.top && row <= self.bottom
    }
}

#[derive(Debug, Clone)]
pub struct TerminalModes {
    pub origin_mode: bool,
    pub autowrap: bool,
    pub insert_mode: bool,
    pub linefeed_mode: bool,
}

impl Default for TerminalModes {
    fn default() -> Self {
        TerminalModes {
            origin_mode: false,
            autowrap: true,
            insert_mode: false,
            linefeed_mode: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TabStops {
    stops: Vec<bool>,
}

impl TabStops {
    pub fn new(cols: usize) -> Self {
        let mut stops = vec![false; cols];
        for i in (0..cols).step_by(8) {
            stops[i] = true;
        }
        TabStops { stops }
    }

    pub fn set(&mut self, col: usize) {
        if col < self.stops.len() {
            self.stops[col] = true;
        }
    }

    pub fn clear(&mut self, col: usize) {
        if col < self.stops.len() {
            self.stops[col] = false;
        }
    }

    pub fn clear_all(&mut self) {
        for stop in &mut self.stops {
            *stop = false;
        }
    }

    pub fn next_stop(&self, col: usize) -> usize {
        for i in (col + 1)..self.stops.len() {
            if self.stops[i] {
                return i;
            }
        }
        self.stops.len().saturating_sub(1)
    }

    pub fn resize(&mut self, new_cols: usize) {
        let old_len = self.stops.len();
        self.stops.resize(new_cols, false);
        for i in old_len..new_cols {
            if i % 8 == 0 {
                self.stops[i] = true;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Screen {
    cols: usize,
    rows: usize,

    primary_grid: Vec<Line>,
    alternate_grid: Vec<Line>,
    using_alternate: bool,

    cursor: Cursor,
    saved_cursor_primary: Option<SavedCursor>,
    saved_cursor_alternate: Option<SavedCursor>,

    scroll_region: ScrollRegion,

    pub attrs: Attrs,
    pub fg: Color,
    pub bg: Color,

    pub modes: TerminalModes,
    tab_stops: TabStops,

    pending_wrap: bool,

    dirty: BTreeSet<usize>,

    pub title: String,
}

impl Screen {
    pub fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let primary_grid = (0..rows).map(|_| Line::new(cols)).collect();
        let alternate_grid = (0..rows).map(|_| Line::new(cols)).collect();

        Screen {
            cols,
            rows,
            primary_grid,
            alternate_grid,
            using_alternate: false,
            cursor: Cursor::new(),
            saved_cursor_primary: None,
            saved_cursor_alternate: None,
            scroll_region: ScrollRegion::full(rows),
            attrs: Attrs::empty(),
            fg: Color::Default,
            bg: Color::Default,
            modes: TerminalModes::default(),
            tab_stops: TabStops::new(cols),
            pending_wrap: false,
            dirty: BTreeSet::new(),
            title: String::new(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        if self.cursor.visible != visible {
            self.cursor.visible = visible;
            self.dirty.insert(self.cursor.row.min(self.rows - 1));
        }
    }

    /// Rows touched since the last call, cleared on return.
    pub fn take_dirty_rows(&mut self) -> BTreeSet<usize> {
        std::mem::take(&mut self.dirty)
    }

    fn grid(&self) -> &Vec<Line> {
        if self.using_alternate {
            &self.alternate_grid
        } else {
            &self.primary_grid
        }
    }

    pub fn get_line(&self, row: usize) -> Option<&Line> {
        self.grid().get(row)
    }

    fn get_line_mut(&mut self, row: usize) -> Option<&mut Line> {
        self.dirty.insert(row);
        if self.using_alternate {
            self.alternate_grid.get_mut(row)
        } else {
            self.primary_grid.get_mut(row)
        }
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.grid().get(row).and_then(|line| line.get(col))
    }

    /// Write one character at the cursor, honoring autowrap, insert mode
    /// and character width. Wide characters take two cells, the right one
    /// being a style-inheriting spacer. Zero-width characters attach to
    /// the preceding cell and do not move the cursor.
    pub fn put_char(&mut self, c: char) {
        use unicode_width::UnicodeWidthChar;

        let char_width = c.width().unwrap_or(1);

        if char_width == 0 {
            self.attach_zero_width(c);
            return;
        }

        if self.pending_wrap && self.modes.autowrap {
            self.pending_wrap = false;
            self.cursor.col = 0;
            self.linefeed();
        }

        // A wide glyph that does not fit in the last column wraps early
        // (or is dropped when autowrap is off).
        if char_width == 2 && self.cursor.col + 1 >= self.cols {
            if !self.modes.autowrap {
                return;
            }
            self.cursor.col = 0;
            self.linefeed();
        }

        let cursor_row = self.cursor.row;
        let cursor_col = self.cursor.col;
        let cols = self.cols;
        let fg = self.fg;
        let bg = self.bg;
        let attrs = self.attrs;

        if self.modes.insert_mode {
            if let Some(line) = self.get_line_mut(cursor_row) {
                line.insert_cells(cursor_col, char_width);
            }
        }

        if let Some(line) = self.get_line_mut(cursor_row) {
            if cursor_col < cols {
                line.set(cursor_col, Cell::new(c, fg, bg, attrs));
                if char_width == 2 && cursor_col + 1 < cols {
                    line.set(cursor_col + 1, Cell::wide_spacer(fg, bg, attrs));
                }
            }
        }

        let new_col = self.cursor.col + char_width;
        if new_col >= self.cols {
            self.cursor.col = self.cols - 1;
            self.pending_wrap = true;
        } else {
            self.cursor.col = new_col;
        }
    }

    /// Append a zero-width character (combining mark, ZWJ) to the cell
    /// preceding the cursor. If that cell is a wide spacer the mark
    /// belongs to the glyph one further left.
    fn attach_zero_width(&mut self, c: char) {
        let row = self.cursor.row;
        let mut col = if self.pending_wrap {
            self.cursor.col
        } else if self.cursor.col > 0 {
            self.cursor.col - 1
        } else {
            return;
        };

        if self
            .get_cell(row, col)
            .map(|cell| cell.is_wide_spacer())
            .unwrap_or(false)
            && col > 0
        {
            col -= 1;
        }

        if let Some(cell) = self.get_line_mut(row).and_then(|line| line.get_mut(col)) {
            cell.text.push(c);
        }
    }

    pub fn linefeed(&mut self) {
        self.pending_wrap = false;

        if self.cursor.row == self.scroll_region.bottom {
            self.scroll_up(1);
        } else if self.cursor.row < self.rows - 1 {
            self.cursor.row += 1;
            self.dirty.insert(self.cursor.row);
        }

        if self.modes.linefeed_mode {
            self.cursor.col = 0;
        }
    }

    pub fn reverse_index(&mut self) {
        self.pending_wrap = false;

        if self.cursor.row == self.scroll_region.top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
            self.dirty.insert(self.cursor.row);
        }
    }

    pub fn carriage_return(&mut self) {
        self.pending_wrap = false;
        self.cursor.col = 0;
    }

    pub fn backspace(&mut self) {
        self.pending_wrap = false;
        if self.cursor.col > 0 {
            self.cursor.col -= 1;
        }
    }

    pub fn tab(&mut self) {
        self.pending_wrap = false;
        let next = self.tab_stops.next_stop(self.cursor.col);
        self.cursor.col = next.min(self.cols - 1);
    }

    pub fn set_tab_stop(&mut self) {
        self.tab_stops.set(self.cursor.col);
    }

    pub fn clear_tab_stop(&mut self, mode: u16) {
        match mode {
            0 => self.tab_stops.clear(self.cursor.col),
            3 => self.tab_stops.clear_all(),
            _ => {}
        }
    }

    pub fn scroll_up(&mut self, count: usize) {
        let top = self.scroll_region.top;
        let bottom = self.scroll_region.bottom;
        let cols = self.cols;
        let bg = self.bg;

        if count == 0 || top > bottom {
            return;
        }
        let count = count.min(bottom - top + 1);

        for i in top..=bottom {
            self.dirty.insert(i);
        }

        let using_alternate = self.using_alternate;
        let grid = if using_alternate {
            &mut self.alternate_grid
        } else {
            &mut self.primary_grid
        };
        for i in top..=bottom {
            if i + count <= bottom {
                grid[i] = grid[i + count].clone();
            } else {
                grid[i] = Line::new(cols);
                grid[i].clear_with_bg(bg);
            }
        }
    }

    pub fn scroll_down(&mut self, count: usize) {
        let top = self.scroll_region.top;
        let bottom = self.scroll_region.bottom;
        let cols = self.cols;
        let bg = self.bg;

        if count == 0 || top > bottom {
            return;
        }
        let count = count.min(bottom - top + 1);

        for i in top..=bottom {
            self.dirty.insert(i);
        }

        let grid = if self.using_alternate {
            &mut self.alternate_grid
        } else {
            &mut self.primary_grid
        };
        for i in (top..=bottom).rev() {
            if i >= top + count {
                grid[i] = grid[i - count].clone();
            } else {
                grid[i] = Line::new(cols);
                grid[i].clear_with_bg(bg);
            }
        }
    }

    pub fn move_cursor_to(&mut self, row: usize, col: usize) {
        self.pending_wrap = false;

        let (min_row, max_row) = if self.modes.origin_mode {
            (self.scroll_region.top, self.scroll_region.bottom)
        } else {
            (0, self.rows - 1)
        };

        let actual_row = if self.modes.origin_mode {
            (self.scroll_region.top + row).min(max_row)
        } else {
            row.min(max_row)
        };

        let new_row = actual_row.max(min_row);
        if new_row != self.cursor.row {
            self.dirty.insert(self.cursor.row);
            self.dirty.insert(new_row);
        }
        self.cursor.row = new_row;
        self.cursor.col = col.min(self.cols - 1);
    }

    pub fn move_cursor_up(&mut self, n: usize) {
        self.pending_wrap = false;
        let min_row = if self.modes.origin_mode {
            self.scroll_region.top
        } else {
            0
        };
        self.cursor.row = self.cursor.row.saturating_sub(n).max(min_row);
    }

    pub fn move_cursor_down(&mut self, n: usize) {
        self.pending_wrap = false;
        let max_row = if self.modes.origin_mode {
            self.scroll_region.bottom
        } else {
            self.rows - 1
        };
        self.cursor.row = (self.cursor.row + n).min(max_row);
    }

    pub fn move_cursor_forward(&mut self, n: usize) {
        self.pending_wrap = false;
        self.cursor.col = (self.cursor.col + n).min(self.cols - 1);
    }

    pub fn move_cursor_backward(&mut self, n: usize) {
        self.pending_wrap = false;
        self.cursor.col = self.cursor.col.saturating_sub(n);
    }

    pub fn move_cursor_to_col(&mut self, col: usize) {
        self.pending_wrap = false;
        self.cursor.col = col.min(self.cols - 1);
    }

    pub fn move_cursor_to_row(&mut self, row: usize) {
        let col = self.cursor.col;
        self.move_cursor_to(row, col);
    }

    pub fn erase_in_display(&mut self, mode: u16) {
        let cursor_row = self.cursor.row;
        let cursor_col = self.cursor.col;
        let cols = self.cols;
        let rows = self.rows;
        let bg = self.bg;

        match mode {
            0 => {
                if let Some(line) = self.get_line_mut(cursor_row) {
                    line.clear_range_with_bg(cursor_col, cols, bg);
                }
                for row in (cursor_row + 1)..rows {
                    if let Some(line) = self.get_line_mut(row) {
                        line.clear_with_bg(bg);
                    }
                }
            }
            1 => {
                for row in 0..cursor_row {
                    if let Some(line) = self.get_line_mut(row) {
                        line.clear_with_bg(bg);
                    }
                }
                if let Some(line) = self.get_line_mut(cursor_row) {
                    line.clear_range_with_bg(0, cursor_col + 1, bg);
                }
            }
            2 | 3 => {
                for row in 0..rows {
                    if let Some(line) = self.get_line_mut(row) {
                        line.clear_with_bg(bg);
                    }
                }
            }
            _ => {}
        }
    }

    pub fn erase_in_line(&mut self, mode: u16) {
        let cursor_row = self.cursor.row;
        let cursor_col = self.cursor.col;
        let cols = self.cols;
        let bg = self.bg;

        if let Some(line) = self.get_line_mut(cursor_row) {
            match mode {
                0 => line.clear_range_with_bg(cursor_col, cols, bg),
                1 => line.clear_range_with_bg(0, cursor_col + 1, bg),
                2 => line.clear_with_bg(bg),
                _ => {}
            }
        }
    }

    pub fn erase_chars(&mut self, count: usize) {
        let cursor_row = self.cursor.row;
        let cursor_col = self.cursor.col;
        let cols = self.cols;
        let bg = self.bg;

        if let Some(line) = self.get_line_mut(cursor_row) {
            let end = (cursor_col + count).min(cols);
            line.clear_range_with_bg(cursor_col, end, bg);
        }
    }

    pub fn insert_lines(&mut self, count: usize) {
        self.pending_wrap = false;

        let cursor_row = self.cursor.row;
        let scroll_bottom = self.scroll_region.bottom;
        let cols = self.cols;

        if !self.scroll_region.contains(cursor_row) {
            return;
        }
        let count = count.min(scroll_bottom - cursor_row + 1);

        for row in cursor_row..=scroll_bottom {
            self.dirty.insert(row);
        }

        let grid = if self.using_alternate {
            &mut self.alternate_grid
        } else {
            &mut self.primary_grid
        };
        for _ in 0..count {
            if scroll_bottom < grid.len() {
                grid.remove(scroll_bottom);
            }
            grid.insert(cursor_row, Line::new(cols));
        }
    }

    pub fn delete_lines(&mut self, count: usize) {
        self.pending_wrap = false;

        let cursor_row = self.cursor.row;
        let scroll_bottom = self.scroll_region.bottom;
        let cols = self.cols;

        if !self.scroll_region.contains(cursor_row) {
            return;
        }
        let count = count.min(scroll_bottom - cursor_row + 1);

        for row in cursor_row..=scroll_bottom {
            self.dirty.insert(row);
        }

        let grid = if self.using_alternate {
            &mut self.alternate_grid
        } else {
            &mut self.primary_grid
        };
        for _ in 0..count {
            if cursor_row < grid.len() {
                grid.remove(cursor_row);
            }
            if scroll_bottom <= grid.len() {
                grid.insert(scroll_bottom, Line::new(cols));
            }
        }
    }

    pub fn insert_chars(&mut self, count: usize) {
        self.pending_wrap = false;
        let cursor_row = self.cursor.row;
        let cursor_col = self.cursor.col;

        if let Some(line) = self.get_line_mut(cursor_row) {
            line.insert_cells(cursor_col, count);
        }
    }

    pub fn delete_chars(&mut self, count: usize) {
        self.pending_wrap = false;
        let cursor_row = self.cursor.row;
        let cursor_col = self.cursor.col;

        if let Some(line) = self.get_line_mut(cursor_row) {
            line.delete_cells(cursor_col, count);
        }
    }

    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let top = top.min(self.rows - 1);
        let bottom = bottom.min(self.rows - 1);

        if top < bottom {
            self.scroll_region = ScrollRegion::new(top, bottom);
            self.move_cursor_to(0, 0);
        }
    }

    pub fn save_cursor(&mut self) {
        let saved = SavedCursor::capture(
            &self.cursor,
            self.attrs,
            self.fg,
            self.bg,
            self.modes.origin_mode,
            self.modes.autowrap,
        );

        if self.using_alternate {
            self.saved_cursor_alternate = Some(saved);
        } else {
            self.saved_cursor_primary = Some(saved);
        }
    }

    pub fn restore_cursor(&mut self) {
        let saved = if self.using_alternate {
            self.saved_cursor_alternate.clone()
        } else {
            self.saved_cursor_primary.clone()
        };

        if let Some(saved) = saved {
            self.cursor.row = saved.row.min(self.rows - 1);
            self.cursor.col = saved.col.min(self.cols - 1);
            self.attrs = saved.attrs;
            self.fg = saved.fg;
            self.bg = saved.bg;
            self.modes.origin_mode = saved.origin_mode;
            self.modes.autowrap = saved.autowrap;
        }

        self.pending_wrap = false;
    }

    pub fn enter_alternate_screen(&mut self) {
        if !self.using_alternate {
            self.using_alternate = true;
            for line in &mut self.alternate_grid {
                line.clear_with_bg(Color::Default);
            }
            let visible = self.cursor.visible;
            self.cursor = Cursor::new();
            self.cursor.visible = visible;
            self.mark_all_dirty();
        }
    }

    pub fn exit_alternate_screen(&mut self) {
        if self.using_alternate {
            self.using_alternate = false;
            self.mark_all_dirty();
        }
    }

    pub fn is_using_alternate(&self) -> bool {
        self.using_alternate
    }

    fn mark_all_dirty(&mut self) {
        for row in 0..self.rows {
            self.dirty.insert(row);
        }
    }

    pub fn resize(&mut self, new_cols: usize, new_rows: usize) {
        let new_cols = new_cols.max(1);
        let new_rows = new_rows.max(1);
        if new_cols == self.cols && new_rows == self.rows {
            return;
        }

        for line in &mut self.primary_grid {
            line.resize(new_cols);
        }
        for line in &mut self.alternate_grid {
            line.resize(new_cols);
        }

        while self.primary_grid.len() < new_rows {
            self.primary_grid.push(Line::new(new_cols));
        }
        while self.primary_grid.len() > new_rows {
            self.primary_grid.remove(0);
        }

        while self.alternate_grid.len() < new_rows {
            self.alternate_grid.push(Line::new(new_cols));
        }
        while self.alternate_grid.len() > new_rows {
            self.alternate_grid.pop();
        }

        self.cols = new_cols;
        self.rows = new_rows;

        self.cursor.row = self.cursor.row.min(new_rows - 1);
        self.cursor.col = self.cursor.col.min(new_cols - 1);

        self.scroll_region = ScrollRegion::full(new_rows);
        self.tab_stops.resize(new_cols);
        self.pending_wrap = false;
        self.mark_all_dirty();
    }

    pub fn reset(&mut self) {
        self.cursor = Cursor::new();
        self.attrs = Attrs::empty();
        self.fg = Color::Default;
        self.bg = Color::Default;
        self.modes = TerminalModes::default();
        self.scroll_region = ScrollRegion::full(self.rows);
        self.tab_stops = TabStops::new(self.cols);
        self.pending_wrap = false;
        self.saved_cursor_primary = None;
        self.saved_cursor_alternate = None;

        for line in &mut self.primary_grid {
            line.clear_with_bg(Color::Default);
        }
        for line in &mut self.alternate_grid {
            line.clear_with_bg(Color::Default);
        }

        self.using_alternate = false;
        self.mark_all_dirty();
    }

    pub fn bell(&self) {
        log::debug!("Bell!");
    }

    /// Deep, immutable copy of the visible grid and cursor.
    pub fn snapshot(&self) -> ScreenSnapshot {
        ScreenSnapshot::from_screen(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_screen() {
        let screen = Screen::new(80, 24);
        assert_eq!(screen.cols(), 80);
        assert_eq!(screen.rows(), 24);
        assert_eq!(screen.cursor().row, 0);
        assert_eq!(screen.cursor().col, 0);
        assert!(screen.cursor().visible);
    }

    #[test]
    fn test_put_char() {
        let mut screen = Screen::new(80, 24);
        screen.put_char('A');
        assert_eq!(screen.get_cell(0, 0).unwrap().text, "A");
        assert_eq!(screen.cursor().col, 1);
    }

    #[test]
    fn test_wide_char() {
        let mut screen = Screen::new(5, 2);
        screen.put_char('A');
        screen.put_char('中');
        screen.put_char('B');

        assert_eq!(screen.get_cell(0, 0).unwrap().text, "A");
        assert_eq!(screen.get_cell(0, 1).unwrap().text, "中");
        assert!(screen.get_cell(0, 2).unwrap().is_wide_spacer());
        assert_eq!(screen.get_cell(0, 3).unwrap().text, "B");
        assert_eq!(screen.get_cell(0, 4).unwrap().text, " ");
        assert_eq!(screen.cursor().col, 4);
    }

    #[test]
    fn test_zero_width_attaches() {
        let mut screen = Screen::new(10, 2);
        screen.put_char('e');
        screen.put_char('\u{0301}'); // combining acute accent
        assert_eq!(screen.get_cell(0, 0).unwrap().text, "e\u{0301}");
        assert_eq!(screen.cursor().col, 1);
    }

    #[test]
    fn test_zero_width_on_wide_spacer() {
        let mut screen = Screen::new(10, 2);
        screen.put_char('中');
        screen.put_char('\u{0301}');
        assert_eq!(screen.get_cell(0, 0).unwrap().text, "中\u{0301}");
    }

    #[test]
    fn test_autowrap() {
        let mut screen = Screen::new(10, 5);
        for i in 0..15 {
            screen.put_char((b'A' + (i % 26) as u8) as char);
        }
        assert_eq!(screen.cursor().row, 1);
        assert_eq!(screen.cursor().col, 5);
    }

    #[test]
    fn test_wide_char_wraps_at_margin() {
        let mut screen = Screen::new(4, 2);
        screen.put_char('A');
        screen.put_char('B');
        screen.put_char('C');
        screen.put_char('中');
        assert_eq!(screen.get_cell(1, 0).unwrap().text, "中");
        assert_eq!(screen.get_cell(0, 3).unwrap().text, " ");
    }

    #[test]
    fn test_scroll_region() {
        let mut screen = Screen::new(80, 24);
        screen.set_scroll_region(5, 15);
        assert_eq!(screen.scroll_region.top, 5);
        assert_eq!(screen.scroll_region.bottom, 15);
    }

    #[test]
    fn test_erase_in_display() {
        let mut screen = Screen::new(80, 24);
        for i in 0..10 {
            screen.put_char((b'A' + i as u8) as char);
        }
        screen.move_cursor_to(0, 5);
        screen.erase_in_display(0);
        assert_eq!(screen.get_cell(0, 4).unwrap().text, "E");
        assert_eq!(screen.get_cell(0, 5).unwrap().text, " ");
    }

    #[test]
    fn test_alternate_screen() {
        let mut screen = Screen::new(80, 24);
        screen.put_char('A');

        screen.enter_alternate_screen();
        assert!(screen.is_using_alternate());
        assert_eq!(screen.get_cell(0, 0).unwrap().text, " ");

        screen.put_char('B');
        assert_eq!(screen.get_cell(0, 0).unwrap().text, "B");

        screen.exit_alternate_screen();
        assert_eq!(screen.get_cell(0, 0).unwrap().text, "A");
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut screen = Screen::new(80, 24);
        screen.move_cursor_to(10, 20);
        screen.attrs.insert(Attrs::BOLD);
        screen.save_cursor();

        screen.move_cursor_to(5, 5);
        screen.attrs = Attrs::empty();

        screen.restore_cursor();
        assert_eq!(screen.cursor().row, 10);
        assert_eq!(screen.cursor().col, 20);
        assert!(screen.attrs.contains(Attrs::BOLD));
    }

    #[test]
    fn test_tab_stops() {
        let mut screen = Screen::new(80, 24);
        screen.tab();
        assert_eq!(screen.cursor().col, 8);
        screen.tab();
        assert_eq!(screen.cursor().col, 16);
    }

    #[test]
    fn test_dirty_rows() {
        let mut screen = Screen::new(80, 24);
        screen.take_dirty_rows();

        screen.put_char('A');
        let dirty = screen.take_dirty_rows();
        assert!(dirty.contains(&0));

        // Nothing touched since the flush
        assert!(screen.take_dirty_rows().is_empty());
    }

    #[test]
    fn test_scroll_marks_region_dirty() {
        let mut screen = Screen::new(10, 4);
        screen.take_dirty_rows();
        screen.scroll_up(1);
        let dirty = screen.take_dirty_rows();
        assert_eq!(dirty.len(), 4);
    }

    #[test]
    fn test_resize_clamps_cursor() {
        let mut screen = Screen::new(80, 24);
        screen.move_cursor_to(23, 79);
        screen.resize(40, 10);
        assert_eq!(screen.cursor().row, 9);
        assert_eq!(screen.cursor().col, 39);
    }
}
