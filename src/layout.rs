//! Cell-to-geometry layout.
//!
//! Partitions each row into maximal runs of equally styled cells and
//! produces the background rectangles and text spans the compositor
//! turns into SVG. Inverse cells swap their colors before comparison,
//! and the visible cursor is overlaid as one more inversion at its cell,
//! independent of the cell's own inverse attribute.
//!
//! Two rules keep the output small: adjacent identical runs fuse (the
//! partition is maximal), and all-space runs with the default background
//! and no visible decoration are not emitted at all, the frame
//! background showing through instead.

use svgcast_core::cell::{Attrs, Cell};
use svgcast_core::{Color, Rgb, ScreenSnapshot};

/// How a run is painted: a stylesheet class for palette colors, a
/// literal fill for 24-bit colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Paint {
    /// The theme's default text color (class "foreground")
    Foreground,
    /// The theme's default background color (class "background")
    Background,
    /// One of the 16 palette colors (class "colorN")
    Palette(u8),
    /// A 24-bit color, emitted verbatim
    Rgb(Rgb),
}

impl Paint {
    fn from_fg(color: Color) -> Paint {
        match color {
            Color::Default => Paint::Foreground,
            Color::Named(named) => Paint::Palette(named.index()),
            Color::Rgb(rgb) => Paint::Rgb(rgb),
        }
    }

    fn from_bg(color: Color) -> Paint {
        match color {
            Color::Default => Paint::Background,
            Color::Named(named) => Paint::Palette(named.index()),
            Color::Rgb(rgb) => Paint::Rgb(rgb),
        }
    }

    /// CSS class name for palette paints; None for literal colors
    pub fn class(&self) -> Option<String> {
        match self {
            Paint::Foreground => Some("foreground".to_string()),
            Paint::Background => Some("background".to_string()),
            Paint::Palette(index) => Some(format!("color{}", index)),
            Paint::Rgb(_) => None,
        }
    }

    /// Literal fill value for 24-bit paints; None for palette classes
    pub fn fill(&self) -> Option<String> {
        match self {
            Paint::Rgb(rgb) => Some(rgb.to_hex()),
            _ => None,
        }
    }
}

/// A background rectangle spanning whole cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgRect {
    pub col: usize,
    pub width_cells: usize,
    pub paint: Paint,
}

/// A horizontal span of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub col: usize,
    pub width_cells: usize,
    pub text: String,
    pub paint: Paint,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

/// Layout of one row: rectangles first, then text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowLayout {
    pub rects: Vec<BgRect>,
    pub texts: Vec<TextRun>,
}

impl RowLayout {
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty() && self.texts.is_empty()
    }
}

/// Effective per-cell style after the inverse swap
#[derive(Debug, Clone, PartialEq, Eq)]
struct CellStyle {
    fg: Paint,
    bg: Paint,
    attrs: Attrs,
}

fn effective_style(cell: &Cell, under_cursor: bool) -> CellStyle {
    let fg = Paint::from_fg(cell.fg);
    let bg = Paint::from_bg(cell.bg);
    // The cursor overlay inverts once more, whatever the cell says
    let inverted = cell.attrs.contains(Attrs::INVERSE) ^ under_cursor;
    let (fg, bg) = if inverted { (bg, fg) } else { (fg, bg) };
    CellStyle {
        fg,
        bg,
        attrs: cell.attrs.without_inverse(),
    }
}

/// Lay out one row of cells. `cursor_col` is the column of the visible
/// cursor when it sits on this row.
pub fn layout_row(cells: &[Cell], cursor_col: Option<usize>) -> RowLayout {
    let mut layout = RowLayout::default();

    let mut run_start = 0usize;
    let mut run_style: Option<CellStyle> = None;
    let mut run_text = String::new();
    let mut run_cells = 0usize;

    let mut flush =
        |layout: &mut RowLayout, start: usize, cells_wide: usize, text: &str, style: &CellStyle| {
            if cells_wide == 0 {
                return;
            }
            if style.bg != Paint::Background {
                layout.rects.push(BgRect {
                    col: start,
                    width_cells: cells_wide,
                    paint: style.bg,
                });
            }
            let decorated = style.attrs.contains(Attrs::UNDERLINE)
                || style.attrs.contains(Attrs::STRIKETHROUGH);

            // Trailing spaces over the default background carry nothing;
            // dropping them keeps rows from spanning the full width.
            let mut text = text;
            let mut cells_wide = cells_wide;
            if style.bg == Paint::Background && !decorated {
                let trimmed = text.trim_end_matches(' ');
                cells_wide -= text.len() - trimmed.len();
                text = trimmed;
            }

            let all_spaces = text.chars().all(|c| c == ' ');
            if text.is_empty() || (all_spaces && !decorated) {
                return;
            }
            layout.texts.push(TextRun {
                col: start,
                width_cells: cells_wide,
                // Unbreakable spaces survive XML whitespace handling
                text: text.replace(' ', "\u{00A0}"),
                paint: style.fg,
                bold: style.attrs.contains(Attrs::BOLD),
                italic: style.attrs.contains(Attrs::ITALIC),
                underline: style.attrs.contains(Attrs::UNDERLINE),
                strikethrough: style.attrs.contains(Attrs::STRIKETHROUGH),
            });
        };

    for (col, cell) in cells.iter().enumerate() {
        let under_cursor = cursor_col == Some(col);
        let style = effective_style(cell, under_cursor);

        // Wide-glyph spacers extend the current run without text; a
        // spacer under the cursor still needs its own inverted rect.
        let continues = match &run_style {
            Some(current) => *current == style,
            None => false,
        };

        if !continues {
            if let Some(current) = run_style.take() {
                flush(&mut layout, run_start, run_cells, &run_text, &current);
            }
            run_start = col;
            run_text.clear();
            run_cells = 0;
            run_style = Some(style);
        }

        run_text.push_str(&cell.text);
        // One grid cell per column; a wide glyph's second column is its
        // spacer cell, so counting cells counts columns.
        run_cells += 1;
    }

    if let Some(current) = run_style.take() {
        flush(&mut layout, run_start, run_cells, &run_text, &current);
    }

    layout
}

/// Lay out a full snapshot. Rows with nothing to draw are omitted.
pub fn layout_screen(snapshot: &ScreenSnapshot) -> Vec<(usize, RowLayout)> {
    let cursor = &snapshot.cursor;
    (0..snapshot.rows)
        .filter_map(|row| {
            let cursor_col = if cursor.visible && cursor.row == row {
                Some(cursor.col)
            } else {
                None
            };
            let layout = layout_row(snapshot.row(row), cursor_col);
            if layout.is_empty() {
                None
            } else {
                Some((row, layout))
            }
        })
        .collect()
}
