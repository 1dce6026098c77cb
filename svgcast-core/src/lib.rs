//! svgcast terminal core
//!
//! Platform-independent terminal screen model:
//! - Cell representation with character, colors and attributes
//! - Screen with primary and alternate grids, modes and dirty tracking
//! - Immutable snapshots for rendering and comparison
//!
//! This crate has no rendering or I/O dependencies and can be driven
//! headlessly.

pub mod cell;
pub mod color;
pub mod cursor;
pub mod line;
pub mod screen;
pub mod snapshot;

pub use cell::{Attrs, Cell};
pub use color::{Color, NamedColor, Rgb, Theme};
pub use cursor::{Cursor, SavedCursor};
pub use line::Line;
pub use screen::Screen;
pub use snapshot::{ScreenSnapshot, SnapshotCursor};

/// Default screen geometry used when none is known
pub const DEFAULT_COLS: usize = 80;
pub const DEFAULT_ROWS: usize = 24;
