//! svgcast library: record a terminal session through a PTY and render
//! the byte stream as an animated SVG.
//!
//! The render pipeline is `asciicast` (decode) → `replay` (drive the
//! emulator, emit snapshots) → `timing` (normalise frame durations) →
//! `layout` (group cells into runs) → `svg` (compose the document from a
//! validated `template`). The `record` module is the PTY supervisor that
//! produces casts in the first place.
//!
//! The pipeline is strictly single-threaded; the only mutable state is
//! the emulator inside `terminal::Terminal`, owned exclusively by the
//! replay driver.

pub mod asciicast;
pub mod config;
pub mod error;
pub mod layout;
pub mod record;
pub mod replay;
pub mod svg;
pub mod template;
pub mod templates;
pub mod terminal;
pub mod timing;
