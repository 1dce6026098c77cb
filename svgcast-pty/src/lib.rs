//! svgcast PTY layer
//!
//! Opens pseudo-terminals and runs child processes under them. Used by
//! the recorder; the renderer never touches this crate.

pub mod child;
pub mod error;
pub mod pty;
pub mod size;

pub use child::{Child, ChildBuilder};
pub use error::PtyError;
pub use pty::Pty;
pub use size::WindowSize;
