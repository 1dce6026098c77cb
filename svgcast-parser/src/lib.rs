//! svgcast escape sequence parser
//!
//! A streaming, allocation-light parser for the VT/xterm byte protocol.
//! Feed it chunks of bytes as they arrive; it returns typed actions and
//! carries partial sequences across chunk boundaries.

pub mod action;
pub mod parser;

pub use action::{c0, c1, Action, CsiAction, EscAction, OscAction};
pub use parser::Parser;
