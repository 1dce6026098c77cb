//! Error types for PTY operations.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("failed to open PTY master: {0}")]
    OpenMaster(#[source] io::Error),

    #[error("failed to grant PTY access: {0}")]
    GrantPty(#[source] io::Error),

    #[error("failed to unlock PTY: {0}")]
    UnlockPty(#[source] io::Error),

    #[error("failed to get slave name: {0}")]
    GetSlaveName(#[source] io::Error),

    #[error("failed to open slave PTY: {0}")]
    OpenSlave(#[source] io::Error),

    #[error("failed to fork process: {0}")]
    Fork(#[source] nix::Error),

    #[error("failed to set window size: {0}")]
    SetWindowSize(#[source] io::Error),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
