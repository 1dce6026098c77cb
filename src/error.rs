//! Error taxonomy and exit-code mapping.
//!
//! Parsing errors (cast, template) abort the operation before any output
//! is written. Emulator and layout errors are fatal: a corrupt screen
//! poisons every subsequent frame, so there is no local recovery.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::asciicast::CastError;
use crate::template::TemplateError;

/// Process exit codes, as surfaced by the CLI
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const USAGE: i32 = 1;
    pub const INVALID_INPUT: i32 = 2;
    pub const IO_FAILURE: i32 = 3;
    pub const SIGINT: i32 = 130;
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("cast contains no output events, nothing to render")]
    EmptyCast,

    #[error("terminal emulator state diverged: {0}")]
    EmulatorOverflow(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Pty(#[from] svgcast_pty::PtyError),
}

impl Error {
    /// Attach a path to a bare I/O error
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) => exit_code::USAGE,
            Error::Cast(CastError::Io(_)) => exit_code::IO_FAILURE,
            Error::Cast(_) => exit_code::INVALID_INPUT,
            Error::Template(TemplateError::Io(_)) => exit_code::IO_FAILURE,
            Error::Template(_) => exit_code::INVALID_INPUT,
            Error::EmptyCast => exit_code::INVALID_INPUT,
            Error::EmulatorOverflow(_) => exit_code::IO_FAILURE,
            Error::Io { .. } => exit_code::IO_FAILURE,
            Error::Pty(_) => exit_code::IO_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::Usage("bad".into()).exit_code(), 1);
        assert_eq!(Error::EmptyCast.exit_code(), 2);
        assert_eq!(
            Error::EmulatorOverflow("rows diverged".into()).exit_code(),
            3
        );
        assert_eq!(
            Error::io("/tmp/x", io::Error::new(io::ErrorKind::NotFound, "gone")).exit_code(),
            3
        );
    }

    #[test]
    fn test_io_error_carries_path() {
        let err = Error::io("/tmp/out.svg", io::Error::new(io::ErrorKind::Other, "full"));
        assert!(err.to_string().contains("/tmp/out.svg"));
    }
}
