//! Option resolution for the CLI: geometry parsing, template lookup,
//! shell selection and temp-file naming.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use svgcast_pty::WindowSize;

use crate::error::Error;
use crate::template::TemplateError;
use crate::templates;

/// Parse a `COLSxROWS` geometry argument
pub fn parse_geometry(arg: &str) -> Result<(u16, u16), Error> {
    let parsed = arg.split_once('x').and_then(|(cols, rows)| {
        let cols: u16 = cols.parse().ok()?;
        let rows: u16 = rows.parse().ok()?;
        if cols == 0 || rows == 0 {
            None
        } else {
            Some((cols, rows))
        }
    });
    parsed.ok_or_else(|| {
        Error::Usage(format!(
            "invalid geometry {:?}: expected COLSxROWS with positive integers",
            arg
        ))
    })
}

/// Resolve `-t`: a built-in template name, else a filesystem path
pub fn load_template_source(name_or_path: &str) -> Result<String, Error> {
    if let Some(source) = templates::builtin(name_or_path) {
        return Ok(source.to_string());
    }
    match fs::read_to_string(name_or_path) {
        Ok(source) => Ok(source),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::Template(
            TemplateError::UnknownTemplate(name_or_path.to_string()),
        )),
        Err(e) => Err(Error::Template(TemplateError::Io(e))),
    }
}

/// The program recorded when `-c` is absent
pub fn default_shell() -> String {
    env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

/// Split a `-c` argument on whitespace; quoting is left to `sh -c`
pub fn split_command(arg: &str) -> Vec<String> {
    arg.split_whitespace().map(str::to_string).collect()
}

/// Current terminal size, falling back to 80x24
pub fn terminal_geometry() -> (u16, u16) {
    match WindowSize::get_from_fd(libc::STDOUT_FILENO) {
        Ok(size) if size.cols > 0 && size.rows > 0 => (size.cols, size.rows),
        _ => {
            log::debug!("could not read terminal size, using 80x24");
            (80, 24)
        }
    }
}

/// A fresh file under the system temp dir, `termtosvg_` prefix and a
/// 6-char random suffix, persisted so the caller can hand out the path.
pub fn temp_output_path(extension: &str) -> Result<PathBuf, Error> {
    let tmp_dir = env::temp_dir();
    let file = tempfile::Builder::new()
        .prefix("termtosvg_")
        .suffix(extension)
        .rand_bytes(6)
        .tempfile_in(&tmp_dir)
        .map_err(|e| Error::io(&tmp_dir, e))?;
    let (_, path) = file.keep().map_err(|e| Error::io(&tmp_dir, e.error))?;
    Ok(path)
}

/// A fresh directory under the system temp dir for still frames
pub fn temp_output_dir() -> Result<PathBuf, Error> {
    let tmp_dir = env::temp_dir();
    let dir = tempfile::Builder::new()
        .prefix("termtosvg_")
        .rand_bytes(6)
        .tempdir_in(&tmp_dir)
        .map_err(|e| Error::io(&tmp_dir, e))?;
    Ok(dir.into_path())
}
