//! Session recorder: the PTY supervisor.
//!
//! Runs the command under a pseudo-terminal, relays the user's keyboard
//! to the child and the child's output to the real terminal, and streams
//! every output chunk into the cast writer, timestamped at the moment it
//! is read off the master. The event loop is a readiness poller, which
//! reports EOF on the PTY master reliably across platforms.
//!
//! On SIGINT the loop stops, the master is closed and the partial cast
//! is already flushed line by line; the caller exits 130.

use std::io::{self, Read, Write};
use std::os::fd::BorrowedFd;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use nix::sys::signal::{self, SigHandler, Signal};
use polling::{Event, Events, Poller};
use svgcast_pty::{ChildBuilder, WindowSize};

use crate::asciicast::{CastWriter, Header};
use crate::error::Error;

const STDIN_KEY: usize = 0;
const MASTER_KEY: usize = 1;
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[derive(Debug, Clone)]
pub struct RecordOptions {
    /// Program and arguments to run; defaults to $SHELL, then /bin/sh
    pub command: Vec<String>,
    pub cols: u16,
    pub rows: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordOutcome {
    pub interrupted: bool,
    pub child_exit: i32,
}

/// Save the terminal state on entry, restore it on drop. Recording from
/// something that is not a terminal (a pipe, CI) skips raw mode.
struct RawModeGuard {
    original: nix::sys::termios::Termios,
}

impl RawModeGuard {
    fn new() -> Option<Self> {
        use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices};

        let original = termios::tcgetattr(io::stdin()).ok()?;
        let mut raw = original.clone();
        raw.local_flags.remove(LocalFlags::ICANON);
        raw.local_flags.remove(LocalFlags::ECHO);
        raw.local_flags.remove(LocalFlags::ISIG);
        raw.local_flags.remove(LocalFlags::IEXTEN);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &raw).ok()?;
        Some(RawModeGuard { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        use nix::sys::termios::{self, SetArg};
        let _ = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &self.original);
    }
}

/// Record one session. The header is written first; output events
/// stream through `writer` as they happen.
pub fn record_session<W: Write>(
    opts: &RecordOptions,
    writer: &mut CastWriter<W>,
) -> Result<RecordOutcome, Error> {
    let program = opts
        .command
        .first()
        .ok_or_else(|| Error::Usage("empty command".to_string()))?;

    let mut header = Header::new(opts.cols, opts.rows);
    header.timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs());
    writer
        .header(&header)
        .map_err(|e| Error::io("cast output", e))?;

    let mut child = ChildBuilder::new(program)?
        .args(opts.command.iter().skip(1))?
        .size(WindowSize::new(opts.rows, opts.cols))
        .spawn()?;
    child
        .set_nonblocking(true)
        .map_err(|e| Error::io("pty master", e))?;
    log::debug!("spawned {:?} as pid {}", program, child.pid());

    let _raw_guard = RawModeGuard::new();

    INTERRUPTED.store(false, Ordering::SeqCst);
    let previous_handler =
        unsafe { signal::signal(Signal::SIGINT, SigHandler::Handler(on_sigint)) }
            .map_err(|e| Error::io("signal handler", io::Error::other(e)))?;

    let outcome = supervise(&mut child, writer);

    unsafe {
        let _ = signal::signal(Signal::SIGINT, previous_handler);
    }

    let outcome = outcome?;
    log::debug!(
        "recording finished (interrupted: {}, child exit: {})",
        outcome.interrupted,
        outcome.child_exit
    );
    Ok(outcome)
}

fn supervise<W: Write>(
    child: &mut svgcast_pty::Child,
    writer: &mut CastWriter<W>,
) -> Result<RecordOutcome, Error> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let master_fd = child.master_fd();

    let poller = Poller::new().map_err(|e| Error::io("poller", e))?;
    unsafe {
        poller
            .add(stdin.as_raw_fd(), Event::readable(STDIN_KEY))
            .map_err(|e| Error::io("poller", e))?;
        poller
            .add(master_fd, Event::readable(MASTER_KEY))
            .map_err(|e| Error::io("poller", e))?;
    }

    let start = Instant::now();
    let mut events = Events::new();
    let mut stdin_buf = [0u8; 4096];
    let mut master_buf = [0u8; 65536];
    let mut stdin_open = true;
    let mut interrupted = false;

    'outer: loop {
        if INTERRUPTED.load(Ordering::SeqCst) {
            interrupted = true;
            break;
        }

        events.clear();
        match poller.wait(&mut events, Some(POLL_TIMEOUT)) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io("poller", e)),
        }

        for event in events.iter() {
            match event.key {
                STDIN_KEY => {
                    let n = stdin.lock().read(&mut stdin_buf).unwrap_or(0);
                    if n == 0 {
                        stdin_open = false;
                        let _ = poller.delete(unsafe { BorrowedFd::borrow_raw(stdin.as_raw_fd()) });
                        continue;
                    }
                    child
                        .write_all(&stdin_buf[..n])
                        .map_err(|e| Error::io("pty master", e))?;
                    poller
                        .modify(
                            unsafe { BorrowedFd::borrow_raw(stdin.as_raw_fd()) },
                            Event::readable(STDIN_KEY),
                        )
                        .map_err(|e| Error::io("poller", e))?;
                }
                MASTER_KEY => {
                    loop {
                        match child.read(&mut master_buf) {
                            Ok(0) => break 'outer,
                            Ok(n) => {
                                // Timestamp at dequeue time
                                let elapsed = start.elapsed().as_millis() as u64;
                                stdout
                                    .write_all(&master_buf[..n])
                                    .and_then(|_| stdout.flush())
                                    .map_err(|e| Error::io("stdout", e))?;
                                writer
                                    .output(elapsed, &master_buf[..n])
                                    .map_err(|e| Error::io("cast output", e))?;
                            }
                            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                            // EIO is how the master reports the slave side
                            // being fully closed
                            Err(e) if e.raw_os_error() == Some(libc::EIO) => break 'outer,
                            Err(e) => return Err(Error::io("pty master", e)),
                        }
                    }
                    poller
                        .modify(
                            unsafe { BorrowedFd::borrow_raw(master_fd) },
                            Event::readable(MASTER_KEY),
                        )
                        .map_err(|e| Error::io("poller", e))?;
                }
                _ => {}
            }
        }

        if !stdin_open || events.is_empty() {
            // Reap an exited child once the master has drained
            if let Ok(Some(_)) = child.try_wait() {
                match child.read(&mut master_buf) {
                    Ok(n) if n > 0 => {
                        let elapsed = start.elapsed().as_millis() as u64;
                        stdout
                            .write_all(&master_buf[..n])
                            .and_then(|_| stdout.flush())
                            .map_err(|e| Error::io("stdout", e))?;
                        writer
                            .output(elapsed, &master_buf[..n])
                            .map_err(|e| Error::io("cast output", e))?;
                    }
                    _ => break,
                }
            }
        }
    }

    let child_exit = if interrupted {
        child.try_wait().ok().flatten().unwrap_or(0)
    } else {
        child.wait().map_err(|e| Error::io("child", e))?
    };

    Ok(RecordOutcome {
        interrupted,
        child_exit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asciicast::parse_cast;

    #[test]
    fn test_record_echo_session() {
        let opts = RecordOptions {
            command: vec!["/bin/echo".to_string(), "recorded".to_string()],
            cols: 80,
            rows: 24,
        };
        let mut buf = Vec::new();
        let outcome = {
            let mut writer = CastWriter::new(&mut buf);
            record_session(&opts, &mut writer).expect("record")
        };
        assert!(!outcome.interrupted);
        assert_eq!(outcome.child_exit, 0);

        let text = String::from_utf8_lossy(&buf).into_owned();
        let cast = parse_cast(&text).expect("cast parses");
        assert_eq!(cast.header.cols, 80);
        let output: Vec<u8> = cast
            .events
            .iter()
            .filter_map(|e| match &e.data {
                crate::asciicast::EventData::Output(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert!(String::from_utf8_lossy(&output).contains("recorded"));
    }
}
