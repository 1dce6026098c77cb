//! Child process management
//!
//! Spawning a program attached to a PTY: fork, create a session, make
//! the slave the controlling terminal, wire it to stdin/stdout/stderr
//! and exec. The parent keeps the master side.

use std::ffi::{CStr, CString, OsStr};
use std::io::{self, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, RawFd};

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::error::PtyError;
use crate::pty::Pty;
use crate::size::WindowSize;

/// A child process attached to a PTY
pub struct Child {
    pty: Pty,
    pid: Pid,
}

/// Builder for spawning a child process under a PTY
pub struct ChildBuilder {
    program: CString,
    args: Vec<CString>,
    size: WindowSize,
}

impl ChildBuilder {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Result<Self, PtyError> {
        let display = program.as_ref().to_string_lossy().into_owned();
        let program = CString::new(program.as_ref().as_bytes())
            .map_err(|_| PtyError::InvalidCommand(display))?;

        Ok(ChildBuilder {
            program: program.clone(),
            args: vec![program],
            size: WindowSize::default(),
        })
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Result<Self, PtyError> {
        let display = arg.as_ref().to_string_lossy().into_owned();
        let arg = CString::new(arg.as_ref().as_bytes())
            .map_err(|_| PtyError::InvalidCommand(display))?;
        self.args.push(arg);
        Ok(self)
    }

    pub fn args<I, S>(mut self, args: I) -> Result<Self, PtyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg)?;
        }
        Ok(self)
    }

    pub fn size(mut self, size: WindowSize) -> Self {
        self.size = size;
        self
    }

    /// Environment handed to the child: the parent environment with TERM
    /// pinned to xterm-256color, the protocol the emulator speaks.
    fn child_env() -> Vec<CString> {
        let mut env = Vec::new();
        for (key, value) in std::env::vars() {
            if key == "TERM" {
                continue;
            }
            if let Ok(var) = CString::new(format!("{}={}", key, value)) {
                env.push(var);
            }
        }
        if let Ok(term) = CString::new("TERM=xterm-256color") {
            env.push(term);
        }
        env
    }

    /// Spawn the child process
    pub fn spawn(self) -> Result<Child, PtyError> {
        let pty = Pty::open()?;
        pty.set_size(self.size)?;

        match unsafe { unistd::fork() } {
            Ok(ForkResult::Parent { child }) => Ok(Child { pty, pid: child }),
            Ok(ForkResult::Child) => {
                self.setup_child(&pty);
            }
            Err(e) => Err(PtyError::Fork(e)),
        }
    }

    /// Runs in the forked child; never returns.
    fn setup_child(&self, pty: &Pty) -> ! {
        if unistd::setsid().is_err() {
            eprintln!("failed to create new session");
            std::process::exit(1);
        }

        let slave = match pty.open_slave() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to open slave PTY: {}", e);
                std::process::exit(1);
            }
        };

        let slave_fd = slave.as_raw_fd();

        unsafe {
            if libc::ioctl(slave_fd, libc::TIOCSCTTY, 0) < 0 {
                eprintln!("failed to set controlling terminal");
                std::process::exit(1);
            }
        }

        if unistd::dup2(slave_fd, libc::STDIN_FILENO).is_err()
            || unistd::dup2(slave_fd, libc::STDOUT_FILENO).is_err()
            || unistd::dup2(slave_fd, libc::STDERR_FILENO).is_err()
        {
            std::process::exit(1);
        }

        if slave_fd > 2 {
            drop(slave);
        }

        unsafe {
            for sig in &[
                Signal::SIGCHLD,
                Signal::SIGHUP,
                Signal::SIGINT,
                Signal::SIGQUIT,
                Signal::SIGTERM,
            ] {
                let _ = signal::signal(*sig, signal::SigHandler::SigDfl);
            }
        }

        let argv: Vec<&CStr> = self.args.iter().map(|s| s.as_c_str()).collect();
        let env = Self::child_env();
        let envp: Vec<&CStr> = env.iter().map(|s| s.as_c_str()).collect();

        let _ = unistd::execvpe(self.program.as_c_str(), &argv, &envp);

        eprintln!("failed to execute {}", self.program.to_string_lossy());
        std::process::exit(1);
    }
}

impl Child {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn master_fd(&self) -> RawFd {
        self.pty.master_fd()
    }

    /// Set the window size and notify the child with SIGWINCH
    pub fn resize(&mut self, size: WindowSize) -> Result<(), PtyError> {
        self.pty.set_size(size)?;
        signal::kill(self.pid, Signal::SIGWINCH)
            .map_err(|e| PtyError::Io(io::Error::other(e)))
    }

    /// Check if the child has exited (non-blocking); returns the exit code
    pub fn try_wait(&self) -> io::Result<Option<i32>> {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => Ok(Some(code)),
            Ok(WaitStatus::Signaled(_, sig, _)) => Ok(Some(128 + sig as i32)),
            Ok(_) => Ok(None),
            Err(nix::errno::Errno::ECHILD) => Ok(Some(0)),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    /// Wait for the child to exit (blocking); returns the exit code
    pub fn wait(&self) -> io::Result<i32> {
        match waitpid(self.pid, None) {
            Ok(WaitStatus::Exited(_, code)) => Ok(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => Ok(128 + sig as i32),
            Ok(_) => Ok(0),
            Err(nix::errno::Errno::ECHILD) => Ok(0),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.pty.set_nonblocking(nonblocking)
    }

    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.pty.read(buf)
    }

    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.pty.write_all(buf)
    }
}

impl Drop for Child {
    fn drop(&mut self) {
        // Reap the child to avoid zombies
        let _ = self.try_wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_spawn_echo() {
        let mut child = ChildBuilder::new("/bin/echo")
            .expect("builder")
            .arg("test output")
            .expect("arg")
            .spawn()
            .expect("spawn");

        child.set_nonblocking(true).expect("nonblocking");
        std::thread::sleep(Duration::from_millis(200));

        let mut buf = [0u8; 1024];
        let n = child.read(&mut buf).unwrap_or(0);
        let output = String::from_utf8_lossy(&buf[..n]);
        assert!(output.contains("test output"));

        let code = child.wait().expect("wait");
        assert_eq!(code, 0);
    }

    #[test]
    fn test_resize() {
        let mut child = ChildBuilder::new("/bin/sleep")
            .expect("builder")
            .arg("1")
            .expect("arg")
            .size(WindowSize::new(24, 80))
            .spawn()
            .expect("spawn");

        child.resize(WindowSize::new(30, 100)).expect("resize");

        let size = WindowSize::get_from_fd(child.master_fd()).expect("get size");
        assert_eq!(size.rows, 30);
        assert_eq!(size.cols, 100);

        let _ = signal::kill(child.pid(), Signal::SIGKILL);
        let _ = child.wait();
    }
}
