//! PTY (pseudo-terminal) creation and management
//!
//! Low-level PTY operations: opening a master/slave pair with
//! posix_openpt, sizing, and non-blocking I/O on the master. The master
//! is held as a `File` so it closes on every exit path.

use std::ffi::CStr;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use crate::error::PtyError;
use crate::size::WindowSize;

/// A PTY master file descriptor
#[derive(Debug)]
pub struct Pty {
    master: File,
    slave_path: String,
}

impl Pty {
    /// Open a new PTY master
    pub fn open() -> Result<Self, PtyError> {
        let master_fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        if master_fd < 0 {
            return Err(PtyError::OpenMaster(io::Error::last_os_error()));
        }

        if unsafe { libc::grantpt(master_fd) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(master_fd) };
            return Err(PtyError::GrantPty(err));
        }

        if unsafe { libc::unlockpt(master_fd) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(master_fd) };
            return Err(PtyError::UnlockPty(err));
        }

        let slave_path = unsafe {
            let ptr = libc::ptsname(master_fd);
            if ptr.is_null() {
                let err = io::Error::last_os_error();
                libc::close(master_fd);
                return Err(PtyError::GetSlaveName(err));
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        };

        let master = unsafe { File::from_raw_fd(master_fd) };

        Ok(Pty { master, slave_path })
    }

    pub fn master_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    pub fn slave_path(&self) -> &str {
        &self.slave_path
    }

    /// Open the slave device
    pub fn open_slave(&self) -> Result<File, PtyError> {
        use std::os::unix::fs::OpenOptionsExt;
        std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&self.slave_path)
            .map_err(PtyError::OpenSlave)
    }

    pub fn set_size(&self, size: WindowSize) -> Result<(), PtyError> {
        size.set_on_fd(self.master_fd())
            .map_err(PtyError::SetWindowSize)
    }

    /// Set non-blocking mode on the master
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let fd = self.master_fd();
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }

        let new_flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };

        if unsafe { libc::fcntl(fd, libc::F_SETFL, new_flags) } < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

impl AsRawFd for Pty {
    fn as_raw_fd(&self) -> RawFd {
        self.master_fd()
    }
}

impl Read for Pty {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.master.read(buf)
    }
}

impl Write for Pty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.master.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.master.flush()
    }
}
