//! Window size management for the PTY

use std::os::unix::io::RawFd;

/// Terminal window size in rows and columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl WindowSize {
    pub fn new(rows: u16, cols: u16) -> Self {
        WindowSize { rows, cols }
    }

    fn to_winsize(self) -> libc::winsize {
        libc::winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }
    }

    /// Set the window size on a file descriptor (PTY master)
    pub fn set_on_fd(&self, fd: RawFd) -> std::io::Result<()> {
        let ws = self.to_winsize();
        let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &ws) };
        if result == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Get the window size from a file descriptor
    pub fn get_from_fd(fd: RawFd) -> std::io::Result<Self> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };
        if result == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(WindowSize::new(ws.ws_row, ws.ws_col))
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        WindowSize::new(24, 80)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size_new() {
        let size = WindowSize::new(24, 80);
        assert_eq!(size.rows, 24);
        assert_eq!(size.cols, 80);
    }

    #[test]
    fn test_winsize_conversion() {
        let size = WindowSize::new(30, 100);
        let ws = size.to_winsize();
        assert_eq!(ws.ws_row, 30);
        assert_eq!(ws.ws_col, 100);
    }
}
