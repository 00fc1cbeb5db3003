//! Low-level access to the controlling terminal.
//!
//! [`RawTerminal`] puts `/dev/tty` in raw, non-blocking mode for the length of
//! an escape-sequence exchange or an interactive session and puts it back
//! afterwards.

use anyhow::{Context, Result};
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::fd::AsFd;
use std::os::unix::io::AsRawFd;
use termios::{ECHO, ICANON, ISIG, TCSANOW, Termios, tcsetattr};
use tracing::warn;

/// Opens `/dev/tty`, which reaches the controlling terminal even when
/// stdin and stdout are redirected.
///
/// # Errors
///
/// Fails if `/dev/tty` cannot be opened.
pub fn open_terminal_device() -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")
        .context("Failed to open /dev/tty")
}

/// The controlling terminal with echo, line buffering and signal keys off,
/// and reads that never block.
///
/// The saved state is put back by [`RawTerminal::restore`], or on drop if
/// that was never called.
pub struct RawTerminal {
    file: File,
    termios: Option<Termios>,
    flags: Option<OFlag>,
}

impl RawTerminal {
    /// Open the terminal and switch it to raw, non-blocking mode.
    ///
    /// # Errors
    ///
    /// Fails if the terminal cannot be opened or reconfigured. Whatever was
    /// already changed is restored.
    pub fn open() -> Result<Self> {
        let file = open_terminal_device()?;
        let fd = file.as_raw_fd();
        let termios = Termios::from_fd(fd).context("Failed to get terminal attributes")?;
        let mut raw = termios;
        raw.c_lflag &= !(ICANON | ECHO | ISIG);
        tcsetattr(fd, TCSANOW, &raw).context("Failed to set terminal to raw mode")?;

        let mut terminal = Self {
            file,
            termios: Some(termios),
            flags: None,
        };
        let bits =
            fcntl(&terminal.file, FcntlArg::F_GETFL).context("Failed to get file status flags")?;
        let flags = OFlag::from_bits_truncate(bits);
        fcntl(&terminal.file, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))
            .context("Failed to make terminal non-blocking")?;
        terminal.flags = Some(flags);
        Ok(terminal)
    }

    /// The underlying device.
    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }

    /// Wait for the next byte typed on the terminal.
    ///
    /// Returns `None` at end of input.
    ///
    /// # Errors
    ///
    /// Fails if polling or reading fails.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            let pollfd = PollFd::new(self.file.as_fd(), PollFlags::POLLIN);
            poll(&mut [pollfd], PollTimeout::NONE).context("Error polling terminal")?;
            match self.file.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
                Err(e) => return Err(e).context("Error reading from terminal"),
            }
        }
    }

    /// Put back the saved flags and attributes.
    ///
    /// # Errors
    ///
    /// Fails if either cannot be restored.
    pub fn restore(mut self) -> Result<()> {
        self.restore_saved()
    }

    fn restore_saved(&mut self) -> Result<()> {
        if let Some(flags) = self.flags.take() {
            fcntl(&self.file, FcntlArg::F_SETFL(flags))
                .context("Failed to restore file status flags")?;
        }
        if let Some(termios) = self.termios.take() {
            tcsetattr(self.file.as_raw_fd(), TCSANOW, &termios)
                .context("Failed to restore terminal attributes")?;
        }
        Ok(())
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(err) = self.restore_saved() {
            warn!("{err:#}");
        }
    }
}
