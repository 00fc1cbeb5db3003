//! OSC (Operating System Command) handling for terminal communication.
//!
//! This module provides functions for:
//! - Querying the terminal's dynamic colors (OSC 10 foreground, OSC 11 background)
//! - Reading and parsing terminal responses with a timeout
//! - Building and sending the sequences that change the terminal's colors

use anyhow::{Context, Result, anyhow};
use nix::poll::{PollFd, PollFlags, poll};
use regex::Regex;
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::AsFd;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::color::{BitColor, Colors, Role, parse_rgb};
use crate::terminal::{RawTerminal, open_terminal_device};

/// OSC code of the default foreground color.
pub const OSC_FOREGROUND: u8 = 10;
/// OSC code of the default background color.
pub const OSC_BACKGROUND: u8 = 11;
/// OSC code of the cursor color.
pub const OSC_CURSOR: u8 = 12;
/// OSC code for setting palette entries.
pub const OSC_PALETTE: u8 = 4;

/// Sends an OSC query for the dynamic color `code`.
///
/// # Errors
///
/// Fails if writing to the terminal fails.
pub fn send_osc_query(file: &mut File, code: u8) -> Result<()> {
    write!(file, "\x1b]{code};?\x07")
        .with_context(|| format!("Failed to write OSC {code} query to terminal"))
}

/// Reads the terminal's response to an OSC query with timeout.
///
/// This function polls the terminal for data with a 2-second timeout,
/// reading the response in chunks and looking for proper termination
/// sequences (BEL `\x07` or ST `\x1b\\`).
///
/// # Errors
///
/// Fails if polling or reading fails.
pub fn read_terminal_response(file: &mut File) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let start_time = Instant::now();
    let timeout_duration = Duration::from_secs(2);

    while start_time.elapsed() < timeout_duration {
        let pollfd = PollFd::new(file.as_fd(), PollFlags::POLLIN);
        match poll(&mut [pollfd], 250_u8) {
            Ok(0) => {
                // No data available, continue polling
            }
            Ok(_) => {
                let mut temp_buf = [0u8; 64];
                match file.read(&mut temp_buf) {
                    Ok(0) => {
                        debug!("got EOF");
                        break;
                    }
                    Ok(n) => {
                        buf.extend_from_slice(&temp_buf[..n]);
                        // Check for terminator (BEL or ST)
                        if buf.contains(&b'\x07') || buf.windows(2).any(|w| w == b"\x1b\\") {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        // No data available, continue polling
                    }
                    Err(e) => return Err(anyhow!("Error reading from terminal: {}", e)),
                }
            }
            Err(e) => return Err(anyhow!("Error polling terminal: {}", e)),
        }
    }

    Ok(buf)
}

/// Parses the terminal's response to an OSC `code` query.
///
/// The response typically looks like `\x1b]11;rgb:RRRR/GGGG/BBBB\x07`.
///
/// # Errors
///
/// Fails if the response is not UTF-8, answers a different code, or carries
/// an unparsable color.
pub fn parse_color_response(code: u8, buf: Vec<u8>) -> Result<BitColor> {
    debug!("buf={buf:?}");
    let response = String::from_utf8(buf).context("Terminal response contained invalid UTF-8")?;

    let re = Regex::new(&format!(r"]\s*{code};([^\x07\x1b]*)")).context("Failed to compile regex")?;
    let color_str = re
        .captures(&response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| anyhow!("No color information found in terminal response"))?;

    parse_rgb(color_str).context("Failed to parse color response from terminal")
}

fn query(file: &mut File, code: u8) -> Result<BitColor> {
    send_osc_query(file, code)?;
    let buf = read_terminal_response(file)?;
    parse_color_response(code, buf)
}

/// Query the terminal's dynamic color `code`, e.g. [`OSC_BACKGROUND`].
///
/// # Errors
///
/// Fails if the terminal cannot be opened, does not answer within the
/// timeout, or answers with something unparsable.
pub fn query_color(code: u8) -> Result<BitColor> {
    let mut terminal = RawTerminal::open()?;
    let color = query(terminal.file(), code);
    terminal.restore()?;
    color
}

/// Query the terminal's current foreground and background colors.
///
/// # Errors
///
/// Same as [`query_color`].
pub fn query_colors() -> Result<(BitColor, BitColor)> {
    let fg = query_color(OSC_FOREGROUND).context("Failed to query foreground color")?;
    let bg = query_color(OSC_BACKGROUND).context("Failed to query background color")?;
    Ok((fg, bg))
}

/// The escape sequence that sets `role` to `color`, if the role has one.
#[must_use]
pub fn color_sequence(role: Role, color: BitColor) -> Option<String> {
    let sequence = match role {
        Role::Foreground => format!("\x1b]{OSC_FOREGROUND};{color}\x07"),
        Role::Background => format!("\x1b]{OSC_BACKGROUND};{color}\x07"),
        Role::Cursor => format!("\x1b]{OSC_CURSOR};{color}\x07"),
        Role::Ansi(n) => format!("\x1b]{OSC_PALETTE};{n};{color}\x07"),
        _ => return None,
    };
    Some(sequence)
}

/// Write the sequences for every settable role of `colors`.
///
/// # Errors
///
/// Fails if writing to the terminal fails.
pub fn write_colors(out: &mut impl Write, colors: &Colors) -> Result<()> {
    let sequences: String = colors
        .iter()
        .filter_map(|(role, color)| color_sequence(role, color))
        .collect();
    out.write_all(sequences.as_bytes())
        .and_then(|()| out.flush())
        .context("Failed to write colors to terminal")
}

/// Apply `colors` to the controlling terminal.
///
/// # Errors
///
/// Fails if the terminal cannot be opened or written.
pub fn apply_colors(colors: &Colors) -> Result<()> {
    let mut file = open_terminal_device()?;
    write_colors(&mut file, colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_color_response() -> Result<()> {
        let response = b"\x1b]11;rgb:0000/0000/0000\x07".to_vec();
        assert_eq!(parse_color_response(11, response)?, BitColor::new(0, 0, 0));

        let response = b"\x1b] 11;rgb:ffff/8000/0000\x07".to_vec();
        assert_eq!(parse_color_response(11, response)?, BitColor::new(255, 128, 0));

        let response = b"\x1b]10;rgb:1234/5678/9abc\x1b\\".to_vec();
        assert_eq!(parse_color_response(10, response)?, BitColor::new(18, 86, 154));

        let response = b"\x1b]11;#ff8000\x07".to_vec();
        assert_eq!(parse_color_response(11, response)?, BitColor::new(255, 128, 0));

        // Wrong OSC number
        let response = b"\x1b]10;rgb:0000/0000/0000\x07".to_vec();
        assert!(parse_color_response(11, response).is_err());

        Ok(())
    }

    #[test]
    fn test_parse_color_response_edge_cases() {
        assert!(parse_color_response(11, b"".to_vec()).is_err());
        assert!(parse_color_response(11, vec![0xff, 0xfe, 0xfd]).is_err());
        assert!(parse_color_response(11, b"garbage data".to_vec()).is_err());
        assert!(parse_color_response(11, b"\x1b]11;not-a-color\x07".to_vec()).is_err());
    }

    #[test]
    fn test_color_sequence() {
        let color = BitColor::new(0x12, 0xab, 0xff);
        assert_eq!(
            color_sequence(Role::Background, color).as_deref(),
            Some("\x1b]11;#12abff\x07")
        );
        assert_eq!(
            color_sequence(Role::Ansi(9), color).as_deref(),
            Some("\x1b]4;9;#12abff\x07")
        );
        assert_eq!(color_sequence(Role::Selection, color), None);
    }

    #[test]
    fn test_write_colors() -> Result<()> {
        let colors = Colors::new(BTreeMap::from([
            (Role::Foreground, BitColor::new(0, 0, 0)),
            (Role::Background, BitColor::new(255, 255, 255)),
            (Role::Bold, BitColor::new(1, 2, 3)),
        ]))?;
        let mut out = Vec::new();
        write_colors(&mut out, &colors)?;
        assert_eq!(out, b"\x1b]10;#000000\x07\x1b]11;#ffffff\x07".to_vec());
        Ok(())
    }
}
