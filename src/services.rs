//! Environmental signal sources.
//!
//! The location comes from the `[location]` config section when set, and from
//! the `locateme` program otherwise. Display brightness comes from the
//! `brightness` program.

use std::io::ErrorKind;
use std::process::{Command, Stdio};

use regex::Regex;
use tracing::debug;

use crate::config::{Bound, Config};
use crate::error::{Error, Result};
use crate::select::Signals;

/// Run `program` and return its trimmed standard output.
fn execute(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stderr(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::signal(program, "not installed"),
            _ => Error::signal(program, e.to_string()),
        })?;
    let stdout = String::from_utf8(output.stdout)
        .map_err(|_| Error::signal(program, "output is not valid UTF-8"))?;
    debug!("{program}: {stdout:?}");
    Ok(stdout.trim().to_string())
}

/// Parse `locateme -f "{LAT} {LON}"` output.
fn parse_location(output: &str) -> Result<(f64, f64)> {
    let invalid = || Error::signal("locateme", format!("failed to parse output {output:?}"));
    let mut parts = output.split_whitespace();
    let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let lat = lat.parse::<f64>().map_err(|_| invalid())?;
    let lon = lon.parse::<f64>().map_err(|_| invalid())?;
    Ok((lat, lon))
}

/// Find the brightness of `display` in `brightness -l` output.
fn parse_brightness(output: &str, display: usize) -> Result<Option<f64>> {
    let pattern = Regex::new(&format!(r"^display {display}: brightness ([0-9.]+)$"))
        .map_err(|e| Error::signal("brightness", e.to_string()))?;
    for line in output.lines() {
        if let Some(caps) = pattern.captures(line.trim()) {
            let value = caps[1].parse::<f64>().map_err(|_| {
                Error::signal("brightness", format!("failed to parse {:?}", &caps[1]))
            })?;
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Signals read from the system.
pub struct SystemSignals<'a> {
    config: &'a Config,
}

impl<'a> SystemSignals<'a> {
    /// Create system signals honoring the `[location]` config overrides.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }
}

impl Signals for SystemSignals<'_> {
    fn location(&self) -> Result<(f64, f64)> {
        if self.config.contains("location", "latitude")
            || self.config.contains("location", "longitude")
        {
            let latitude =
                self.config
                    .float("location", "latitude", &[Bound::Ge(-90.0), Bound::Le(90.0)])?;
            let longitude = self.config.float(
                "location",
                "longitude",
                &[Bound::Ge(-180.0), Bound::Le(180.0)],
            )?;
            return Ok((latitude, longitude));
        }
        parse_location(&execute("locateme", &["-f", "{LAT} {LON}"])?)
    }

    fn display_brightness(&self, display: usize) -> Result<Option<f64>> {
        parse_brightness(&execute("brightness", &["-l"])?, display)
    }
}

/// Signals with fixed values, for simulations and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSignals {
    location: Option<(f64, f64)>,
    display: Option<f64>,
}

impl FixedSignals {
    /// Always report `location` and `display` brightness.
    #[must_use]
    pub fn new(location: (f64, f64), display: Option<f64>) -> Self {
        Self {
            location: Some(location),
            display,
        }
    }

    /// Fail every location query.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            location: None,
            display: None,
        }
    }
}

impl Default for FixedSignals {
    fn default() -> Self {
        Self::new((0.0, 0.0), None)
    }
}

impl Signals for FixedSignals {
    fn location(&self) -> Result<(f64, f64)> {
        self.location.ok_or_else(|| Error::signal("location", "unavailable"))
    }

    fn display_brightness(&self, _display: usize) -> Result<Option<f64>> {
        Ok(self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRIGHTNESS_OUTPUT: &str = "\
display 0: main, active, awake, online, built-in, ID 0x4280a80
display 0: brightness 0.250000
display 1: brightness 0.50
";

    #[test]
    fn test_parse_location() -> Result<()> {
        assert_eq!(parse_location("0.50 0.50")?, (0.5, 0.5));
        assert_eq!(parse_location("  45.5 -73.6\n")?, (45.5, -73.6));
        assert!(parse_location("").is_err());
        assert!(parse_location("45.5").is_err());
        assert!(parse_location("north west").is_err());
        assert!(parse_location("1 2 3").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_brightness() -> Result<()> {
        assert_eq!(parse_brightness(BRIGHTNESS_OUTPUT, 0)?, Some(0.25));
        assert_eq!(parse_brightness(BRIGHTNESS_OUTPUT, 1)?, Some(0.5));
        assert_eq!(parse_brightness(BRIGHTNESS_OUTPUT, 2)?, None);
        assert!(parse_brightness("display 0: brightness 1.2.3", 0).is_err());
        Ok(())
    }

    #[test]
    fn test_missing_program() {
        let err = execute("prism-test-no-such-program", &[]).expect_err("not installed");
        assert_eq!(err.to_string(), "prism-test-no-such-program: not installed");
    }

    #[test]
    fn test_location_from_config() -> anyhow::Result<()> {
        let config = Config::from_toml("[location]\nlatitude = 48.86\nlongitude = 2.35\n")?;
        let signals = SystemSignals::new(&config);
        assert_eq!(signals.location()?, (48.86, 2.35));

        let config = Config::from_toml("[location]\nlatitude = 95\nlongitude = 2.35\n")?;
        assert!(SystemSignals::new(&config).location().is_err());

        let config = Config::from_toml("[location]\nlatitude = 10\n")?;
        let err = SystemSignals::new(&config).location().expect_err("longitude missing");
        assert!(err.to_string().contains("location.longitude"), "{err}");
        Ok(())
    }

    #[test]
    fn test_fixed_signals() -> Result<()> {
        let signals = FixedSignals::new((1.0, 2.0), Some(0.4));
        assert_eq!(signals.location()?, (1.0, 2.0));
        assert_eq!(signals.display_brightness(3)?, Some(0.4));
        assert!(FixedSignals::unavailable().location().is_err());
        Ok(())
    }
}
