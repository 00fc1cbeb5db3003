//! Application configuration.
//!
//! Values come from the embedded defaults overlaid, key by key, with the
//! user's `config.toml`. Accessors are typed and check numeric bounds, so a
//! bad value is reported with the `section.key` it came from.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use toml::{Table, Value};

use crate::error::{Error, Result};

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// A numeric constraint a config value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Strictly greater than.
    Gt(f64),
    /// Greater than or equal to.
    Ge(f64),
    /// Strictly less than.
    Lt(f64),
    /// Less than or equal to.
    Le(f64),
}

impl Bound {
    fn holds(self, value: f64) -> bool {
        match self {
            Bound::Gt(x) => value > x,
            Bound::Ge(x) => value >= x,
            Bound::Lt(x) => value < x,
            Bound::Le(x) => value <= x,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Gt(x) => write!(f, "> {x}"),
            Bound::Ge(x) => write!(f, ">= {x}"),
            Bound::Lt(x) => write!(f, "< {x}"),
            Bound::Le(x) => write!(f, "<= {x}"),
        }
    }
}

/// Parsed configuration with typed accessors.
#[derive(Debug, Clone)]
pub struct Config {
    table: Table,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // the embedded file is covered by tests
            table: DEFAULT_CONFIG.parse().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load the defaults overlaid with the user file at `path`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if path.exists() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("{}: cannot read config file", path.display()))?;
            config
                .overlay_str(&text)
                .with_context(|| format!("{}: malformed config file", path.display()))?;
        }
        Ok(config)
    }

    /// Build a config from the defaults overlaid with `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not valid TOML.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.overlay_str(text)?;
        Ok(config)
    }

    fn overlay_str(&mut self, text: &str) -> anyhow::Result<()> {
        let user: Table = text.parse()?;
        self.overlay(user);
        Ok(())
    }

    /// Merge `user` over the current values, one key at a time.
    pub fn overlay(&mut self, user: Table) {
        for (section, values) in user {
            match (self.table.get_mut(&section), values) {
                (Some(Value::Table(current)), Value::Table(values)) => current.extend(values),
                (_, values) => {
                    self.table.insert(section, values);
                }
            }
        }
    }

    fn raw(&self, section: &str, key: &str) -> Option<&Value> {
        self.table.get(section)?.as_table()?.get(key)
    }

    fn value(&self, section: &str, key: &str) -> Result<&Value> {
        self.raw(section, key)
            .ok_or_else(|| Error::config(format!("{section}.{key}"), "missing value"))
    }

    fn check(section: &str, key: &str, value: f64, bounds: &[Bound]) -> Result<()> {
        match bounds.iter().find(|bound| !bound.holds(value)) {
            Some(bound) => Err(Error::config(
                format!("{section}.{key}"),
                format!("{value} is not {bound}"),
            )),
            None => Ok(()),
        }
    }

    /// Whether `section.key` is set at all.
    #[must_use]
    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.raw(section, key).is_some()
    }

    /// A string value.
    ///
    /// # Errors
    ///
    /// Fails if the key is missing or not a string.
    pub fn string(&self, section: &str, key: &str) -> Result<String> {
        match self.value(section, key)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(Error::config(
                format!("{section}.{key}"),
                format!("{other} is not a string"),
            )),
        }
    }

    /// A boolean value.
    ///
    /// # Errors
    ///
    /// Fails if the key is missing or not a boolean.
    pub fn bool(&self, section: &str, key: &str) -> Result<bool> {
        match self.value(section, key)? {
            Value::Boolean(b) => Ok(*b),
            other => Err(Error::config(
                format!("{section}.{key}"),
                format!("{other} is not a boolean"),
            )),
        }
    }

    /// An integer value satisfying every bound.
    ///
    /// # Errors
    ///
    /// Fails if the key is missing, not an integer, or out of bounds.
    pub fn int(&self, section: &str, key: &str, bounds: &[Bound]) -> Result<i64> {
        match self.value(section, key)? {
            Value::Integer(i) => {
                #[allow(clippy::cast_precision_loss)]
                let as_float = *i as f64;
                Self::check(section, key, as_float, bounds)?;
                Ok(*i)
            }
            other => Err(Error::config(
                format!("{section}.{key}"),
                format!("{other} is not an integer"),
            )),
        }
    }

    /// A floating-point value satisfying every bound. Integers are accepted.
    ///
    /// # Errors
    ///
    /// Fails if the key is missing, not a number, or out of bounds.
    pub fn float(&self, section: &str, key: &str, bounds: &[Bound]) -> Result<f64> {
        let value = match self.value(section, key)? {
            Value::Float(f) => *f,
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(i) => *i as f64,
            other => {
                return Err(Error::config(
                    format!("{section}.{key}"),
                    format!("{other} is not a number"),
                ));
            }
        };
        if value.is_nan() {
            return Err(Error::config(format!("{section}.{key}"), "nan is not a number"));
        }
        Self::check(section, key, value, bounds)?;
        Ok(value)
    }

    /// A non-negative integer that fits `usize`, bounded like [`Config::int`].
    ///
    /// # Errors
    ///
    /// Fails like [`Config::int`], or if the value is negative.
    pub fn count(&self, section: &str, key: &str, bounds: &[Bound]) -> Result<usize> {
        let value = self.int(section, key, bounds)?;
        usize::try_from(value).map_err(|_| {
            Error::config(format!("{section}.{key}"), format!("{value} is negative"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() -> Result<()> {
        assert!(DEFAULT_CONFIG.parse::<Table>().is_ok());
        let config = Config::default();
        assert_eq!(config.int("animation", "frames", &[Bound::Gt(0.0)])?, 100);
        assert!((config.float("smart", "sun_weight", &[])? - 10.0).abs() < 1e-9);
        assert!((config.float("smart", "display_min", &[])? - 0.2).abs() < 1e-9);
        assert!(config.bool("smart", "sun_bimodal")?);
        assert_eq!(config.count("smart", "avoid_repeat", &[Bound::Le(100.0)])?, 2);
        assert!(!config.contains("location", "latitude"));
        Ok(())
    }

    #[test]
    fn test_overlay_is_per_key() -> anyhow::Result<()> {
        let config = Config::from_toml("[smart]\nsun_weight = 3.5\n")?;
        assert!((config.float("smart", "sun_weight", &[])? - 3.5).abs() < 1e-9);
        // untouched keys of the same section keep their defaults
        assert!((config.float("smart", "display_weight", &[])? - 2.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_new_sections_are_added() -> anyhow::Result<()> {
        let config = Config::from_toml("[location]\nlatitude = 10\nlongitude = -20.5\n")?;
        assert!((config.float("location", "latitude", &[])? - 10.0).abs() < 1e-9);
        assert!((config.float("location", "longitude", &[])? + 20.5).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_errors_name_the_key() -> anyhow::Result<()> {
        let config =
            Config::from_toml("[animation]\nframes = 0\n[smart]\nsun_bimodal = \"yes\"\n")?;
        let err = config
            .int("animation", "frames", &[Bound::Gt(0.0)])
            .expect_err("frames must be positive");
        assert!(err.to_string().contains("animation.frames"), "{err}");
        let err = config.bool("smart", "sun_bimodal").expect_err("not a boolean");
        assert!(err.to_string().contains("smart.sun_bimodal"), "{err}");
        let err = config.float("smart", "nope", &[]).expect_err("missing");
        assert!(matches!(err, Error::Config { ref key, .. } if key == "smart.nope"));
        Ok(())
    }

    #[test]
    fn test_bounds() -> anyhow::Result<()> {
        let config = Config::from_toml("[smart]\nsun_min = 1.5\navoid_repeat = 101\n")?;
        assert!(config.float("smart", "sun_min", &[Bound::Ge(0.0), Bound::Le(1.0)]).is_err());
        let bounds = [Bound::Ge(0.0), Bound::Le(100.0)];
        assert!(config.count("smart", "avoid_repeat", &bounds).is_err());
        assert!(config.float("smart", "sun_min", &[Bound::Lt(2.0)]).is_ok());
        Ok(())
    }

    #[test]
    fn test_load_missing_file_uses_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::load(&dir.path().join("config.toml"))?;
        assert_eq!(config.int("animation", "frames", &[])?, 100);
        Ok(())
    }

    #[test]
    fn test_load_malformed_file_fails() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "[smart\nsun_weight = ")?;
        let err = Config::load(&path).expect_err("malformed");
        assert!(format!("{err:#}").contains("malformed config file"));
        Ok(())
    }

    #[test]
    fn test_string() -> anyhow::Result<()> {
        let config = Config::from_toml("[ui]\nname = \"x\"\n")?;
        assert_eq!(config.string("ui", "name")?, "x");
        assert!(config.string("smart", "sun_weight").is_err());
        Ok(())
    }
}
