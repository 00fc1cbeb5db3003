//! Loading presets from a TOML file.
//!
//! Each top-level table is a preset; its keys are role names and its values
//! color strings:
//!
//! ```toml
//! [solarized-dark]
//! foreground = "#839496"
//! background = "#002b36"
//! ansi_1 = "rgb:dc/32/2f"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use toml::{Table, Value};

use crate::color::{Colors, Role, parse_rgb};
use crate::select::Preset;

/// Parse presets from TOML text, in file order.
///
/// # Errors
///
/// Fails on invalid TOML, unknown roles, bad colors, or missing foreground or
/// background, naming the preset and key involved.
pub fn parse_presets(text: &str) -> Result<Vec<Preset>> {
    let table: Table = text.parse().context("Failed to parse presets")?;
    table
        .into_iter()
        .map(|(name, value)| {
            let Value::Table(values) = value else {
                return Err(anyhow!("{name}: preset must be a table"));
            };
            let mut colors = BTreeMap::new();
            for (key, value) in values {
                let role: Role = key.parse().with_context(|| format!("{name}.{key}"))?;
                let color_str = value
                    .as_str()
                    .ok_or_else(|| anyhow!("{name}.{key}: color must be a string"))?;
                let color = parse_rgb(color_str).with_context(|| format!("{name}.{key}"))?;
                colors.insert(role, color);
            }
            let colors = Colors::new(colors).with_context(|| format!("{name}: invalid preset"))?;
            Ok(Preset::new(name, colors))
        })
        .collect()
}

/// Load presets from `path`.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn load_presets(path: &Path) -> Result<Vec<Preset>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("{}: cannot read presets", path.display()))?;
    parse_presets(&text).with_context(|| format!("{}: invalid presets", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::BitColor;

    const PRESETS: &str = r##"
[solarized-dark]
foreground = "#839496"
background = "#002b36"
ansi_1 = "rgb:dc/32/2f"

[solarized-light]
background = "#fdf6e3"
foreground = "rgb(101, 123, 131)"

["Tango Light"]
foreground = "#000000"
background = "#ffffff"
"##;

    #[test]
    fn test_parse_presets() -> Result<()> {
        let presets = parse_presets(PRESETS)?;
        let names: Vec<&str> = presets.iter().map(Preset::name).collect();
        assert_eq!(names, ["solarized-dark", "solarized-light", "Tango Light"]);
        let dark = presets[0].colors();
        assert_eq!(dark.background(), BitColor::new(0x00, 0x2b, 0x36));
        assert_eq!(dark.get(Role::Ansi(1)), Some(BitColor::new(0xdc, 0x32, 0x2f)));
        assert_eq!(presets[1].colors().foreground(), BitColor::new(101, 123, 131));
        Ok(())
    }

    #[test]
    fn test_parse_presets_errors() {
        let err = parse_presets("[a]\nforeground = \"#000000\"\n").expect_err("no background");
        assert!(format!("{err:#}").contains("a: invalid preset"), "{err:#}");

        let err = parse_presets("[a]\nbadge = \"#000000\"\n").expect_err("unknown role");
        assert!(format!("{err:#}").contains("a.badge"), "{err:#}");

        let err = parse_presets("[a]\nforeground = \"#00\"\n").expect_err("bad color");
        assert!(format!("{err:#}").contains("a.foreground"), "{err:#}");

        assert!(parse_presets("a = 1\n").is_err());
        assert!(parse_presets("[a]\nforeground = 3\n").is_err());
    }

    #[test]
    fn test_load_presets() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("presets.toml");
        fs::write(&path, PRESETS)?;
        assert_eq!(load_presets(&path)?.len(), 3);
        assert!(load_presets(&dir.path().join("missing.toml")).is_err());
        Ok(())
    }
}
