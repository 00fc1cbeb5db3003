//! Color models, parsing and luminance calculation utilities.
//!
//! This module provides:
//! - Byte colors as exchanged with the terminal, and light-linear colors
//! - The sRGB transfer function in both directions
//! - Relative luminance and a normalized contrast ratio
//! - Named color roles and interpolation between whole color sets
//! - Parsing of the color formats commonly returned by terminals

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use regex::Regex;

use crate::error::{Error, Result};
use crate::rank::{clamp, interpolate, map_number};

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitColor {
    /// Red component (0-255)
    pub r: u8,
    /// Green component (0-255)
    pub g: u8,
    /// Blue component (0-255)
    pub b: u8,
}

impl BitColor {
    /// Create a new color from individual components.
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from wider integers, failing if a channel is outside 0-255.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColor`] naming the offending channel.
    pub fn from_channels(r: i64, g: i64, b: i64) -> Result<Self> {
        let channel = |name: &str, value: i64| {
            u8::try_from(value)
                .map_err(|_| Error::InvalidColor(format!("{name} channel {value} is not in 0-255")))
        };
        Ok(Self::new(channel("red", r)?, channel("green", g)?, channel("blue", b)?))
    }

    /// Decode this color into light-linear intensities.
    #[must_use]
    pub fn to_linear(self) -> LinearColor {
        let f = |x: u8| {
            let x = map_number(f64::from(x), (0.0, 255.0), (0.0, 1.0));
            let x = if x <= 0.04045 {
                x / 12.92
            } else {
                ((x + 0.055) / 1.055).powf(2.4)
            };
            clamp(x, (0.0, 1.0))
        };
        LinearColor {
            r: f(self.r),
            g: f(self.g),
            b: f(self.b),
        }
    }

    /// Encode a light-linear color, rounding to the nearest byte.
    ///
    /// Channels outside `[0, 1]` saturate.
    #[must_use]
    pub fn from_linear(color: LinearColor) -> Self {
        let f = |x: f64| {
            let x = if x <= 0.003_130_8 {
                x * 12.92
            } else {
                1.055 * x.powf(1.0 / 2.4) - 0.055
            };
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let byte = map_number(x, (0.0, 1.0), (0.0, 255.0)).round() as u8;
            byte
        };
        Self::new(f(color.r), f(color.g), f(color.b))
    }

    /// Relative luminance of this color, see [`LinearColor::relative_luminance`].
    #[must_use]
    pub fn luminance(self) -> f64 {
        self.to_linear().relative_luminance()
    }
}

impl fmt::Display for BitColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A light-linear RGB color with floating-point channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearColor {
    r: f64,
    g: f64,
    b: f64,
}

impl LinearColor {
    /// Create a linear color, failing if a channel is outside `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColor`] when any channel is out of range.
    pub fn new(r: f64, g: f64, b: f64) -> Result<Self> {
        if [r, g, b].iter().all(|c| (0.0..=1.0).contains(c)) {
            Ok(Self { r, g, b })
        } else {
            Err(Error::InvalidColor(format!(
                "linear channels ({r}, {g}, {b}) are not in [0, 1]"
            )))
        }
    }

    /// Red intensity.
    #[must_use]
    pub fn r(self) -> f64 {
        self.r
    }

    /// Green intensity.
    #[must_use]
    pub fn g(self) -> f64 {
        self.g
    }

    /// Blue intensity.
    #[must_use]
    pub fn b(self) -> f64 {
        self.b
    }

    /// Relative luminance as defined by WCAG.
    ///
    /// # Formula
    ///
    /// L = 0.2126 × R + 0.7152 × G + 0.0722 × B
    #[must_use]
    pub fn relative_luminance(self) -> f64 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    /// Channel-wise linear interpolation towards `other`.
    ///
    /// The result is not clamped, so `t` outside `[0, 1]` may leave the unit
    /// cube; [`BitColor::from_linear`] saturates such channels.
    #[must_use]
    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            r: interpolate(self.r, other.r, t),
            g: interpolate(self.g, other.g, t),
            b: interpolate(self.b, other.b, t),
        }
    }
}

/// A named slot in a terminal color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// Default text color.
    Foreground,
    /// Default background color.
    Background,
    /// Bold text color.
    Bold,
    /// Hyperlink color.
    Link,
    /// Cursor color.
    Cursor,
    /// Text under the cursor.
    CursorText,
    /// Selection background.
    Selection,
    /// Selected text.
    SelectedText,
    /// One of the 16 ANSI palette entries (0-15).
    Ansi(u8),
}

/// Number of ANSI palette entries a scheme may define.
pub const ANSI_COLORS: u8 = 16;

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Foreground => f.write_str("foreground"),
            Role::Background => f.write_str("background"),
            Role::Bold => f.write_str("bold"),
            Role::Link => f.write_str("link"),
            Role::Cursor => f.write_str("cursor"),
            Role::CursorText => f.write_str("cursor_text"),
            Role::Selection => f.write_str("selection"),
            Role::SelectedText => f.write_str("selected_text"),
            Role::Ansi(n) => write!(f, "ansi_{n}"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let role = match s {
            "foreground" => Role::Foreground,
            "background" => Role::Background,
            "bold" => Role::Bold,
            "link" => Role::Link,
            "cursor" => Role::Cursor,
            "cursor_text" => Role::CursorText,
            "selection" => Role::Selection,
            "selected_text" => Role::SelectedText,
            _ => {
                let n = s
                    .strip_prefix("ansi_")
                    .and_then(|n| n.parse::<u8>().ok())
                    .filter(|n| *n < ANSI_COLORS)
                    .ok_or_else(|| Error::UnknownRole(s.to_string()))?;
                Role::Ansi(n)
            }
        };
        Ok(role)
    }
}

/// An ordered set of colors keyed by role.
///
/// Foreground and background are always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colors {
    values: BTreeMap<Role, BitColor>,
}

impl Colors {
    /// Build a color set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRole`] if foreground or background is absent.
    pub fn new(values: BTreeMap<Role, BitColor>) -> Result<Self> {
        for role in [Role::Foreground, Role::Background] {
            if !values.contains_key(&role) {
                return Err(Error::MissingRole(role));
            }
        }
        Ok(Self { values })
    }

    /// Color assigned to `role`, if any.
    #[must_use]
    pub fn get(&self, role: Role) -> Option<BitColor> {
        self.values.get(&role).copied()
    }

    /// The foreground color.
    #[must_use]
    pub fn foreground(&self) -> BitColor {
        self.values[&Role::Foreground]
    }

    /// The background color.
    #[must_use]
    pub fn background(&self) -> BitColor {
        self.values[&Role::Background]
    }

    /// Iterate over roles and colors in role order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, BitColor)> + '_ {
        self.values.iter().map(|(role, color)| (*role, *color))
    }

    /// Relative luminance of the background color.
    #[must_use]
    pub fn relative_luminance(&self) -> f64 {
        self.background().luminance()
    }

    /// Foreground/background contrast, rescaled from the WCAG 1-21 ratio to
    /// `[0, 1]` as `(ratio - 1) / 20`.
    #[must_use]
    pub fn contrast_ratio(&self) -> f64 {
        let r1 = self.foreground().luminance();
        let r2 = self.background().luminance();
        let (lighter, darker) = (r1.max(r2), r1.min(r2));
        let ratio = ((lighter + 0.05) / (darker + 0.05) - 1.0) / 20.0;
        clamp(ratio, (0.0, 1.0))
    }

    /// Interpolate towards `other`. Only roles present in both sets survive.
    #[must_use]
    pub fn interpolate(&self, other: &Colors, t: f64) -> Colors {
        let values = self
            .values
            .iter()
            .filter_map(|(role, start)| {
                let end = other.values.get(role)?;
                let mixed = start.to_linear().interpolate(end.to_linear(), t);
                Some((*role, BitColor::from_linear(mixed)))
            })
            .collect();
        // both inputs carry foreground and background, so the intersection does too
        Colors { values }
    }
}

/// Parse a color string into a [`BitColor`].
///
/// Supported formats:
/// - `rgb:RRRR/GGGG/BBBB` - X11 RGB format with hex values
/// - `rgba:RRRR/GGGG/BBBB/AAAA` - X11 RGBA format (alpha ignored)
/// - `#RRGGBB` - Standard hex color format
/// - `#RRGGBBAA` - Hex color with alpha (alpha ignored)
/// - `rgb(R, G, B)` - CSS-style RGB function
///
/// # Arguments
///
/// * `s` - The color string, as found in a preset file or a terminal reply.
///   Surrounding whitespace is ignored.
///
/// # Returns
///
/// The color with 8-bit channels; 16-bit X11 components are scaled down.
///
/// # Errors
///
/// This function returns an error in the following cases:
/// - The string is not in a recognized color format
/// - A component value is invalid (e.g., non-hex characters, out of range)
/// - The hex string has an invalid length (not 2 or 4 digits for hex values)
///
/// # Examples
///
/// ```
/// # use prism::color::{BitColor, parse_rgb};
/// assert_eq!(parse_rgb("rgb:ffff/8080/0000").unwrap(), BitColor::new(255, 128, 0));
/// assert_eq!(parse_rgb("#ff8000").unwrap(), BitColor::new(255, 128, 0));
/// assert_eq!(parse_rgb("rgb(255, 128, 0)").unwrap(), BitColor::new(255, 128, 0));
/// ```
pub fn parse_rgb(s: &str) -> anyhow::Result<BitColor> {
    let s = s.trim();

    if s.starts_with("rgb:") || s.starts_with("rgba:") {
        let color_part = s
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid rgb: format - missing colon"))?
            .1;
        let parts: Vec<&str> = color_part.split('/').collect();

        if parts.len() == 3 || parts.len() == 4 {
            let r = hex_to_u8(parts[0])
                .with_context(|| format!("Failed to parse red component: {}", parts[0]))?;
            let g = hex_to_u8(parts[1])
                .with_context(|| format!("Failed to parse green component: {}", parts[1]))?;
            let b = hex_to_u8(parts[2])
                .with_context(|| format!("Failed to parse blue component: {}", parts[2]))?;
            return Ok(BitColor::new(r, g, b));
        }
        return Err(anyhow!(
            "Invalid rgb: format - expected 3 or 4 components, got {}",
            parts.len()
        ));
    }

    if s.starts_with('#') && (s.len() == 7 || s.len() == 9) {
        let component = |range: std::ops::Range<usize>, name: &str| {
            let digits = s.get(range).unwrap_or_default();
            u8::from_str_radix(digits, 16)
                .with_context(|| format!("Failed to parse {name} hex component: {digits}"))
        };
        return Ok(BitColor::new(
            component(1..3, "red")?,
            component(3..5, "green")?,
            component(5..7, "blue")?,
        ));
    }

    let re =
        Regex::new(r"^rgb\((\d+),\s*(\d+),\s*(\d+)\)$").context("Failed to compile RGB regex")?;
    if let Some(caps) = re.captures(s) {
        let channel = |i: usize, name: &str| {
            caps[i]
                .parse::<u8>()
                .with_context(|| format!("Failed to parse {name} component: {}", &caps[i]))
        };
        return Ok(BitColor::new(
            channel(1, "red")?,
            channel(2, "green")?,
            channel(3, "blue")?,
        ));
    }

    Err(anyhow!("Unrecognized color format: {}", s))
}

/// Convert a 2- or 4-digit hex string to u8, scaling 16-bit values down.
fn hex_to_u8(hex: &str) -> anyhow::Result<u8> {
    let n = u32::from_str_radix(hex, 16).with_context(|| format!("Invalid hex string: {hex}"))?;

    match hex.len() {
        2 => {
            #[allow(clippy::cast_possible_truncation)]
            Ok(n as u8)
        }
        4 => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Ok(((f64::from(n) / 65535.0) * 255.0).round() as u8)
        }
        _ => Err(anyhow!(
            "Invalid hex length: expected 2 or 4 characters, got {}",
            hex.len()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: BitColor = BitColor { r: 0, g: 0, b: 0 };
    const WHITE: BitColor = BitColor {
        r: 255,
        g: 255,
        b: 255,
    };

    fn make_colors(fg: BitColor, bg: BitColor) -> Colors {
        Colors::new(BTreeMap::from([(Role::Foreground, fg), (Role::Background, bg)]))
            .expect("fg and bg present")
    }

    #[test]
    fn test_parse_rgb_hex() -> anyhow::Result<()> {
        assert_eq!(parse_rgb("#000000")?, BitColor::new(0, 0, 0));
        assert_eq!(parse_rgb("#ff0000")?, BitColor::new(255, 0, 0));
        assert_eq!(parse_rgb("#ffffff")?, BitColor::new(255, 255, 255));
        assert_eq!(parse_rgb("#ff0000ff")?, BitColor::new(255, 0, 0));
        assert_eq!(parse_rgb("#AbC123")?, BitColor::new(171, 193, 35));
        assert_eq!(parse_rgb("  #ff0000  ")?, BitColor::new(255, 0, 0));

        assert!(parse_rgb("#gg0000").is_err());
        assert!(parse_rgb("#f00").is_err());
        assert!(parse_rgb("#ff0000ff00").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_rgb_rgb_format() -> anyhow::Result<()> {
        assert_eq!(parse_rgb("rgb(0,0,0)")?, BitColor::new(0, 0, 0));
        assert_eq!(parse_rgb("rgb(171, 193, 35)")?, BitColor::new(171, 193, 35));
        assert_eq!(parse_rgb("  rgb(255,0,0)  ")?, BitColor::new(255, 0, 0));

        assert!(parse_rgb("rgb(0,0,256)").is_err());
        assert!(parse_rgb("rgb(0,0)").is_err());
        assert!(parse_rgb("rgb(0,0,0,0)").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_rgb_rgb_colon_format() -> anyhow::Result<()> {
        assert_eq!(parse_rgb("rgb:0000/0000/0000")?, BitColor::new(0, 0, 0));
        assert_eq!(parse_rgb("rgb:ffff/ffff/ffff")?, BitColor::new(255, 255, 255));
        assert_eq!(parse_rgb("rgb:abcd/C1AB/230A")?, BitColor::new(171, 193, 35));
        assert_eq!(parse_rgb("  rgb:00/11/22  ")?, BitColor::new(0, 17, 34));
        assert_eq!(parse_rgb("rgba:1111/2222/3333/4444")?, BitColor::new(17, 34, 51));

        assert!(parse_rgb("rgb:gggg/gggg/gggg").is_err());
        assert!(parse_rgb("rgb:000/000/000").is_err());
        assert!(parse_rgb("rgb:0000/0000/0000/0000/0000").is_err());
        Ok(())
    }

    #[test]
    fn test_hex_to_u8() -> anyhow::Result<()> {
        assert_eq!(hex_to_u8("00")?, 0);
        assert_eq!(hex_to_u8("ff")?, 255);
        assert_eq!(hex_to_u8("8000")?, 128);
        assert_eq!(hex_to_u8("abcd")?, 171);

        assert!(hex_to_u8("00000").is_err());
        assert!(hex_to_u8("xyz").is_err());
        assert!(hex_to_u8("").is_err());
        Ok(())
    }

    #[test]
    fn test_bit_color_from_channels() {
        assert!(BitColor::from_channels(0, 128, 255).is_ok());
        assert!(BitColor::from_channels(-1, 0, 0).is_err());
        assert!(BitColor::from_channels(256, 0, 0).is_err());
    }

    #[test]
    fn test_linear_color_bounds() {
        assert!(LinearColor::new(0.0, 0.5, 1.0).is_ok());
        assert!(LinearColor::new(-1.0, 0.0, 0.0).is_err());
        assert!(LinearColor::new(2.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_linear_color_relative_luminance() -> Result<()> {
        assert!(LinearColor::new(0.0, 0.0, 0.0)?.relative_luminance().abs() < 1e-9);
        assert!((LinearColor::new(0.5, 0.5, 0.5)?.relative_luminance() - 0.5).abs() < 1e-9);
        assert!((LinearColor::new(1.0, 1.0, 1.0)?.relative_luminance() - 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_linear_color_interpolate() -> Result<()> {
        let c1 = LinearColor::new(0.5, 0.0, 0.3)?;
        let c2 = LinearColor::new(0.9, 0.1, 0.7)?;
        let mixed = c1.interpolate(c2, 0.8);
        assert!((mixed.r() - 0.82).abs() < 1e-9);
        assert!((mixed.g() - 0.08).abs() < 1e-9);
        assert!((mixed.b() - 0.62).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_luminance() {
        assert!(BLACK.luminance().abs() < 0.001);
        assert!((WHITE.luminance() - 1.0).abs() < 0.001);
        assert!((BitColor::new(255, 0, 0).luminance() - 0.2126).abs() < 0.001);
        assert!((BitColor::new(0, 255, 0).luminance() - 0.7152).abs() < 0.001);
        assert!((BitColor::new(0, 0, 255).luminance() - 0.0722).abs() < 0.001);
        assert!(BitColor::new(2, 2, 2).luminance() > BitColor::new(1, 1, 1).luminance());
    }

    #[test]
    fn test_linear_round_trip() {
        for v in 0..=255 {
            let color = BitColor::new(v, 255 - v, v / 2);
            assert_eq!(BitColor::from_linear(color.to_linear()), color);
        }
    }

    #[test]
    fn test_from_linear_saturates() {
        let over = WHITE.to_linear().interpolate(BLACK.to_linear(), -0.5);
        assert_eq!(BitColor::from_linear(over), WHITE);
        let under = BLACK.to_linear().interpolate(WHITE.to_linear(), -0.5);
        assert_eq!(BitColor::from_linear(under), BLACK);
    }

    #[test]
    fn test_role_names() -> Result<()> {
        assert_eq!("foreground".parse::<Role>()?, Role::Foreground);
        assert_eq!("cursor_text".parse::<Role>()?, Role::CursorText);
        assert_eq!("ansi_15".parse::<Role>()?, Role::Ansi(15));
        assert_eq!(Role::Ansi(3).to_string(), "ansi_3");
        assert!("ansi_16".parse::<Role>().is_err());
        assert!(matches!(
            "badge".parse::<Role>(),
            Err(Error::UnknownRole(key)) if key == "badge"
        ));
        Ok(())
    }

    #[test]
    fn test_colors_require_fg_and_bg() {
        let only_fg = BTreeMap::from([(Role::Foreground, BLACK)]);
        assert!(matches!(
            Colors::new(only_fg),
            Err(Error::MissingRole(Role::Background))
        ));
    }

    #[test]
    fn test_colors_relative_luminance() {
        assert!((make_colors(BLACK, WHITE).relative_luminance() - 1.0).abs() < 1e-9);
        assert!(make_colors(WHITE, BLACK).relative_luminance().abs() < 1e-9);
    }

    #[test]
    fn test_colors_contrast_ratio() {
        assert!((make_colors(BLACK, WHITE).contrast_ratio() - 1.0).abs() < 1e-9);
        assert!((make_colors(WHITE, BLACK).contrast_ratio() - 1.0).abs() < 1e-9);
        assert!(make_colors(BLACK, BLACK).contrast_ratio().abs() < 1e-9);
        assert!(make_colors(WHITE, WHITE).contrast_ratio().abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_colors() {
        let colors1 = make_colors(BLACK, WHITE);
        let colors2 = make_colors(WHITE, BLACK);
        assert_eq!(colors1.interpolate(&colors2, 0.0), colors1);
        assert_eq!(colors1.interpolate(&colors2, 1.0), colors2);
        let middle = colors1.interpolate(&colors2, 0.5);
        assert_eq!(middle.foreground(), middle.background());
    }

    #[test]
    fn test_interpolate_colors_keeps_shared_roles_only() -> Result<()> {
        let red = BitColor::new(255, 0, 0);
        let a = Colors::new(BTreeMap::from([
            (Role::Foreground, BLACK),
            (Role::Background, WHITE),
            (Role::Ansi(1), red),
        ]))?;
        let b = Colors::new(BTreeMap::from([
            (Role::Foreground, WHITE),
            (Role::Background, BLACK),
            (Role::Cursor, red),
        ]))?;
        let mixed = a.interpolate(&b, 1.0);
        assert_eq!(mixed.get(Role::Ansi(1)), None);
        assert_eq!(mixed.get(Role::Cursor), None);
        assert_eq!(mixed.iter().count(), 2);
        assert_eq!(mixed, make_colors(WHITE, BLACK));
        Ok(())
    }

    #[test]
    fn test_display() {
        assert_eq!(BitColor::new(255, 128, 0).to_string(), "#ff8000");
    }
}
