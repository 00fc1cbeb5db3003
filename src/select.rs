//! Preset scoring and selection.
//!
//! A smart choice ranks every candidate preset on two axes: brightness, which
//! should follow the sun, and contrast, which should fall as the display gets
//! brighter. Each axis gets an ideal rank from an environmental signal, and a
//! preset scores by how close its own ranks are to the ideals, plus a random
//! term so that equally good presets rotate.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rand::Rng;
use tracing::debug;

use crate::color::Colors;
use crate::config::{Bound, Config};
use crate::error::{Error, Result};
use crate::rank::{bimodal_normalized_ranks, clamp, closeness, map_number, normalized_ranks};
use crate::solar::normalized_solar_elevation;
use crate::store::{History, MAX_SMART_HISTORY};

/// A named set of terminal colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    name: String,
    colors: Colors,
}

impl Preset {
    /// Create a preset.
    #[must_use]
    pub fn new(name: impl Into<String>, colors: Colors) -> Self {
        Self {
            name: name.into(),
            colors,
        }
    }

    /// The preset's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The preset's colors.
    #[must_use]
    pub fn colors(&self) -> &Colors {
        &self.colors
    }

    /// Relative luminance of the background.
    #[must_use]
    pub fn brightness(&self) -> f64 {
        self.colors.relative_luminance()
    }

    /// Normalized foreground/background contrast.
    #[must_use]
    pub fn contrast(&self) -> f64 {
        self.colors.contrast_ratio()
    }
}

/// Pre-weighted score terms for one preset. Higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmartScore {
    /// How well brightness matches the sun.
    pub sun: f64,
    /// How well contrast matches the display brightness.
    pub display: f64,
    /// Random jitter.
    pub random: f64,
}

impl SmartScore {
    /// Sum of all terms.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.sun + self.display + self.random
    }
}

/// Sources of environmental signals.
pub trait Signals {
    /// Current `(latitude, longitude)` in degrees.
    ///
    /// # Errors
    ///
    /// Fails when the location cannot be determined.
    fn location(&self) -> Result<(f64, f64)>;

    /// Brightness of display `display` in `[0, 1]`, or `None` if the display
    /// reports none.
    ///
    /// # Errors
    ///
    /// Fails when the brightness query fails or cannot be parsed.
    fn display_brightness(&self, display: usize) -> Result<Option<f64>>;
}

/// The ranks that would earn a perfect score on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IdealRanks {
    /// Ideal brightness rank, from the sun.
    pub sun: Option<f64>,
    /// Ideal contrast rank, from the display.
    pub display: Option<f64>,
}

/// Manages color presets and selects among them.
pub struct PresetSelector<'a> {
    presets: IndexMap<String, Preset>,
    config: &'a Config,
    signals: &'a dyn Signals,
}

impl<'a> PresetSelector<'a> {
    /// Create a selector over `presets`, kept in the given order.
    #[must_use]
    pub fn new(
        presets: impl IntoIterator<Item = Preset>,
        config: &'a Config,
        signals: &'a dyn Signals,
    ) -> Self {
        Self {
            presets: presets
                .into_iter()
                .map(|preset| (preset.name.clone(), preset))
                .collect(),
            config,
            signals,
        }
    }

    /// Look up a preset by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// All presets in file order.
    pub fn presets(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    fn preset(&self, name: &str) -> Result<&Preset> {
        self.get(name).ok_or_else(|| Error::UnknownPreset(name.to_string()))
    }

    /// The light or dark counterpart of `name`, found by textual substitution.
    ///
    /// Candidates are tried in a fixed order: first turning "light" into
    /// "dark", then the reverse; for each, with and without a leading hyphen,
    /// either deleting the label or swapping it. The first candidate that
    /// differs from `name` and names an existing preset wins.
    #[must_use]
    pub fn light_dark_alternate(&self, name: &str) -> Option<&str> {
        for (a, b) in [("light", "dark"), ("dark", "light")] {
            for from in [a.to_string(), format!("-{a}")] {
                for to in [b.to_string(), format!("-{b}")] {
                    for replacement in ["", to.as_str()] {
                        let other = name.replace(from.as_str(), replacement);
                        if other != name {
                            if let Some((key, _)) = self.presets.get_key_value(other.as_str()) {
                                return Some(key.as_str());
                            }
                        }
                    }
                }
            }
        }
        None
    }

    fn ideal_rank(&self, axis: &str, signal: Option<f64>) -> Result<Option<f64>> {
        let unit = [Bound::Ge(0.0), Bound::Le(1.0)];
        let offset = self.config.float("smart", &format!("{axis}_offset"), &[])?;
        let min = self.config.float("smart", &format!("{axis}_min"), &unit)?;
        let max = self.config.float("smart", &format!("{axis}_max"), &unit)?;
        if min >= max {
            return Err(Error::config(
                format!("smart.{axis}_max"),
                format!("{max} is not greater than smart.{axis}_min ({min})"),
            ));
        }
        Ok(signal.map(|value| {
            map_number(clamp(value + offset, (0.0, 1.0)), (min, max), (0.0, 1.0))
        }))
    }

    /// Ideal sun and display ranks at `score_time`.
    ///
    /// # Errors
    ///
    /// Fails on bad `smart.*` config or when a signal source fails.
    pub fn ideal_ranks(&self, score_time: DateTime<Utc>) -> Result<IdealRanks> {
        let (latitude, longitude) = self.signals.location()?;
        let sun = normalized_solar_elevation(latitude, longitude, score_time);
        let display_number = self
            .config
            .count("smart", "display_number", &[Bound::Ge(0.0)])?;
        let brightness = self.signals.display_brightness(display_number)?;
        debug!("sun={sun} brightness={brightness:?}");

        Ok(IdealRanks {
            sun: self.ideal_rank("sun", Some(sun))?,
            display: self.ideal_rank("display", brightness)?,
        })
    }

    /// Score each of `presets` for a choice made at `score_time`.
    ///
    /// The result keeps the order of `presets`.
    ///
    /// # Errors
    ///
    /// Fails on bad `smart.*` config or when a signal source fails.
    pub fn smart_scores<'p, R: Rng + ?Sized>(
        &self,
        presets: &[&'p Preset],
        score_time: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Vec<(&'p Preset, SmartScore)>> {
        let weight = |part: &str| self.config.float("smart", &format!("{part}_weight"), &[]);
        let (sun_weight, display_weight, random_weight) =
            (weight("sun")?, weight("display")?, weight("random")?);

        // High sun goes with bright presets; a bright display goes with low
        // contrast, hence the reversed display ranks.
        let sun_ranks = if self.config.bool("smart", "sun_bimodal")? {
            bimodal_normalized_ranks(presets, &0.5, |p| p.brightness(), false)
        } else {
            normalized_ranks(presets, |p| p.brightness(), false)
        };
        let display_ranks = normalized_ranks(presets, |p| p.contrast(), true);

        let ideal = self.ideal_ranks(score_time)?;
        debug!("ideal={ideal:?}");

        let scores = presets
            .iter()
            .zip(sun_ranks.into_iter().zip(display_ranks))
            .map(|(&preset, (sun_rank, display_rank))| {
                let term =
                    |ideal: Option<f64>, rank: f64| ideal.map_or(0.0, |i| closeness(rank, i));
                let score = SmartScore {
                    sun: sun_weight * term(ideal.sun, sun_rank),
                    display: display_weight * term(ideal.display, display_rank),
                    random: random_weight * rng.gen_range(0.0..1.0),
                };
                debug!(
                    "{}: sun_rank={sun_rank:.3} display_rank={display_rank:.3} score={score:?}",
                    preset.name
                );
                (preset, score)
            })
            .collect();
        Ok(scores)
    }

    /// Choose the preset with the highest smart score and record it in
    /// `history`.
    ///
    /// With `consider_repetition`, presets among the last
    /// `smart.avoid_repeat` entries of `history` are not considered. Exact
    /// ties go to the first candidate in preset order.
    ///
    /// # Arguments
    ///
    /// * `history` - Past smart choices, oldest first; the choice is appended
    /// * `score_time` - The moment the sun signal is computed for
    /// * `consider_repetition` - Whether to honor `smart.avoid_repeat`
    /// * `rng` - Source of the random score term
    ///
    /// # Returns
    ///
    /// The chosen preset. `history` is left untouched on failure.
    ///
    /// # Errors
    ///
    /// Fails if there are no presets, if the history excludes all of them,
    /// or if scoring fails.
    pub fn smart_choice<R: Rng + ?Sized>(
        &self,
        history: &mut History,
        score_time: DateTime<Utc>,
        consider_repetition: bool,
        rng: &mut R,
    ) -> Result<&Preset> {
        if self.presets.is_empty() {
            return Err(Error::NoPresets);
        }
        let avoid_repeat = if consider_repetition {
            #[allow(clippy::cast_precision_loss)]
            let max = MAX_SMART_HISTORY as f64;
            self.config
                .count("smart", "avoid_repeat", &[Bound::Ge(0.0), Bound::Le(max)])?
        } else {
            0
        };

        let recent: Vec<&str> = history.recent(avoid_repeat).collect();
        let options: Vec<&Preset> = self
            .presets
            .values()
            .filter(|preset| !recent.contains(&preset.name()))
            .collect();
        if options.is_empty() {
            return Err(Error::AvoidRepeat(avoid_repeat));
        }

        let scores = self.smart_scores(&options, score_time, rng)?;
        let mut best: Option<(&Preset, f64)> = None;
        for (preset, score) in scores {
            let total = score.total();
            if best.is_none_or(|(_, top)| total > top) {
                best = Some((preset, total));
            }
        }
        let (choice, total) = best.ok_or(Error::NoPresets)?;
        debug!("choice={} total={total:.3}", choice.name);

        history.push(choice.name.clone());
        Ok(choice)
    }

    /// Colors for a fade from `start` to `end`.
    ///
    /// Yields `animation.frames` steps at `t = i / frames` for `i` in
    /// `1..=frames`, so the last frame is the end preset's colors.
    ///
    /// # Errors
    ///
    /// Fails on an unknown preset name or a bad `animation.frames` value.
    pub fn animation_frames(
        &self,
        start: &str,
        end: &str,
    ) -> Result<impl Iterator<Item = Colors> + '_> {
        let frames = self.config.count("animation", "frames", &[Bound::Gt(0.0)])?;
        let start = self.preset(start)?.colors();
        let end = self.preset(end)?.colors();
        Ok((1..=frames).map(move |i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / frames as f64;
            start.interpolate(end, t)
        }))
    }
}
