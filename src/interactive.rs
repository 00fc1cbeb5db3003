//! Interactive preset browsing.
//!
//! [`Menu`] holds the browsing state and turns keys into [`Outcome`]s. The
//! caller owns the terminal: it applies colors when the current preset
//! changes and saves favorites when they change.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::{Error, Result};
use crate::select::{Preset, PresetSelector};

/// Key help printed when browsing starts.
pub const MENU_HELP: &str = "\
j  next               J  next favorite
k  previous           K  previous favorite
l  switch light/dark  f  toggle favorite
s  shuffle            i  show info
q  quit
";

/// A menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Step to the next preset.
    Next,
    /// Step to the previous preset.
    Prev,
    /// Step forward to the next favorite.
    NextFavorite,
    /// Step back to the previous favorite.
    PrevFavorite,
    /// Switch to the light or dark counterpart.
    LightDark,
    /// Add or remove the current preset from the favorites.
    ToggleFavorite,
    /// Shuffle the browsing order.
    Shuffle,
    /// Show brightness and contrast.
    Info,
    /// Leave the menu.
    Quit,
}

impl Key {
    /// The command bound to a typed byte, if any.
    ///
    /// Ctrl-C and Ctrl-D quit, since the terminal does not turn them into
    /// signals while browsing.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        let key = match byte {
            b'j' | b' ' | b'\n' | b'\r' => Self::Next,
            b'k' => Self::Prev,
            b'J' => Self::NextFavorite,
            b'K' => Self::PrevFavorite,
            b'l' => Self::LightDark,
            b'f' => Self::ToggleFavorite,
            b's' => Self::Shuffle,
            b'i' => Self::Info,
            b'q' | b'Q' | 0x03 | 0x04 => Self::Quit,
            _ => return None,
        };
        Some(key)
    }
}

/// What the caller has to do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to apply.
    Unchanged,
    /// The current preset changed and its colors should be applied.
    Changed,
    /// The favorites changed and should be saved.
    FavoritesChanged,
    /// The user asked to leave.
    Quit,
}

/// Browsing state over the presets of a selector.
pub struct Menu<'m, 'a> {
    selector: &'m PresetSelector<'a>,
    order: Vec<&'m str>,
    index: usize,
    favorites: BTreeSet<String>,
    info: Option<String>,
}

impl<'m, 'a> Menu<'m, 'a> {
    /// Start browsing at `current`, or at the first preset when it is
    /// unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPresets`] when the selector is empty.
    pub fn new(
        selector: &'m PresetSelector<'a>,
        current: Option<&str>,
        favorites: BTreeSet<String>,
    ) -> Result<Self> {
        let order: Vec<&str> = selector.presets().map(Preset::name).collect();
        if order.is_empty() {
            return Err(Error::NoPresets);
        }
        let index = current
            .and_then(|current| order.iter().position(|&name| name == current))
            .unwrap_or(0);
        Ok(Self {
            selector,
            order,
            index,
            favorites,
            info: None,
        })
    }

    /// Name of the preset under the cursor.
    #[must_use]
    pub fn current(&self) -> &'m str {
        self.order[self.index]
    }

    /// Position of the cursor in the browsing order.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The favorites, including toggles made while browsing.
    #[must_use]
    pub fn favorites(&self) -> &BTreeSet<String> {
        &self.favorites
    }

    fn step(&mut self, forward: bool) {
        let len = self.order.len();
        self.index = if forward {
            (self.index + 1) % len
        } else {
            (self.index + len - 1) % len
        };
    }

    fn step_favorite(&mut self, forward: bool) -> Outcome {
        if !self.order.iter().any(|&name| self.favorites.contains(name)) {
            self.info = Some("no favorites".to_string());
            return Outcome::Unchanged;
        }
        loop {
            self.step(forward);
            if self.favorites.contains(self.current()) {
                return Outcome::Changed;
            }
        }
    }

    /// Apply `key` to the browsing state.
    pub fn dispatch<R: Rng + ?Sized>(&mut self, key: Key, rng: &mut R) -> Outcome {
        debug!("key={key:?} current={}", self.current());
        match key {
            Key::Next => {
                self.step(true);
                Outcome::Changed
            }
            Key::Prev => {
                self.step(false);
                Outcome::Changed
            }
            Key::NextFavorite => self.step_favorite(true),
            Key::PrevFavorite => self.step_favorite(false),
            Key::LightDark => {
                let other = self.selector.light_dark_alternate(self.current());
                match other.and_then(|other| self.order.iter().position(|&name| name == other)) {
                    Some(index) => {
                        self.index = index;
                        Outcome::Changed
                    }
                    None => {
                        self.info = Some("no light/dark version".to_string());
                        Outcome::Unchanged
                    }
                }
            }
            Key::ToggleFavorite => {
                let name = self.current();
                if self.favorites.remove(name) {
                    self.info = Some("unfavorited".to_string());
                } else {
                    self.favorites.insert(name.to_string());
                    self.info = Some("favorited".to_string());
                }
                Outcome::FavoritesChanged
            }
            Key::Shuffle => {
                self.order.shuffle(rng);
                self.info = Some("shuffled".to_string());
                Outcome::Changed
            }
            Key::Info => {
                if let Some(preset) = self.selector.get(self.current()) {
                    self.info = Some(format!(
                        "brightness={:.3}, contrast={:.3}",
                        preset.brightness(),
                        preset.contrast()
                    ));
                }
                Outcome::Unchanged
            }
            Key::Quit => Outcome::Quit,
        }
    }

    /// The status line, e.g. `[3*] solarized-dark (favorited)`.
    ///
    /// The pending info message is shown once.
    pub fn status(&mut self) -> String {
        let star = if self.favorites.contains(self.current()) {
            "*"
        } else {
            ""
        };
        let info = self
            .info
            .take()
            .map(|info| format!(" ({info})"))
            .unwrap_or_default();
        format!("[{}{star}] {}{info}", self.index, self.current())
    }
}
