//! Error kinds surfaced by the scoring and selection core.

use thiserror::Error;

use crate::color::Role;

/// Convenience alias used across the core modules.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while reading config, building colors, or choosing a preset.
#[derive(Debug, Error)]
pub enum Error {
    /// A config key is missing, unparsable, or outside its allowed range.
    #[error("invalid {key} config: {reason}")]
    Config {
        /// Fully qualified key, e.g. `smart.sun_weight`.
        key: String,
        /// What went wrong with the value.
        reason: String,
    },

    /// There are no presets to choose from.
    #[error("no color presets to choose from")]
    NoPresets,

    /// Excluding the recent history left nothing to choose from.
    #[error("{0}: cannot satisfy smart.avoid_repeat config")]
    AvoidRepeat(usize),

    /// An environmental signal could not be read.
    #[error("{source_name}: {reason}")]
    Signal {
        /// Name of the program or service that failed.
        source_name: String,
        /// What went wrong.
        reason: String,
    },

    /// A color set lacks one of the mandatory roles.
    #[error("colors are missing the {0} role")]
    MissingRole(Role),

    /// A color channel is outside its valid range.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A key does not name a color role.
    #[error("{0}: unknown color role")]
    UnknownRole(String),

    /// A preset name does not exist in the pool.
    #[error("{0}: unknown preset")]
    UnknownPreset(String),
}

impl Error {
    pub(crate) fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn signal(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Signal {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
