//! Terminal color preset selection.
//!
//! Presets are scored on how well their brightness follows the sun and how
//! well their contrast suits the display brightness, with a little randomness
//! and an anti-repeat history on top. The terminal side queries and sets
//! colors through OSC escape sequences.

pub mod color;
pub mod config;
pub mod error;
pub mod interactive;
pub mod logs;
pub mod osc;
pub mod presets;
pub mod rank;
pub mod select;
pub mod services;
pub mod solar;
pub mod store;
pub mod terminal;

pub use error::{Error, Result};
