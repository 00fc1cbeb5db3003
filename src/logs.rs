//! Logging setup.
//!
//! Diagnostics go to stderr through `tracing`. `RUST_LOG` takes precedence;
//! without it, setting `DEBUG` to anything enables debug output.

use std::env;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// The level used when `RUST_LOG` is not set.
fn default_level(debug: bool) -> Level {
    if debug { Level::DEBUG } else { Level::WARN }
}

/// Install the global stderr subscriber.
///
/// Calling this more than once is harmless; only the first call installs
/// anything.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_level(env::var_os("DEBUG").is_some()).as_str())
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true), Level::DEBUG);
        assert_eq!(default_level(false), Level::WARN);
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init();
        init();
        tracing::debug!("logging initialized");
    }
}
