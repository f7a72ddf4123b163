//! Utilities: logging setup (verbosity flags + RUST_LOG).
//!
//! Key items:
//!   init_logging / derive_level

/// Logging helpers.
pub mod logging {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::EnvFilter;

    /// `-q` wins over `-v`; default is info.
    pub fn derive_level(verbose: u8, quiet: bool) -> LevelFilter {
        if quiet {
            return LevelFilter::ERROR;
        }
        match verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Install the global subscriber. `RUST_LOG`, when set, overrides `level`.
    /// Logs go to stderr so stdout stays clean for JSON output.
    pub fn init_logging(level: LevelFilter) {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

pub use logging::{derive_level, init_logging};

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn quiet_overrides_verbose() {
        assert_eq!(derive_level(2, true), LevelFilter::ERROR);
    }

    #[test]
    fn verbosity_steps() {
        assert_eq!(derive_level(0, false), LevelFilter::INFO);
        assert_eq!(derive_level(1, false), LevelFilter::DEBUG);
        assert_eq!(derive_level(5, false), LevelFilter::TRACE);
    }
}
