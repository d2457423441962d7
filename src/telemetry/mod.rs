//! Log output setup for the command-line binary
//!
//! Library code only emits `tracing` events; a subscriber is installed here
//! by the binary. `RUST_LOG` overrides the verbosity flags.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count
pub fn level_for(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install a stderr subscriber. Safe to call more than once.
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity, quiet)));

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
    fn test_levels() {
        assert_eq!(level_for(0, false), "warn");
        assert_eq!(level_for(1, false), "info");
        assert_eq!(level_for(2, false), "debug");
        assert_eq!(level_for(5, false), "trace");
        assert_eq!(level_for(3, true), "error");
    }

    #[test]
    fn test_init_twice() {
        init(0, false);
        init(2, false);
    }
}
