//! Logging init: diagnostics go to stderr so stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Maps the number of `-v` flags to a default filter.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info,lucide_svg_rs=info",
        _ => "debug,lucide_svg_rs=debug",
    }
}

/// Initialize structured logging on stderr. `RUST_LOG` overrides the verbosity.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(default_filter(0), "warn");
        assert!(default_filter(1).starts_with("info"));
        assert!(default_filter(5).starts_with("debug"));
    }
}
