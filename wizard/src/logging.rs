//! # Structured Logging
//!
//! Sets up the `tracing` subscriber for the wizard. Output goes to stderr so
//! stdout carries nothing but the JSON document each subcommand prints.
//!
//! Filtering is per crate: a bare level such as `debug` applies to
//! `txn_wizard` and `txn_composer` only, leaving dependencies (sled in
//! particular) at `warn`. `RUST_LOG` replaces all of it when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose logs the `--log-level` flag controls.
const OWN_CRATES: [&str; 2] = ["txn_wizard", "txn_composer"];

/// Level for everything else.
const DEPENDENCY_LEVEL: &str = "warn";

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored output.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Accepts "json" in any case; anything else is `Pretty`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Turns the `--log-level` value into filter directives.
///
/// A bare level is scoped to the wizard's own crates. Anything else is taken
/// as a full directive string.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if !LEVELS.contains(&level.to_lowercase().as_str()) {
        return level.to_string();
    }
    let level = level.to_lowercase();
    std::iter::once(DEPENDENCY_LEVEL.to_string())
        .chain(OWN_CRATES.iter().map(|krate| format!("{krate}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the global tracing subscriber. Call once, early in `main()`.
pub fn init_logging(level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .without_time(),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    }

    tracing::debug!(?format, "logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_lenient() {
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy("xml"), LogFormat::Pretty);
    }

    #[test]
    fn bare_level_targets_own_crates() {
        assert_eq!(
            filter_directives("DEBUG"),
            "warn,txn_wizard=debug,txn_composer=debug"
        );
        assert_eq!(filter_directives(" info "), "warn,txn_wizard=info,txn_composer=info");
    }

    #[test]
    fn full_directives_pass_through() {
        assert_eq!(filter_directives("sled=info,txn_composer=trace"), "sled=info,txn_composer=trace");
    }

    #[test]
    fn directives_parse_as_filters() {
        for level in ["trace", "off", "txn_wizard=debug"] {
            assert!(EnvFilter::try_new(filter_directives(level)).is_ok(), "{level}");
        }
    }
}
