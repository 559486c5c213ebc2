//! Logging setup
//!
//! Installs a `tracing-subscriber` registry writing to stderr, so command
//! output on stdout stays machine readable. Scan failures are logged at
//! `warn`, strategy switches at `info`, per-candidate progress at `debug`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Shape of emitted log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output
    Pretty,
    /// One JSON object per event, with the current span
    Json,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Filter directive used when `RUST_LOG` is unset
///
/// Dependencies only report warnings; the engine and sdk crates log at
/// `level`.
pub fn default_directive(level: &str) -> String {
    format!("warn,scout_engine={level},sdk={level}", level = level)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(level)))
}

/// Initialize logging at `level` in the given format
///
/// Priority: `RUST_LOG` env var > `level`. A second call is a no-op.
pub fn init_telemetry_with_format(level: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter(level));
    let layer = fmt::layer().with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Pretty => registry.with(layer.pretty().with_target(false)).try_init(),
        LogFormat::Json => registry.with(layer.json().with_current_span(true)).try_init(),
    };
    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

/// Initialize logging at `level` in the format of the current build
pub fn init_telemetry_with_level(level: &str) {
    init_telemetry_with_format(level, LogFormat::for_build());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_parses() {
        for level in ["error", "warn", "info", "debug", "trace"] {
            let directive = default_directive(level);
            assert!(directive.contains(&format!("scout_engine={}", level)));
            assert!(EnvFilter::try_new(&directive).is_ok());
        }
    }

    #[test]
    fn test_format_follows_build() {
        let expected = if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        };
        assert_eq!(LogFormat::for_build(), expected);
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_telemetry_with_format("debug", LogFormat::Json);
        init_telemetry_with_format("info", LogFormat::Pretty);
        init_telemetry_with_level("warn");
    }
}
