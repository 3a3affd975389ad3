//! Logging helpers shared by the binaries of this workspace.
//!
//! Every binary installs the same subscriber: an [`EnvFilter`] from `RUST_LOG`
//! (falling back to a default) and one compact formatting layer with RFC3339
//! UTC timestamps.

use std::io::{self, IsTerminal};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// RFC3339 UTC timer via `chrono`, e.g. `2025-09-12T10:20:30Z`.
#[derive(Clone, Debug, Default)]
pub struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// `RUST_LOG` if set, otherwise `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the global subscriber used by the binaries.
///
/// Returns `false` if a subscriber was already installed (e.g. in tests).
pub fn init(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(
            fmt::layer()
                .with_timer(ChronoRfc3339Utc)
                .with_target(true)
                .with_ansi(io::stdout().is_terminal())
                .compact(),
        )
        .try_init()
        .is_ok()
}
