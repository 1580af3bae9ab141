// [libs/shared/telemetry/src/lib.rs]
//! Tracing bootstrap shared by every binary in the workspace.
//!
//! Development gets a human-readable layer with ANSI colors; production
//! (anything built without `debug_assertions`) gets flat JSON lines suitable
//! for ingestion by a log pipeline. The env filter defaults to `info` for
//! this service and `warn` for its dependencies, overridable via
//! `RUST_LOG`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber. Panics if a subscriber is
/// already installed — call this exactly once, at process start.
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
        format!("{service_name}={default_level},tower_http=warn,libsql=warn").into()
    });

    if cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    }
}
