//! # docqa-telemetry
//!
//! Logging setup for docqa binaries and tests.
//!
//! - [`init_telemetry`] - human-readable output for terminals
//! - [`init_json`] - one JSON object per line for log collectors
//! - [`init_with_capture`] - human-readable output plus an in-memory
//!   [`CapturedEvents`] store that tests can assert against
//!
//! All three honor `RUST_LOG`; without it the default level is `info`, with
//! `debug` for the named service. Only the first initialization in a process
//! takes effect; later calls return an error that callers may ignore.

pub mod capture;

pub use capture::{CapturedEvent, CapturedEvents, EventCaptureLayer};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Error returned when a global subscriber is already installed.
pub type InitError = tracing_subscriber::util::TryInitError;

fn env_filter(service_name: &str) -> EnvFilter {
    let crate_name = service_name.replace('-', "_");
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{crate_name}=debug,docqa_rag=debug")))
}

/// Install a human-readable global subscriber.
pub fn init_telemetry(service_name: &str) -> Result<(), InitError> {
    tracing_subscriber::registry()
        .with(env_filter(service_name))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}

/// Install a JSON-lines global subscriber.
pub fn init_json(service_name: &str) -> Result<(), InitError> {
    tracing_subscriber::registry()
        .with(env_filter(service_name))
        .with(tracing_subscriber::fmt::layer().json().with_current_span(true).flatten_event(true))
        .try_init()
}

/// Install a global subscriber that also records every event into `storage`.
pub fn init_with_capture(service_name: &str, storage: CapturedEvents) -> Result<(), InitError> {
    tracing_subscriber::registry()
        .with(env_filter(service_name))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(EventCaptureLayer::new(storage))
        .try_init()
}

#[cfg(test)]
mod test_capture;
