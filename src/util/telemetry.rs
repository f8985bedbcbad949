//! Telemetry helpers for structured logging.

/// Install a default env-filtered fmt subscriber unless the host already set one.
///
/// Filtering follows `RUST_LOG`, e.g. `RUST_LOG=muster=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .try_init();
}
