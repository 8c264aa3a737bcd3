use tracing_subscriber::EnvFilter;

/// Installs a `tracing-subscriber` registry reading `RUST_LOG`, falling back
/// to `info` (SPEC_FULL §B). Safe to call more than once per process; later
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
