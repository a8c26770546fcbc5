//! Human-readable `tracing` output for binaries/tests embedding this
//! crate. Nothing in the workspace calls this on its own — there is no
//! binary host here — it exists for hosts that want the same
//! `EnvFilter` + `fmt` setup the rest of the workspace uses.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global `tracing` subscriber reading `RUST_LOG`, defaulting to
/// `info` if unset or malformed. Safe to call more than once — later calls
/// are no-ops rather than panics, since `#[tokio::test]` suites may each
/// want to opt in independently.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .try_init();
}
