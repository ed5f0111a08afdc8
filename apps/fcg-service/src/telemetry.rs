//! Logging bootstrap.
//!
//! Audit events (deposits, purchases, role changes, lifecycle transitions)
//! are emitted on the `audit` target, so they can be routed separately:
//!
//! ```text
//! RUST_LOG=warn,audit=info
//! ```

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,fcg=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// Returns `false` if a subscriber was already installed (e.g. by the host
/// process), in which case the existing one is kept.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
