/**
 * Logging Setup
 *
 * Installs a `tracing` fmt subscriber for hosts that do not bring their own.
 * `RUST_LOG` wins over the default filter passed in.
 */

use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// Returns `false` when a subscriber was already installed, which is harmless.
pub fn init(default_filter: &str) -> bool {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());

    let installed = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&env_filter))
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Tracing initialised with filter {}", env_filter);
    }
    installed
}
