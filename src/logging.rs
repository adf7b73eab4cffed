//! Tracing subscriber setup for the binary.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "VACCINE_SIM_LOG";

static INIT: Once = Once::new();

/// Installs a global fmt subscriber writing to stderr.
///
/// Reads filter directives from `VACCINE_SIM_LOG`
/// (e.g. `VACCINE_SIM_LOG=vaccine_sim=debug`), falling back to `info`.
/// Calling it more than once is a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
