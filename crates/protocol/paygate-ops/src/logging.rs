//! Tracing setup for hosts embedding the gateway.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global `fmt` subscriber.
///
/// Honors `RUST_LOG`; without it the filter is `paygate=info`, or
/// `paygate=debug` when `verbose`. Calling this again (or after another
/// subscriber was installed) does nothing and returns false.
pub fn init_tracing(verbose: bool) -> bool {
    let default = if verbose { "paygate=debug" } else { "paygate=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _first = init_tracing(false);
        assert!(!init_tracing(true));
    }
}
