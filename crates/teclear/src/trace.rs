//! Suite logging setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the fmt subscriber, honoring `RUST_LOG`.
///
/// Defaults to `info` when no filter is set. Safe to call more than once;
/// later calls are no-ops, so every test can call it in its setup.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
