//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

use env_logger::Env;

/// Initialize the logging system
///
/// Defaults to the `info` filter; `RUST_LOG` overrides it. Records carry a
/// microsecond timestamp. Calling this more than once is harmless.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .try_init();
}

/// Initialize logging for unit tests, capturing output per test
#[cfg(test)]
pub fn init_for_tests() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}
