//! Logging initialisation

/// Initialize the logging system
///
/// Honours `RUST_LOG`; defaults to `info` when the variable is unset.
/// Safe to call more than once (later calls are ignored).
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Initialize logging for tests, capturing output per test
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
