//! Diagnostics logging setup for the `log` facade, via `simplelog`.
//!
//! This is the runner's own diagnostics channel; the per-job audit log
//! lives in [`logsink`](crate::logsink) and is a domain feature, not a
//! diagnostics one.

use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Initialize a terminal logger for the host process.
pub fn init(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn init_for_tests() {
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_initialization_is_harmless() {
        init_for_tests();
        init_for_tests();
        log::debug!("logger is usable after repeated init");
    }
}
