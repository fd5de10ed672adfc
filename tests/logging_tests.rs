//! Unit tests for the logging helpers.

use mercury_poll::logging::{log_debug, log_error, log_info, log_warn, try_init_logger};

/// Tests that the helpers can be called before and after logger setup.
#[test]
fn test_logging() {
    log_error("before init");
    try_init_logger();
    log_error("This is an error message");
    log_warn("This is a warning message");
    log_info("This is an info message");
    log_debug("This is a debug message");
}

/// Tests that a second initialization is refused instead of panicking.
#[test]
fn test_try_init_logger_twice() {
    try_init_logger();
    assert!(!try_init_logger());
}
