//! Logging utilities.
//!
//! The GPU layer only talks to the `log` facade; this module offers a
//! ready-made `env_logger` setup for binaries and tests.

mod init;

pub use init::{init_logging, LoggingConfig};
