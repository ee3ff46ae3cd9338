//! Basis Sentinel Observability
//!
//! Structured logging setup.

pub mod logging;

pub use logging::{init_logging, init_logging_from_env, level_from_env, LogFormat};
