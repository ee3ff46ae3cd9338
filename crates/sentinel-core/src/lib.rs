//! Basis Sentinel Core
//!
//! Core types, configuration, and errors for the Basis Sentinel trading system.

pub mod config;
pub mod error;
pub mod portfolio;
pub mod types;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use portfolio::*;
pub use types::*;
