//! Pbichat Core - shared foundation for the Power BI chat service
//!
//! Defines the error model, logging bootstrap, configuration loading, and
//! small async helpers used by the rest of the workspace.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tokio;
pub use tracing;
