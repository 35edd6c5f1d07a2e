//! Core functionality for the lift-call client.
//!
//! This crate holds the ambient pieces shared by the client crates:
//! configuration loading, configuration errors and logging setup.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CallConfig, Config, CredentialsConfig, GatewayConfig, PolicyConfig};
pub use error::{ConfigError, Result};
pub use logging::LogFormat;
