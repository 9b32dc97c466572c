//! prodcat-core: configuration loading and core error types
//!
//! Keeps the database configuration story in one place so the server and
//! CLI crates agree on precedence: environment variable, then config file,
//! then hardcoded default.

pub mod config;
pub mod error;

pub use config::{load_dotenv, DbConfig};
pub use error::{ConfigError, Result};
