//! # Cadence Config
//!
//! TOML configuration for the Cadence scheduler: `[logging]`,
//! `[scheduler]` and one `[[jobs]]` table per scheduled command.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
