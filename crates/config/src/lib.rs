//! Configuration loading, env substitution, and validation.
//!
//! Config files: `reshare.toml`, `reshare.yaml`, or `reshare.json`
//! Searched in `./` then `~/.config/reshare/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, data_dir, discover_and_load, find_config_file, load_config},
    schema::{ChannelSettings, DatabaseConfig, PublishingConfig, ReshareConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
