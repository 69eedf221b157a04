//! docuval configuration system.
//!
//! Provides TOML-based configuration for the validation agent: remote model
//! settings, the reference data the checks run against, and logging. All
//! sections use sensible defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docuval_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("model: {}", config.agent.model);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

// Re-export core types for convenience
pub use schema::{AgentConfig, DocuvalConfig, LoggingConfig, ReferenceConfig, CONFIG_SCHEMA_VERSION};
pub use toml_loader::{default_config_path, load_from_path};

use docuval_common::ConfigError;

/// Convenience function to load config from the platform default path.
///
/// Loads `config.toml` from the OS config directory, creates a default
/// if none exists, and validates the result.
pub fn load_config() -> Result<DocuvalConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &DocuvalConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
