//! TOML config file loading and creation.

use crate::schema::DocuvalConfig;
use crate::validation;
use docuval_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields.
/// After loading, the config is validated; if validation fails, a warning
/// is logged and the default config is returned.
pub fn load_from_path(path: &Path) -> Result<DocuvalConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: DocuvalConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    // Validate and warn on errors, but still return a usable config
    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
        warn!("falling back to default config");
        return Ok(DocuvalConfig::default());
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/docuval/config.toml`
/// On Linux: `~/.config/docuval/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<DocuvalConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("no config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(DocuvalConfig::default());
    }

    load_from_path(&path)
}

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<std::path::PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join("docuval").join("config.toml"))
}

/// Create a default TOML config file with documentation comments.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let content = default_config_toml();

    std::fs::write(path, content).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}

/// Generate the default TOML config content with comments.
fn default_config_toml() -> String {
    r##"# docuval configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[agent]
# model = "gpt-4o"
# max_rounds = 10        # 1-50
# max_tokens = 1024
# temperature = 0.0      # 0.0-2.0
# base_url = "https://api.openai.com/v1/chat/completions"

[logging]
# level = "info"         # trace, debug, info, warn, error

[reference]
supplier_addresses = [
    "Dodavatel s.r.o., Hlavní 123, Praha 1",
    "ABC Company, Nová 45, Brno",
    "XYZ s.r.o., Dlouhá 78, Ostrava",
]
customer_addresses = [
    "Odběratel a.s., Krátká 10, Praha 2",
    "Firma ABC, Zelená 25, Brno",
    "Společnost XYZ, Modrá 5, Ostrava",
]
account_numbers = [
    "123456789/0100",
    "987654321/0800",
    "555666777/2010",
]
order_numbers = [
    "OBJ-2024-001",
    "OBJ-2024-002",
    "OBJ-2024-003",
]
# due_date_format = "%Y-%m-%d"

[reference.postal_codes]
11000 = "Praha 1"
12000 = "Praha 2"
60200 = "Brno"
70200 = "Ostrava"
30100 = "Plzeň"
37001 = "České Budějovice"
50002 = "Hradec Králové"
77900 = "Olomouc"
40001 = "Ústí nad Labem"
46001 = "Liberec"
54901 = "Nové Město nad Metují"
"##
    .to_string()
}
