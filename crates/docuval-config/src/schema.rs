//! Configuration schema types for docuval.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! The default reference tables carry the known-valid business data the
//! validation agent checks documents against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocuvalConfig {
    pub agent: AgentConfig,
    pub reference: ReferenceConfig,
    pub logging: LoggingConfig,
}

impl Default for DocuvalConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            reference: ReferenceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// =============================================================================
// Agent Config
// =============================================================================

/// Remote decision-maker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model name sent to the chat-completions endpoint.
    pub model: String,
    /// Maximum tool-call rounds before the session gives up.
    pub max_rounds: u32,
    /// Completion token cap per round.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Base URL override for OpenAI-compatible gateways.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            max_rounds: 10,
            max_tokens: 1024,
            temperature: 0.0,
            base_url: None,
        }
    }
}

// =============================================================================
// Reference Config
// =============================================================================

/// Known-valid business data the validation checks run against.
///
/// Uses a `BTreeMap` for postal codes so serialized output is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub supplier_addresses: Vec<String>,
    pub customer_addresses: Vec<String>,
    pub account_numbers: Vec<String>,
    pub order_numbers: Vec<String>,
    /// chrono format string for due dates on invoices.
    pub due_date_format: String,
    pub postal_codes: BTreeMap<String, String>,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            supplier_addresses: vec![
                "Dodavatel s.r.o., Hlavní 123, Praha 1".into(),
                "ABC Company, Nová 45, Brno".into(),
                "XYZ s.r.o., Dlouhá 78, Ostrava".into(),
            ],
            customer_addresses: vec![
                "Odběratel a.s., Krátká 10, Praha 2".into(),
                "Firma ABC, Zelená 25, Brno".into(),
                "Společnost XYZ, Modrá 5, Ostrava".into(),
            ],
            account_numbers: vec![
                "123456789/0100".into(),
                "987654321/0800".into(),
                "555666777/2010".into(),
            ],
            order_numbers: vec![
                "OBJ-2024-001".into(),
                "OBJ-2024-002".into(),
                "OBJ-2024-003".into(),
            ],
            due_date_format: "%Y-%m-%d".into(),
            postal_codes: BTreeMap::from([
                ("11000".into(), "Praha 1".into()),
                ("12000".into(), "Praha 2".into()),
                ("60200".into(), "Brno".into()),
                ("70200".into(), "Ostrava".into()),
                ("30100".into(), "Plzeň".into()),
                ("37001".into(), "České Budějovice".into()),
                ("50002".into(), "Hradec Králové".into()),
                ("77900".into(), "Olomouc".into()),
                ("40001".into(), "Ústí nad Labem".into()),
                ("46001".into(), "Liberec".into()),
                ("54901".into(), "Nové Město nad Metují".into()),
            ]),
        }
    }
}

// =============================================================================
// Logging Config
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level directive: trace, debug, info, warn or error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
