//! Full configuration validation.
//!
//! Validates numeric ranges, reference-set contents, and the log level.

use crate::schema::DocuvalConfig;
use docuval_common::ConfigError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &DocuvalConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    // Agent constraints
    validate_range(&mut errors, "agent.max_rounds", config.agent.max_rounds, 1, 50);
    validate_range(&mut errors, "agent.max_tokens", config.agent.max_tokens, 1, 128_000);
    validate_range_f64(
        &mut errors,
        "agent.temperature",
        config.agent.temperature,
        0.0,
        2.0,
    );
    if config.agent.model.trim().is_empty() {
        errors.push("agent.model must not be empty".into());
    }

    // Reference data must have something to validate against
    validate_non_empty(
        &mut errors,
        "reference.supplier_addresses",
        &config.reference.supplier_addresses,
    );
    validate_non_empty(
        &mut errors,
        "reference.customer_addresses",
        &config.reference.customer_addresses,
    );
    validate_non_empty(
        &mut errors,
        "reference.account_numbers",
        &config.reference.account_numbers,
    );
    validate_non_empty(
        &mut errors,
        "reference.order_numbers",
        &config.reference.order_numbers,
    );
    if !config.reference.due_date_format.contains('%') {
        errors.push(format!(
            "reference.due_date_format '{}' contains no format specifier",
            config.reference.due_date_format
        ));
    }

    // Logging
    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "logging.level '{}' is not one of {LOG_LEVELS:?}",
            config.logging.level
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_range(errors: &mut Vec<String>, field: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{field} = {value} is outside {min}..={max}"));
    }
}

fn validate_range_f64(errors: &mut Vec<String>, field: &str, value: f64, min: f64, max: f64) {
    if !(min..=max).contains(&value) {
        errors.push(format!("{field} = {value} is outside {min}..={max}"));
    }
}

fn validate_non_empty(errors: &mut Vec<String>, field: &str, values: &[String]) {
    if values.is_empty() {
        errors.push(format!("{field} must contain at least one entry"));
    } else if values.iter().any(|v| v.trim().is_empty()) {
        errors.push(format!("{field} contains a blank entry"));
    }
}
