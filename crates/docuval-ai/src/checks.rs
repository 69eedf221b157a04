//! Deterministic validation checks over static reference data.
//!
//! Each check is a pure function: it always returns a [`CheckResult`] and
//! never panics past its boundary. A value that fails validation is a
//! normal `valid: false` result.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use docuval_config::ReferenceConfig;

use crate::registry::{require_str, CheckResult, ToolRegistry};
use crate::ToolDefinition;

/// Known-valid business data, built from config at startup and immutable
/// for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    supplier_addresses: HashSet<String>,
    customer_addresses: HashSet<String>,
    account_numbers: HashSet<String>,
    order_numbers: HashSet<String>,
    postal_codes: HashMap<String, String>,
    due_date_format: String,
}

impl ReferenceData {
    pub fn from_config(config: &ReferenceConfig) -> Self {
        Self {
            supplier_addresses: config.supplier_addresses.iter().cloned().collect(),
            customer_addresses: config.customer_addresses.iter().cloned().collect(),
            account_numbers: config.account_numbers.iter().cloned().collect(),
            order_numbers: config.order_numbers.iter().cloned().collect(),
            postal_codes: config
                .postal_codes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            due_date_format: config.due_date_format.clone(),
        }
    }

    pub fn check_supplier_address(&self, address: &str) -> CheckResult {
        if self.supplier_addresses.contains(address) {
            CheckResult::ok("supplier address is on file")
        } else {
            CheckResult::rejected("supplier address is not in the reference set")
        }
    }

    pub fn check_customer_address(&self, address: &str) -> CheckResult {
        if self.customer_addresses.contains(address) {
            CheckResult::ok("customer address is on file")
        } else {
            CheckResult::rejected("customer address is not in the reference set")
        }
    }

    pub fn check_account_number(&self, account_number: &str) -> CheckResult {
        if self.account_numbers.contains(account_number) {
            CheckResult::ok("account number is on file")
        } else {
            CheckResult::rejected("account number is not in the reference set")
        }
    }

    pub fn check_order_number(&self, order_number: &str) -> CheckResult {
        if self.order_numbers.contains(order_number) {
            CheckResult::ok("order number is on file")
        } else {
            CheckResult::rejected("order number is not in the reference set")
        }
    }

    /// Valid iff the date parses with the configured format and lies
    /// strictly in the future. Parse failures are normal results carrying
    /// the parse error text.
    pub fn check_due_date(&self, due_date: &str) -> CheckResult {
        match NaiveDate::parse_from_str(due_date, &self.due_date_format) {
            Ok(date) if date > Local::now().date_naive() => {
                CheckResult::ok("due date lies in the future")
            }
            Ok(_) => CheckResult::rejected("invoice is past due"),
            Err(e) => CheckResult::rejected(format!("invalid date format: {e}")),
        }
    }

    pub fn lookup_postal_code(&self, postal_code: &str) -> CheckResult {
        match self.postal_codes.get(postal_code) {
            Some(city) => CheckResult::ok(format!("postal code {postal_code} belongs to {city}")),
            None => CheckResult::rejected(format!(
                "postal code {postal_code} was not found in the reference set"
            )),
        }
    }
}

fn string_arg_schema(key: &str, description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            key: {
                "type": "string",
                "description": description
            }
        },
        "required": [key]
    })
}

/// Build the tool registry an invoice validation session exposes.
pub fn invoice_registry(data: Arc<ReferenceData>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    let d = Arc::clone(&data);
    registry.register(
        ToolDefinition {
            name: "check_supplier_address".into(),
            description: "Checks whether the supplier address is known.".into(),
            parameters: string_arg_schema("address", "Supplier address from the invoice"),
        },
        Box::new(move |args| {
            let address = require_str(args, "address")?;
            Ok(d.check_supplier_address(address))
        }),
    );

    let d = Arc::clone(&data);
    registry.register(
        ToolDefinition {
            name: "check_customer_address".into(),
            description: "Checks whether the customer address is known.".into(),
            parameters: string_arg_schema("address", "Customer address from the invoice"),
        },
        Box::new(move |args| {
            let address = require_str(args, "address")?;
            Ok(d.check_customer_address(address))
        }),
    );

    let d = Arc::clone(&data);
    registry.register(
        ToolDefinition {
            name: "check_account_number".into(),
            description: "Checks whether the bank account number is known.".into(),
            parameters: string_arg_schema("account_number", "Bank account number from the invoice"),
        },
        Box::new(move |args| {
            let account_number = require_str(args, "account_number")?;
            Ok(d.check_account_number(account_number))
        }),
    );

    let d = Arc::clone(&data);
    registry.register(
        ToolDefinition {
            name: "check_order_number".into(),
            description: "Checks whether the order number is known.".into(),
            parameters: string_arg_schema("order_number", "Order number from the invoice"),
        },
        Box::new(move |args| {
            let order_number = require_str(args, "order_number")?;
            Ok(d.check_order_number(order_number))
        }),
    );

    let d = data;
    registry.register(
        ToolDefinition {
            name: "check_due_date".into(),
            description: "Checks whether the due date is valid and in the future.".into(),
            parameters: string_arg_schema("due_date", "Due date from the invoice, format YYYY-MM-DD"),
        },
        Box::new(move |args| {
            let due_date = require_str(args, "due_date")?;
            Ok(d.check_due_date(due_date))
        }),
    );

    registry
}

/// Build the tool registry a receipt session exposes.
pub fn receipt_registry(data: Arc<ReferenceData>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(
        ToolDefinition {
            name: "lookup_postal_code".into(),
            description: "Looks up the city a postal code belongs to.".into(),
            parameters: string_arg_schema("postal_code", "Postal code, five digits (e.g. '11000')"),
        },
        Box::new(move |args| {
            let postal_code = require_str(args, "postal_code")?;
            Ok(data.lookup_postal_code(postal_code))
        }),
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolCall;
    use serde_json::json;

    fn reference_data() -> ReferenceData {
        ReferenceData::from_config(&ReferenceConfig::default())
    }

    #[test]
    fn supplier_addresses_exhaustive() {
        let data = reference_data();
        for address in [
            "Dodavatel s.r.o., Hlavní 123, Praha 1",
            "ABC Company, Nová 45, Brno",
            "XYZ s.r.o., Dlouhá 78, Ostrava",
        ] {
            assert!(data.check_supplier_address(address).valid, "{address}");
        }
        assert!(!data.check_supplier_address("Unknown Ltd").valid);
        assert!(!data.check_supplier_address("").valid);
    }

    #[test]
    fn customer_addresses_exhaustive() {
        let data = reference_data();
        for address in [
            "Odběratel a.s., Krátká 10, Praha 2",
            "Firma ABC, Zelená 25, Brno",
            "Společnost XYZ, Modrá 5, Ostrava",
        ] {
            assert!(data.check_customer_address(address).valid, "{address}");
        }
        assert!(!data.check_customer_address("Unknown Ltd").valid);
    }

    #[test]
    fn account_numbers_exhaustive() {
        let data = reference_data();
        for account in ["123456789/0100", "987654321/0800", "555666777/2010"] {
            assert!(data.check_account_number(account).valid, "{account}");
        }
        assert!(!data.check_account_number("000000000/0000").valid);
    }

    #[test]
    fn order_numbers_exhaustive() {
        let data = reference_data();
        for order in ["OBJ-2024-001", "OBJ-2024-002", "OBJ-2024-003"] {
            assert!(data.check_order_number(order).valid, "{order}");
        }
        assert!(!data.check_order_number("OBJ-2024-999").valid);
    }

    #[test]
    fn due_date_far_future_is_valid() {
        let result = reference_data().check_due_date("2999-01-01");
        assert!(result.valid);
        assert!(!result.message.is_empty());
    }

    #[test]
    fn due_date_in_past_is_rejected() {
        let result = reference_data().check_due_date("2000-01-01");
        assert!(!result.valid);
        assert!(result.message.contains("past due"));
    }

    #[test]
    fn due_date_unparseable_is_rejected_not_panicking() {
        let result = reference_data().check_due_date("not-a-date");
        assert!(!result.valid);
        assert!(result.message.contains("invalid date format"));

        // Wrong separator, still a normal result
        let result = reference_data().check_due_date("01/02/2999");
        assert!(!result.valid);
    }

    #[test]
    fn postal_code_lookup_names_the_city() {
        let data = reference_data();
        let result = data.lookup_postal_code("60200");
        assert!(result.valid);
        assert!(result.message.contains("Brno"));

        let result = data.lookup_postal_code("99999");
        assert!(!result.valid);
        assert!(result.message.contains("99999"));
    }

    #[test]
    fn invoice_registry_exposes_five_checks() {
        let registry = invoice_registry(Arc::new(reference_data()));
        let names: Vec<_> = registry
            .definitions()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "check_supplier_address",
                "check_customer_address",
                "check_account_number",
                "check_order_number",
                "check_due_date",
            ]
        );
    }

    #[test]
    fn invoice_registry_dispatches_checks() {
        let registry = invoice_registry(Arc::new(reference_data()));
        let call = ToolCall {
            id: "call_1".into(),
            name: "check_order_number".into(),
            arguments: json!({ "order_number": "OBJ-2024-001" }),
        };
        let result = registry.dispatch(&call).unwrap();
        assert!(result.valid);
    }

    #[test]
    fn receipt_registry_exposes_postal_lookup() {
        let registry = receipt_registry(Arc::new(reference_data()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].name, "lookup_postal_code");
    }

    #[test]
    fn tool_schemas_declare_required_string_params() {
        let registry = invoice_registry(Arc::new(reference_data()));
        for definition in registry.definitions() {
            assert_eq!(definition.parameters["type"], "object");
            let required = definition.parameters["required"].as_array().unwrap();
            assert_eq!(required.len(), 1);
        }
    }
}
