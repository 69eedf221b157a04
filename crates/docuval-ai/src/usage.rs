//! Token usage accounting across decision rounds.

use std::collections::HashMap;

use crate::TokenUsage;

/// Cumulative token usage per model, plus the number of decision calls.
#[derive(Debug, Default)]
pub struct UsageLedger {
    total: TokenUsage,
    by_model: HashMap<String, TokenUsage>,
    call_count: u64,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the usage of one decision call.
    pub fn record(&mut self, model: &str, usage: TokenUsage) {
        self.total.input_tokens += usage.input_tokens;
        self.total.output_tokens += usage.output_tokens;
        self.call_count += 1;

        let entry = self.by_model.entry(model.to_string()).or_default();
        entry.input_tokens += usage.input_tokens;
        entry.output_tokens += usage.output_tokens;
    }

    /// Fold another ledger into this one (e.g. classification + session).
    pub fn merge(&mut self, other: &UsageLedger) {
        self.total.input_tokens += other.total.input_tokens;
        self.total.output_tokens += other.total.output_tokens;
        self.call_count += other.call_count;
        for (model, usage) in &other.by_model {
            let entry = self.by_model.entry(model.clone()).or_default();
            entry.input_tokens += usage.input_tokens;
            entry.output_tokens += usage.output_tokens;
        }
    }

    pub fn total(&self) -> TokenUsage {
        self.total
    }

    pub fn for_model(&self, model: &str) -> Option<TokenUsage> {
        self.by_model.get(model).copied()
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }
}
