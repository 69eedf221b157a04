mod cli;
mod sample;

use std::process::ExitCode;
use std::sync::Arc;

use docuval_ai::{
    DocumentWorkflow, OpenAiClient, OpenAiConfig, ReferenceData, SessionOutcome, WorkflowOutcome,
};
use docuval_common::DocuvalError;
use docuval_config::DocuvalConfig;
use tracing_subscriber::EnvFilter;

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    // Try common locations for .env relative to the workspace
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        // Workspace root, two levels up from crates/docuval-app/
        manifest_dir.join("..").join("..").join(".env"),
        // Current directory
        std::path::PathBuf::from(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

fn load_document(args: &cli::Args) -> Result<String, DocuvalError> {
    match &args.document {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(match args.sample {
            cli::Sample::Invoice => sample::SAMPLE_INVOICE,
            cli::Sample::Receipt => sample::SAMPLE_RECEIPT,
        }
        .to_string()),
    }
}

fn report(outcome: &WorkflowOutcome) -> ExitCode {
    println!("document kind: {}", outcome.kind);

    let code = match &outcome.outcome {
        Some(SessionOutcome::Completed { answer, rounds }) => {
            println!("\n{answer}\n");
            tracing::info!(rounds, "validation completed");
            ExitCode::SUCCESS
        }
        Some(SessionOutcome::BudgetExhausted { rounds }) => {
            println!("\nno conclusion reached within {rounds} rounds\n");
            ExitCode::from(2)
        }
        None => {
            println!("\nunsupported document type; nothing to validate\n");
            ExitCode::SUCCESS
        }
    };

    let usage = outcome.ledger.total();
    tracing::info!(
        calls = outcome.ledger.call_count(),
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        "token usage"
    );
    code
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file before anything else
    load_dotenv();

    // Parse CLI arguments
    let args = cli::parse();

    // Load config first so it can supply the log level
    let config = match &args.config {
        Some(path) => docuval_config::load_from_path(path),
        None => docuval_config::load_config(),
    }
    .unwrap_or_else(|e| {
        eprintln!("config load failed, using defaults: {e}");
        DocuvalConfig::default()
    });

    // Initialize logging
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                format!("docuval={level}")
                    .parse()
                    .unwrap_or_else(|_| "docuval=info".parse().unwrap()),
            ),
        )
        .init();

    tracing::info!("docuval v{} starting", env!("CARGO_PKG_VERSION"));

    // Read the document to process
    let document = match load_document(&args) {
        Ok(document) => document,
        Err(e) => {
            tracing::error!("failed to read document: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Apply CLI overrides on top of the config
    let model = args.model.clone().unwrap_or_else(|| config.agent.model.clone());
    let max_rounds = args.max_rounds.unwrap_or(config.agent.max_rounds);

    let mut client_config = match OpenAiConfig::from_env() {
        Ok(client_config) => client_config,
        Err(e) => {
            tracing::error!("cannot reach the decision-maker: {e}");
            return ExitCode::FAILURE;
        }
    };
    client_config = client_config
        .with_model(model.clone())
        .with_max_tokens(config.agent.max_tokens)
        .with_temperature(config.agent.temperature);
    if let Some(base_url) = config.agent.base_url.clone() {
        client_config = client_config.with_base_url(base_url);
    }

    let client = Arc::new(OpenAiClient::new(client_config));
    let data = Arc::new(ReferenceData::from_config(&config.reference));
    let workflow = DocumentWorkflow::new(client, data)
        .with_max_rounds(max_rounds)
        .with_model(model);

    if args.classify_only {
        return match workflow.classify(&document).await {
            Ok((kind, _ledger)) => {
                println!("document kind: {kind}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("classification failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match workflow.run(&document).await {
        Ok(outcome) => report(&outcome),
        Err(e) => {
            tracing::error!("workflow failed: {e}");
            ExitCode::FAILURE
        }
    }
}
