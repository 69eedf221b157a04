use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// docuval: classifies and validates business documents with a
/// tool-calling model agent.
#[derive(Parser, Debug)]
#[command(name = "docuval", version, about)]
pub struct Args {
    /// Path to a UTF-8 document to validate. Uses a built-in sample
    /// document when omitted.
    pub document: Option<PathBuf>,

    /// Which built-in sample to use when no document is given.
    #[arg(long, value_enum, default_value_t = Sample::Invoice)]
    pub sample: Sample,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Model override.
    #[arg(long)]
    pub model: Option<String>,

    /// Round budget override.
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Classify the document and exit without running validation.
    #[arg(long)]
    pub classify_only: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Invoice,
    Receipt,
}

pub fn parse() -> Args {
    Args::parse()
}
