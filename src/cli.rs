//! CLI command definitions and subcommands
//!
//! Provider implementations, the AI oracle, and persistent storage are
//! deliberately out of scope for this crate (spec §1) — they are named
//! interfaces a host application supplies. The CLI surface here is
//! correspondingly a diagnostics/utility shell around the parts of the core
//! that don't need a host's collaborators wired in: goal parsing, plan/task
//! schema validation, and configuration inspection.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

/// webauto - a deterministic, headless web-automation execution engine
#[derive(Parser)]
#[command(name = "webauto", about = "Deterministic, headless web-automation execution engine", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true, help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract natural-language hints (URLs, quoted terms, action keywords) from a goal string
    Hints {
        /// The goal string to parse
        goal: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a serialized AI-oracle plan (a `GeneratedPlan` JSON document) against the closed action-kind set
    ValidatePlan {
        /// Path to the plan JSON file
        path: PathBuf,
    },

    /// Validate a serialized Task document for schema and status-machine soundness
    ValidateTask {
        /// Path to the task JSON file
        path: PathBuf,
    },

    /// Print the effective configuration (defaults merged with an optional file) as JSON
    ShowConfig,

    /// Print the events retained in a saved event-bus history snapshot
    ReplayEvents {
        /// Path to a JSON array of `TimestampedEvent` records
        path: PathBuf,
    },
}

/// Output format for the `hints` command
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: text or json")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
