//! webauto - CLI entry point
//!
//! Providers, the AI oracle, and persistent storage are host responsibilities
//! (spec §1); this binary only exercises the host-independent parts of the
//! core: goal-hint extraction, plan/task schema validation, configuration
//! inspection, and event-history replay.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use webauto::ai::GeneratedPlan;
use webauto::cli::{Cli, Command, OutputFormat};
use webauto::config::Config;
use webauto::events::TimestampedEvent;
use webauto::goal::GoalParser;
use webauto::task::Task;

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let level = match cli_log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("WARN") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some("INFO") | None => tracing::Level::INFO,
        Some(other) => {
            eprintln!("Unknown log level `{other}`, defaulting to INFO");
            tracing::Level::INFO
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!(?level, "setup_logging: initialized");
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        None => Ok(Config::default()),
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("failed to parse config file {}", path.display()))
        }
    }
}

fn run_hints(goal: &str, format: &OutputFormat) -> Result<()> {
    let hints = GoalParser::extract(goal);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&hints)?),
        OutputFormat::Text => {
            println!("urls: {:?}", hints.urls);
            println!("quoted terms: {:?}", hints.quoted_terms);
            println!("action hints: {:?}", hints.action_hints);
        }
    }
    Ok(())
}

fn run_validate_plan(path: &PathBuf) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read plan file {}", path.display()))?;
    let plan: GeneratedPlan = serde_json::from_str(&raw).with_context(|| format!("failed to parse plan file {}", path.display()))?;
    match plan.validate() {
        Ok(()) => {
            println!("OK: plan has {} step(s) and is schema-valid", plan.steps.len());
            Ok(())
        }
        Err(e) => Err(eyre::eyre!("plan is invalid: {e}")),
    }
}

fn run_validate_task(path: &PathBuf) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read task file {}", path.display()))?;
    let task: Task = serde_json::from_str(&raw).with_context(|| format!("failed to parse task file {}", path.display()))?;

    let mut violations = Vec::new();
    for step in task.steps() {
        if !step.check_terminal_invariant() {
            violations.push(step.id.clone());
        }
    }

    if violations.is_empty() {
        println!("OK: task `{}` has {} step(s), all invariant-consistent", task.id, task.steps().len());
        Ok(())
    } else {
        Err(eyre::eyre!("task has invariant violations on step(s): {}", violations.join(", ")))
    }
}

fn run_show_config(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn run_replay_events(path: &PathBuf) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read event history file {}", path.display()))?;
    let events: Vec<TimestampedEvent> = serde_json::from_str(&raw).with_context(|| format!("failed to parse event history file {}", path.display()))?;

    println!("replaying {} event(s)", events.len());
    for entry in &events {
        println!("[{}] #{} {} task={}", entry.timestamp, entry.id, entry.event.event_type(), entry.event.task_id());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref()).context("failed to set up logging")?;

    let config = load_config(cli.config.as_ref()).context("failed to load configuration")?;
    debug!(command = ?cli.command, "main: dispatching command");

    match cli.command {
        Some(Command::Hints { goal, format }) => run_hints(&goal, &format),
        Some(Command::ValidatePlan { path }) => run_validate_plan(&path),
        Some(Command::ValidateTask { path }) => run_validate_task(&path),
        Some(Command::ShowConfig) => run_show_config(&config),
        Some(Command::ReplayEvents { path }) => run_replay_events(&path),
        None => {
            println!("webauto: no command given. Run `webauto --help` for usage.");
            Ok(())
        }
    }
}
