//! callgate - inspect a delegate gate configuration
//!
//! Builds an in-memory gate from the layered settings and answers:
//! - which selector a signature maps to
//! - whether a (target, selector) pair would be admitted
//! - who owns the gate and what is allowlisted

use std::str::FromStr;

use anyhow::{bail, Context};
use callgate_core::{DelegateGate, GateOp, STATE_LAYOUT_VERSION};
use callgate_types::{Address, Selector};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::Settings;

/// callgate CLI
#[derive(Parser)]
#[command(name = "callgate")]
#[command(about = "Delegate gate inspection tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CALLGATE_CONFIG")]
    config: Option<String>,

    /// Log level (overrides the configured level)
    #[arg(long, env = "CALLGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "CALLGATE_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the selector of an operation signature, e.g. `increment()`
    Selector { signature: String },

    /// Report whether a call to `target` with the given selector is admitted
    Check {
        target: Address,
        /// Hex selector (`0x12345678`) or signature (`increment()`)
        operation: String,
    },

    /// Print owner, default target and allowlist as JSON
    Status,
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.to_string().into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// A selector given as hex, or derived from a signature.
fn parse_operation(operation: &str) -> anyhow::Result<Selector> {
    if operation.contains('(') {
        return Ok(Selector::from_signature(operation));
    }
    match Selector::from_str(operation) {
        Ok(selector) => Ok(selector),
        Err(e) => bail!("`{operation}` is neither a hex selector nor a signature: {e}"),
    }
}

fn status(gate: &DelegateGate) -> serde_json::Value {
    let allowlist: Vec<_> = gate
        .policy()
        .entries()
        .map(|(target, selector)| json!({ "target": target, "selector": selector }))
        .collect();

    json!({
        "gate": gate.address(),
        "owner": gate.owner(),
        "default_target": gate.default_target(),
        "max_call_depth": gate.config().max_call_depth,
        "layout_version": STATE_LAYOUT_VERSION,
        "allowlist": allowlist,
        "notifications": gate.fabric().len(),
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    init_tracing(level, cli.json || settings.logging.json);
    debug!(config = ?cli.config, entries = settings.allowlist.len(), "Settings loaded");

    match cli.command {
        Commands::Selector { signature } => {
            let selector = Selector::from_signature(&signature);
            if let Some(op) = GateOp::from_selector(selector) {
                info!(op = op.name(), "Selector is handled by the gate itself");
            }
            println!("{selector}  {signature}");
        }
        Commands::Check { target, operation } => {
            let selector = parse_operation(&operation)?;
            let gate = settings.build_gate()?;
            let report = json!({
                "target": target,
                "selector": selector,
                "gate_operation": GateOp::from_selector(selector).map(GateOp::name),
                "allowed": gate.is_allowed(&target, selector),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Status => {
            let gate = settings.build_gate()?;
            println!("{}", serde_json::to_string_pretty(&status(&gate))?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_accepts_hex_and_signatures() {
        assert_eq!(
            parse_operation("0x12345678").unwrap(),
            Selector::from(0x12345678_u32)
        );
        assert_eq!(
            parse_operation("increment()").unwrap(),
            Selector::from_signature("increment()")
        );
        assert!(parse_operation("nonsense").is_err());
    }

    #[test]
    fn status_lists_allowlist() {
        let mut settings = Settings::default();
        settings.allowlist.push(config::AllowlistEntry {
            target: settings.gate.default_target,
            selector: Some(Selector::from(0x12345678_u32)),
            signature: None,
        });
        let gate = settings.build_gate().unwrap();

        let value = status(&gate);
        assert_eq!(value["owner"], json!(settings.gate.owner));
        assert_eq!(value["allowlist"].as_array().unwrap().len(), 1);
        assert_eq!(value["allowlist"][0]["selector"], json!("0x12345678"));
        assert_eq!(value["layout_version"], json!(STATE_LAYOUT_VERSION));
    }

    #[test]
    fn cli_parses_check() {
        let cli = Cli::try_parse_from([
            "callgate",
            "check",
            "0x1111111111111111111111111111111111111111",
            "increment()",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Check { .. }));
    }
}
