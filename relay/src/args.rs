use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use relay_config::{ChatMode, ProviderName};
use relay_llm::{ReasoningEffort, ReasoningSelection};
use relay_telemetry::LogFormat;

/// Relay streaming-completion client
#[derive(Debug, Parser)]
#[command(name = "relay", about = "Stream completions from any configured LLM provider")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Log filter, overridden by `RUST_LOG`
    #[arg(long, default_value = "warn")]
    pub log: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one chat message and stream the answer
    Chat {
        /// Provider identifier (e.g. `anthropic`, `openAI`, `ollama`)
        #[arg(short, long)]
        provider: ProviderName,

        /// Model name; the provider's `default_model` when omitted
        #[arg(short, long, default_value = "")]
        model: String,

        /// System message
        #[arg(short, long)]
        system: Option<String>,

        /// Interaction mode, which selects the enabled tools
        #[arg(long, default_value = "normal")]
        mode: ChatMode,

        /// Reasoning: `off`, `low`, `medium`, `high` or a token budget
        #[arg(short, long, default_value = "off", value_parser = parse_reasoning)]
        reasoning: ReasoningSelection,

        /// The user message
        message: String,
    },
    /// Complete the text between a prefix and a suffix
    Fim {
        #[arg(short, long)]
        provider: ProviderName,

        #[arg(short, long, default_value = "")]
        model: String,

        /// Text before the cursor
        #[arg(long)]
        prefix: String,

        /// Text after the cursor
        #[arg(long, default_value = "")]
        suffix: String,

        /// Stop sequence, repeatable
        #[arg(long)]
        stop: Vec<String>,
    },
    /// List the models a provider serves
    Models {
        #[arg(short, long)]
        provider: ProviderName,
    },
}

fn parse_reasoning(raw: &str) -> Result<ReasoningSelection, String> {
    if raw.eq_ignore_ascii_case("off") {
        return Ok(ReasoningSelection::Off);
    }
    if let Ok(budget) = raw.parse::<u32>() {
        return Ok(ReasoningSelection::Budget(budget));
    }
    ReasoningEffort::from_str(&raw.to_lowercase())
        .map(ReasoningSelection::Effort)
        .map_err(|_| format!("expected off, low, medium, high or a token budget, got '{raw}'"))
}
