//! Adpilot - campaign assistant for Facebook and Instagram advertising
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "adpilot=info,adpilot_core=info,adpilot_tools=warn,adpilot_llm=warn".into()
    });
    let json_logs = std::env::var("ADPILOT_LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json"));

    // logs go to stderr so `ask --json` output stays parseable
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let cli = cli::Cli::parse();
    cli::run(cli).await
}
