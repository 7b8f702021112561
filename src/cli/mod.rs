//! CLI module for Adpilot
//!
//! Provides commands:
//! - `ask`: answer one marketing question
//! - `tools`: list the tools available in this environment
//! - `check`: configuration and environment diagnostics

use clap::{Parser, Subcommand};

pub mod ask;
pub mod check;
pub mod tools;

/// Adpilot campaign assistant CLI
#[derive(Parser, Debug)]
#[command(name = "adpilot")]
#[command(about = "Marketing assistant for Facebook and Instagram campaigns")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question about your campaigns
    Ask {
        /// The question, e.g. "Show me the top 10 campaigns by ROAS"
        question: String,
        /// Print the full workflow result as JSON
        #[arg(long)]
        json: bool,
        /// Restrict to one platform (facebook, instagram)
        #[arg(long)]
        platform: Option<String>,
        /// Number of campaigns to list
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List available tools
    Tools,
    /// Check configuration and credentials
    Check,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Ask {
            question,
            json,
            platform,
            limit,
        }) => ask::run(&question, json, platform, limit).await,
        Some(Commands::Tools) => tools::run().await,
        Some(Commands::Check) => check::run().await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
