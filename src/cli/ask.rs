//! `adpilot ask`

use crate::app;
use adpilot_core::{
    format_error_for_cli, EventBus, RunContext, RunStatus, StepStatus, WorkflowEvent, WorkflowResult,
};
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(
    question: &str,
    json: bool,
    platform: Option<String>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let config = app::load_config()?;
    app::validation::warn_optional(&config);

    let bus = Arc::new(EventBus::default());
    let orchestrator = match app::build_orchestrator(&config) {
        Ok(orchestrator) => orchestrator.with_event_bus(bus.clone()),
        Err(e) => {
            match e.downcast_ref::<adpilot_core::Error>() {
                Some(core) => eprint!("{}", format_error_for_cli(core)),
                None => eprintln!("{:#}", e),
            }
            std::process::exit(1);
        }
    };

    let mut context = RunContext::new();
    if let Some(platform) = platform {
        context = context.with("platform", platform);
    }
    if let Some(limit) = limit {
        context = context.with("limit", limit.to_string());
    }

    if !json {
        spawn_progress(&bus);
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling...");
                cancel.cancel();
            }
        });
    }

    let result = orchestrator
        .run_with_cancel(question, Some(context), cancel)
        .await;

    if json {
        let rendered = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{}", rendered);
    } else {
        print_result(&result);
    }

    if result.status == RunStatus::Failed {
        std::process::exit(2);
    }
    Ok(())
}

/// Stage progress on stderr
fn spawn_progress(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                WorkflowEvent::Classified {
                    category,
                    confidence,
                    ..
                } => eprintln!("🧭 {} ({:.0}%)", category, confidence * 100.0),
                WorkflowEvent::StageStarted { stage, .. } => eprintln!("▶ {}", stage),
                WorkflowEvent::StepRecorded {
                    tool,
                    status: StepStatus::Error,
                    ..
                } => eprintln!("  ⚠️  {} failed", tool),
                WorkflowEvent::RunFinished { .. } => break,
                _ => {}
            }
        }
    });
}

fn print_result(result: &WorkflowResult) {
    println!("\n{}", result.final_output);
    if !result.errors.is_empty() {
        eprintln!("\n{} issue(s) during this run:", result.errors.len());
        for error in &result.errors {
            eprintln!("  - {}", error);
        }
    }
}
