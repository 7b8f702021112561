//! Stage driver
//!
//! Runs the stages of one intent in order. Calls inside a stage run
//! concurrently; their step records are appended in issue order. The driver
//! never fails: adapter errors, exhausted budgets and cancellation become
//! error entries on the run.

use super::planner::{PlanContext, StagePlan, StagePlanner, ToolInvocation};
use super::ranking::{rank_campaigns, DEFAULT_TOP_N};
use super::stages::{EngineLimits, Stage, StageTable};
use crate::event_bus::{EventBus, WorkflowEvent};
use crate::intent::IntentRecord;
use crate::run::{ErrorKind, WorkflowRun};
use crate::tracker::StepRecord;
use adpilot_tools::{Campaign, Metric, Payload, ToolRunner};
use chrono::{Datelike, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// What a stage produced
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    /// At least one call succeeded
    Payloads(Vec<Payload>),
    /// Every call failed or the stage was interrupted
    Unavailable,
    /// Nothing to do
    Skipped,
}

impl StageOutput {
    fn label(&self) -> &'static str {
        match self {
            Self::Payloads(_) => "ok",
            Self::Unavailable => "unavailable",
            Self::Skipped => "skipped",
        }
    }
}

/// Outcome of one stage
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Stage
    pub stage: Stage,
    /// Output
    pub output: StageOutput,
    /// Successful calls
    pub ok_calls: usize,
    /// Failed calls
    pub failed_calls: usize,
}

impl StageResult {
    /// Whether the stage holds content worth synthesizing
    #[must_use]
    pub fn is_usable(&self) -> bool {
        match &self.output {
            StageOutput::Payloads(payloads) => payloads.iter().any(Payload::is_usable),
            _ => false,
        }
    }
}

/// Stage results of one run, in execution order
#[derive(Debug, Clone, Default)]
pub struct CollectedPayloads {
    stages: Vec<StageResult>,
}

impl CollectedPayloads {
    /// Append a stage result
    pub fn push(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    /// Stage results
    #[must_use]
    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    /// Payloads produced by a stage
    #[must_use]
    pub fn payloads_for(&self, stage: Stage) -> Vec<&Payload> {
        self.stages
            .iter()
            .filter(|r| r.stage == stage)
            .filter_map(|r| match &r.output {
                StageOutput::Payloads(payloads) => Some(payloads.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Rendered usable payloads of a stage, `None` when there are none
    #[must_use]
    pub fn render_stage(&self, stage: Stage) -> Option<String> {
        let rendered: Vec<String> = self
            .payloads_for(stage)
            .into_iter()
            .filter(|p| p.is_usable())
            .map(Payload::render)
            .collect();
        (!rendered.is_empty()).then(|| rendered.join("\n\n"))
    }

    /// Stages with usable output
    #[must_use]
    pub fn usable_count(&self) -> usize {
        self.stages.iter().filter(|r| r.is_usable()).count()
    }

    /// Stages that ran but produced nothing usable
    #[must_use]
    pub fn degraded_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|r| r.output != StageOutput::Skipped && !r.is_usable())
            .count()
    }

    /// Stages that were not skipped
    #[must_use]
    pub fn attempted_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|r| r.output != StageOutput::Skipped)
            .count()
    }

    /// Whether any stage produced usable output
    #[must_use]
    pub fn has_usable(&self) -> bool {
        self.usable_count() > 0
    }
}

enum StageRun {
    Finished(Vec<adpilot_tools::Result<adpilot_tools::ExecutionResult>>),
    Cancelled,
    DeadlineReached,
}

/// Drives the stage graph for one run at a time
#[derive(Clone)]
pub struct WorkflowEngine {
    runner: ToolRunner,
    table: StageTable,
    limits: EngineLimits,
    planner: StagePlanner,
    events: Option<EventBus>,
    default_top_n: usize,
}

impl WorkflowEngine {
    /// Create an engine with the default stage table and limits
    #[must_use]
    pub fn new(runner: ToolRunner) -> Self {
        Self {
            runner,
            table: StageTable::default(),
            limits: EngineLimits::default(),
            planner: StagePlanner::new(),
            events: None,
            default_top_n: DEFAULT_TOP_N,
        }
    }

    /// Set limits
    #[must_use]
    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the stage table
    #[must_use]
    pub fn with_table(mut self, table: StageTable) -> Self {
        self.table = table;
        self
    }

    /// Publish progress to an event bus
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// List size for ranking intents without "top N"
    #[must_use]
    pub fn with_default_top_n(mut self, top_n: usize) -> Self {
        self.default_top_n = top_n.max(1);
        self
    }

    /// Tool runner
    #[must_use]
    pub fn runner(&self) -> &ToolRunner {
        &self.runner
    }

    /// Limits in effect
    #[must_use]
    pub fn limits(&self) -> EngineLimits {
        self.limits
    }

    /// Stages planned for an intent after applying the stage ceiling.
    ///
    /// Compile is always kept last; excess data stages are dropped.
    #[must_use]
    pub fn stages_for(&self, intent: &IntentRecord) -> (Vec<Stage>, Vec<Stage>) {
        let mut stages: Vec<Stage> = self
            .table
            .stages_for(intent)
            .into_iter()
            .filter(|s| *s != Stage::Compile)
            .collect();
        let keep = self.limits.max_stages.saturating_sub(1);
        let dropped = if stages.len() > keep {
            stages.split_off(keep)
        } else {
            Vec::new()
        };
        (stages, dropped)
    }

    fn publish(&self, event: WorkflowEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    fn record(&self, run: &mut WorkflowRun, step: StepRecord) {
        let (tool, stage, status, duration_ms) = (step.tool, step.stage, step.status, step.duration_ms);
        let sequence = run.record_step(step);
        self.publish(WorkflowEvent::StepRecorded {
            run_id: run.id(),
            sequence,
            tool,
            stage,
            status,
            duration_ms,
        });
    }

    /// Run every data stage of the run's intent (compile excluded).
    #[instrument(skip_all, fields(run_id = %run.id()))]
    pub async fn execute(
        &self,
        run: &mut WorkflowRun,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> CollectedPayloads {
        let mut collected = CollectedPayloads::default();
        let Some(intent) = run.intent().cloned() else {
            warn!("Run has no intent; nothing to collect");
            return collected;
        };

        let (stages, dropped) = self.stages_for(&intent);
        if !dropped.is_empty() {
            let names: Vec<&str> = dropped.iter().map(Stage::as_str).collect();
            run.record_error(
                ErrorKind::RunExhausted,
                None,
                format!("stage limit {} reached; dropped {}", self.limits.max_stages, names.join(", ")),
            );
        }

        let question = run.question().to_string();
        let year = Utc::now().year();

        for stage in stages {
            if cancel.is_cancelled() {
                run.record_error(ErrorKind::Cancelled, Some(stage), "run cancelled");
                break;
            }
            if Instant::now() >= deadline {
                run.record_error(ErrorKind::RunExhausted, Some(stage), "run time budget exhausted");
                break;
            }

            self.publish(WorkflowEvent::StageStarted {
                run_id: run.id(),
                stage,
            });

            let plan = {
                let ctx = PlanContext {
                    question: &question,
                    intent: &intent,
                    collected: &collected,
                    registry: self.runner.registry(),
                    year,
                };
                self.planner.plan(stage, &ctx)
            };

            let (result, interrupted) = match plan {
                StagePlan::Skip { tool, reason } => {
                    debug!(stage = %stage, reason = %reason, "Stage skipped");
                    self.record(run, StepRecord::skipped(tool, stage, reason));
                    (
                        StageResult {
                            stage,
                            output: StageOutput::Skipped,
                            ok_calls: 0,
                            failed_calls: 0,
                        },
                        false,
                    )
                }
                StagePlan::Invoke(invocations) => {
                    self.run_stage(run, stage, &intent, invocations, deadline, cancel)
                        .await
                }
            };

            info!(
                stage = %stage,
                outcome = result.output.label(),
                ok = result.ok_calls,
                failed = result.failed_calls,
                "Stage finished"
            );
            self.publish(WorkflowEvent::StageFinished {
                run_id: run.id(),
                stage,
                outcome: result.output.label(),
            });
            collected.push(result);

            if interrupted {
                break;
            }
        }

        collected
    }

    async fn run_stage(
        &self,
        run: &mut WorkflowRun,
        stage: Stage,
        intent: &IntentRecord,
        mut invocations: Vec<ToolInvocation>,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> (StageResult, bool) {
        if invocations.len() > self.limits.max_calls_per_stage {
            let dropped = invocations.split_off(self.limits.max_calls_per_stage);
            let names: Vec<String> = dropped.iter().map(|i| i.capability.to_string()).collect();
            run.record_error(
                ErrorKind::RunExhausted,
                Some(stage),
                format!(
                    "call limit {} reached; dropped {} call(s): {}",
                    self.limits.max_calls_per_stage,
                    dropped.len(),
                    names.join(", ")
                ),
            );
        }

        let started_at = Utc::now();
        let clock = std::time::Instant::now();
        let calls: Vec<_> = invocations
            .iter()
            .map(|i| (i.capability, i.arguments.clone()))
            .collect();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => StageRun::Cancelled,
            res = tokio::time::timeout_at(deadline, self.runner.execute_parallel(calls)) => match res {
                Ok(results) => StageRun::Finished(results),
                Err(_) => StageRun::DeadlineReached,
            },
        };
        let elapsed_ms = clock.elapsed().as_millis() as u64;

        let results = match outcome {
            StageRun::Finished(results) => results,
            StageRun::Cancelled => {
                let result = self.interrupt(
                    run,
                    stage,
                    invocations,
                    ErrorKind::Cancelled,
                    "run cancelled",
                    started_at,
                    elapsed_ms,
                );
                return (result, true);
            }
            StageRun::DeadlineReached => {
                let result = self.interrupt(
                    run,
                    stage,
                    invocations,
                    ErrorKind::RunExhausted,
                    "run time budget exhausted",
                    started_at,
                    elapsed_ms,
                );
                return (result, true);
            }
        };

        let mut payloads = Vec::new();
        let (mut ok_calls, mut failed_calls) = (0, 0);
        for (invocation, result) in invocations.into_iter().zip(results) {
            let ToolInvocation {
                capability,
                arguments,
            } = invocation;
            let failure = match result {
                Ok(execution) => match (execution.result.success, execution.result.payload) {
                    (true, Some(payload)) => {
                        let step = StepRecord::ok(capability, stage, arguments, payload.summary())
                            .with_timing(started_at, execution.result.duration_ms);
                        self.record(run, step);
                        payloads.push(payload);
                        ok_calls += 1;
                        continue;
                    }
                    _ => (
                        execution
                            .result
                            .error
                            .unwrap_or_else(|| "adapter returned no payload".to_string()),
                        execution.result.duration_ms,
                    ),
                },
                Err(e) => (e.to_string(), elapsed_ms),
            };

            let (message, duration_ms) = failure;
            warn!(stage = %stage, tool = %capability, error = %message, "Tool call failed");
            run.record_error(
                ErrorKind::AdapterUnavailable,
                Some(stage),
                format!("{}: {}", capability, message),
            );
            self.record(
                run,
                StepRecord::error(capability, stage, arguments, message).with_timing(started_at, duration_ms),
            );
            failed_calls += 1;
        }

        let output = if ok_calls == 0 {
            StageOutput::Unavailable
        } else {
            if stage == Stage::FetchData && intent.ranks_campaigns() {
                payloads = self.rank_fetched(intent, payloads);
            }
            StageOutput::Payloads(payloads)
        };

        (
            StageResult {
                stage,
                output,
                ok_calls,
                failed_calls,
            },
            false,
        )
    }

    /// Record in-flight calls of an interrupted stage as errors
    #[allow(clippy::too_many_arguments)]
    fn interrupt(
        &self,
        run: &mut WorkflowRun,
        stage: Stage,
        invocations: Vec<ToolInvocation>,
        kind: ErrorKind,
        reason: &str,
        started_at: chrono::DateTime<Utc>,
        elapsed_ms: u64,
    ) -> StageResult {
        warn!(stage = %stage, reason, "Stage interrupted");
        let failed_calls = invocations.len();
        for invocation in invocations {
            let step = StepRecord::error(invocation.capability, stage, invocation.arguments, reason)
                .with_timing(started_at, elapsed_ms);
            self.record(run, step);
        }
        run.record_error(kind, Some(stage), format!("{} during {}", reason, stage));
        StageResult {
            stage,
            output: StageOutput::Unavailable,
            ok_calls: 0,
            failed_calls,
        }
    }

    /// Merge fetched campaign lists into one ranked list
    fn rank_fetched(&self, intent: &IntentRecord, payloads: Vec<Payload>) -> Vec<Payload> {
        let mut campaigns: Vec<Campaign> = Vec::new();
        let mut others = Vec::new();
        for payload in payloads {
            match payload {
                Payload::Campaigns(list) => campaigns.extend(list),
                other => others.push(other),
            }
        }
        let entities = &intent.entities;
        let ranked = rank_campaigns(
            campaigns,
            entities.ranking_metric.unwrap_or(Metric::Roas),
            entities.top_n.unwrap_or(self.default_top_n),
            entities.worst_first,
        );
        let mut merged = vec![Payload::Campaigns(ranked)];
        merged.extend(others);
        merged
    }
}
