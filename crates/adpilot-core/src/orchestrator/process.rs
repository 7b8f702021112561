//! Per-run driver
//!
//! Classify, collect, synthesize. Every failure along the way becomes an
//! [`ErrorEntry`](crate::run::ErrorEntry); nothing escapes `run_workflow`.

use super::core::Orchestrator;
use super::types::{RunContext, RunStatus, WorkflowResult};
use crate::engine::{CollectedPayloads, Stage};
use crate::event_bus::WorkflowEvent;
use crate::grader::{Grading, GROUNDING_CAVEAT};
use crate::intent::{Classification, IntentRecord, IntentSource};
use crate::run::{ErrorKind, RunState, WorkflowRun};
use crate::tracker::StepRecord;
use crate::synthesizer::Synthesis;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

impl Orchestrator {
    /// Answer one question.
    ///
    /// Always returns a result; `status` is `failed` only when no stage,
    /// answer generation included, produced usable output.
    pub async fn run_workflow(&self, question: &str, context: Option<RunContext>) -> WorkflowResult {
        self.run_with_cancel(question, context, CancellationToken::new())
            .await
    }

    /// Answer one question, stopping early when `cancel` fires.
    ///
    /// The token is also registered under the run id so [`Orchestrator::cancel`]
    /// reaches it.
    pub async fn run_with_cancel(
        &self,
        question: &str,
        context: Option<RunContext>,
        cancel: CancellationToken,
    ) -> WorkflowResult {
        let run = WorkflowRun::new(question);
        let run_id = run.id();
        self.active_runs.insert(run_id, cancel.clone());

        let result = self.drive(run, context.unwrap_or_default(), &cancel).await;

        self.active_runs.remove(&run_id);
        if let Some(run_log) = &self.run_log {
            if let Err(e) = run_log.append(&result).await {
                warn!(run_id = %run_id, error = %e, "Failed to append run log");
            }
        }
        self.emit(WorkflowEvent::RunFinished {
            run_id,
            status: result.status,
            elapsed_ms: result.summary.elapsed_ms,
        });
        result
    }

    #[instrument(skip_all, fields(run_id = %run.id()))]
    async fn drive(&self, mut run: WorkflowRun, context: RunContext, cancel: &CancellationToken) -> WorkflowResult {
        let deadline = Instant::now() + self.config.max_run;
        info!(question_chars = run.question().chars().count(), "Workflow started");
        self.emit(WorkflowEvent::RunStarted {
            run_id: run.id(),
            question_chars: run.question().chars().count(),
        });

        transition(&mut run, RunState::Classifying);
        let intent = self.classify(&mut run, deadline, cancel).await;
        let intent = context.apply(intent);
        self.emit(WorkflowEvent::Classified {
            run_id: run.id(),
            category: intent.category,
            confidence: intent.confidence,
            degraded: run.has_error(ErrorKind::ClassificationDegraded),
        });
        info!(
            category = %intent.category,
            confidence = intent.confidence,
            source = ?intent.source,
            "Intent classified"
        );
        if let Err(e) = run.set_intent(intent.clone()) {
            warn!(error = %e, "Intent not recorded");
        }

        transition(&mut run, RunState::Collecting);
        let collected = self.engine.execute(&mut run, deadline, cancel).await;

        transition(&mut run, RunState::Synthesizing);
        let synthesis = if cancel.is_cancelled() {
            self.synthesizer.template(&collected, "run cancelled")
        } else {
            let limit = self.synthesis_limit(deadline);
            let compiled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                synthesis = self.synthesizer.compile(run.question(), &intent, &collected, limit) => Some(synthesis),
            };
            match compiled {
                Some(synthesis) => synthesis,
                None => {
                    run.record_error(ErrorKind::Cancelled, None, "run cancelled during answer generation");
                    self.synthesizer.template(&collected, "run cancelled")
                }
            }
        };

        let grading = self
            .check_grounding(&run, &intent, &collected, &synthesis, deadline, cancel)
            .await;
        self.finish(run, synthesis, grading, cancel.is_cancelled())
    }

    /// Grade a generated answer when enabled and the compile stage has a call
    /// and some of the run budget left.
    async fn check_grounding(
        &self,
        run: &WorkflowRun,
        intent: &IntentRecord,
        collected: &CollectedPayloads,
        synthesis: &Synthesis,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Option<Grading> {
        if !self.config.grounding_check || !synthesis.generated || cancel.is_cancelled() {
            return None;
        }
        let answer = synthesis.answer.as_deref()?;
        if self.config.limits.max_calls_per_stage < 2 {
            debug!("Compile stage has no call left for the grounding check");
            return None;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!("Run budget spent, grounding check skipped");
            return None;
        }

        let evidence = self.synthesizer.evidence(intent, collected);
        let limit = self.config.generation_timeout.min(remaining);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            grading = self.grader.grade(run.question(), answer, &evidence, limit) => Some(grading),
        }
    }

    async fn classify(
        &self,
        run: &mut WorkflowRun,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> IntentRecord {
        let limit = self
            .config
            .classifier_timeout
            .min(deadline.saturating_duration_since(Instant::now()));

        let classification = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            classification = self.classifier.classify_within(run.question(), limit) => Some(classification),
        };

        match classification {
            Some(Classification { intent, degraded }) => {
                if let Some(reason) = degraded {
                    run.record_error(ErrorKind::ClassificationDegraded, None, reason);
                }
                intent
            }
            None => {
                run.record_error(ErrorKind::Cancelled, None, "run cancelled during classification");
                let keyword = self.classifier.triggers().classify(run.question());
                IntentRecord::new(
                    keyword.resolved_category(),
                    keyword.confidence,
                    keyword.entities,
                    IntentSource::Keyword,
                )
            }
        }
    }

    /// Generation gets what is left of the budget, but never less than the grace period.
    fn synthesis_limit(&self, deadline: Instant) -> Duration {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.config
            .generation_timeout
            .min(remaining.max(self.config.synthesis_grace))
    }

    fn finish(
        &self,
        mut run: WorkflowRun,
        synthesis: Synthesis,
        grading: Option<Grading>,
        cancelled: bool,
    ) -> WorkflowResult {
        let Synthesis {
            mut answer,
            generated,
            failure,
            step,
        } = synthesis;

        let stage = step.stage;
        self.record(&mut run, step);

        if let Some(reason) = &failure {
            if !cancelled {
                run.record_error(ErrorKind::SynthesisUnavailable, Some(stage), reason.clone());
            }
        }

        if let Some(Grading { verdict, step }) = grading {
            self.record(&mut run, step);
            if let Some(verdict) = verdict {
                if !verdict.grounded {
                    warn!(reason = ?verdict.reason, "Answer has unsupported claims");
                    run.record_error(
                        ErrorKind::UnsupportedClaims,
                        Some(Stage::Compile),
                        verdict
                            .reason
                            .clone()
                            .unwrap_or_else(|| "answer not backed by the collected data".to_string()),
                    );
                    answer = answer.map(|text| format!("{}\n\n{}", text, GROUNDING_CAVEAT));
                }
                run.set_grounding(verdict);
            }
        }

        let summary = run.steps().summary(run.started_at());
        let final_output = match answer {
            Some(answer) => {
                let text = format!(
                    "{}\n\n---\n{}/{} tool calls succeeded · {:.1}s",
                    answer,
                    summary.ok_count,
                    summary.issued(),
                    summary.elapsed_ms as f64 / 1000.0
                );
                match run.complete(text.clone()) {
                    Ok(()) => text,
                    Err(e) => {
                        warn!(error = %e, "Could not complete run");
                        transition(&mut run, RunState::Failed);
                        text
                    }
                }
            }
            None => {
                transition(&mut run, RunState::Failed);
                format!(
                    "Unable to answer: no data could be collected and the answer could not be generated ({}).",
                    failure.as_deref().unwrap_or("no usable output")
                )
            }
        };

        let result = WorkflowResult::from_run(&run, final_output);
        match result.status {
            RunStatus::Completed => info!(
                generated,
                ok = summary.ok_count,
                issued = summary.issued(),
                elapsed_ms = summary.elapsed_ms,
                "Workflow completed"
            ),
            RunStatus::Failed => warn!(errors = result.errors.len(), "Workflow failed"),
        }
        result
    }

    fn record(&self, run: &mut WorkflowRun, step: StepRecord) {
        let (tool, stage, status, duration_ms) = (step.tool, step.stage, step.status, step.duration_ms);
        let sequence = run.record_step(step);
        self.emit(WorkflowEvent::StepRecorded {
            run_id: run.id(),
            sequence,
            tool,
            stage,
            status,
            duration_ms,
        });
    }
}

fn transition(run: &mut WorkflowRun, next: RunState) {
    if let Err(e) = run.advance(next) {
        debug!(error = %e, "Ignored state transition");
    }
}
