//! Orchestrator tests

#[cfg(test)]
mod tests {
    use super::super::config::OrchestratorConfig;
    use super::super::core::Orchestrator;
    use super::super::types::{RunContext, RunStatus, WorkflowResult};
    use crate::engine::{EngineLimits, Stage};
    use crate::event_bus::{EventBus, WorkflowEvent};
    use crate::intent::{Entities, IntentCategory, IntentRecord, IntentSource, MutationAction};
    use crate::run::{ErrorKind, RunState, WorkflowRun};
    use crate::run_log::{JsonlRunLog, RunLog};
    use crate::tracker::StepRecord;
    use crate::Error;
    use adpilot_llm::MockProvider;
    use adpilot_tools::{
        register_builtins, BuiltinsConfig, Campaign, Capability, Comparison, MemoryStore, Metric,
        MetricThreshold, Platform, ToolRegistry, ToolRunner,
    };
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn llm() -> MockProvider {
        MockProvider::new().with_responder(|req| {
            let system = req.system_prompt().unwrap_or_default();
            if system.contains("intent classifier") {
                Ok(r#"{"category": "informational_ranking", "confidence": 0.9}"#.to_string())
            } else {
                Ok(format!("Answer based on:\n{}", req.user_prompt().unwrap_or_default()))
            }
        })
    }

    fn runner() -> ToolRunner {
        let store = Arc::new(MemoryStore::with_campaigns(vec![
            Campaign::new("fb_spring", "Spring", Platform::Facebook)
                .with_performance(100.0, 5000, 150, 12, 480.0),
            Campaign::new("ig_reels", "Reels", Platform::Instagram)
                .with_performance(100.0, 5000, 90, 6, 260.0),
        ]));
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, &BuiltinsConfig::new(store).with_encyclopedia(false)).unwrap();
        ToolRunner::with_defaults(Arc::new(registry))
    }

    fn orchestrator(llm: MockProvider) -> Orchestrator {
        Orchestrator::new(Arc::new(llm), runner(), OrchestratorConfig::default()).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = OrchestratorConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_run, Duration::from_secs(120));
        assert_eq!(config.limits.max_calls(), 18);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cases = [
            (OrchestratorConfig::new().with_max_run(Duration::ZERO), "max_run"),
            (
                OrchestratorConfig::new().with_limits(EngineLimits {
                    max_stages: 7,
                    max_calls_per_stage: 3,
                }),
                "max_stages",
            ),
            (
                OrchestratorConfig::new().with_limits(EngineLimits {
                    max_stages: 6,
                    max_calls_per_stage: 0,
                }),
                "max_calls_per_stage",
            ),
            (OrchestratorConfig::new().with_excerpt_chars(0), "excerpt_chars"),
            (OrchestratorConfig::new().with_synthesis_temperature(3.5), "synthesis_temperature"),
            (OrchestratorConfig::new().with_default_top_n(0), "default_top_n"),
        ];
        for (config, expected) in cases {
            match config.validate() {
                Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {} to be rejected, got {:?}", expected, other),
            }
        }

        let err = Orchestrator::new(
            Arc::new(MockProvider::new()),
            runner(),
            OrchestratorConfig::new().with_max_run(Duration::ZERO),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_run_context_overrides() {
        let context = RunContext::new().with("platform", "IG").with("limit", "3");
        assert_eq!(context.platform(), Some(Platform::Instagram));
        assert_eq!(context.limit(), Some(3));

        let intent = IntentRecord::new(
            IntentCategory::InformationalRanking,
            0.7,
            Entities::default(),
            IntentSource::Keyword,
        );
        let applied = context.apply(intent);
        assert_eq!(applied.entities.platforms, vec![Platform::Instagram]);
        assert_eq!(applied.entities.top_n, Some(3));
        assert_eq!(applied.confidence, 0.7);

        let pause = IntentRecord::new(
            IntentCategory::ActionMutation,
            0.7,
            Entities {
                action: Some(MutationAction::Pause),
                thresholds: vec![MetricThreshold::new(Metric::Ctr, Comparison::Below, 2.0)],
                ..Default::default()
            },
            IntentSource::Keyword,
        );
        let applied = context.apply(pause);
        assert_eq!(applied.entities.top_n, None);
        assert!(!applied.ranks_campaigns());

        let ignored: RunContext = HashMap::from([
            ("platform".to_string(), "tiktok".to_string()),
            ("limit".to_string(), "0".to_string()),
        ])
        .into();
        assert_eq!(ignored.platform(), None);
        assert_eq!(ignored.limit(), None);
    }

    #[test]
    fn test_result_snapshot() {
        let mut run = WorkflowRun::new("q");
        let empty = WorkflowResult::from_run(&run, "nothing");
        assert_eq!(empty.current_step, "created");
        assert_eq!(empty.status, RunStatus::Failed);

        run.record_step(StepRecord::skipped(Capability::UpdateCampaign, Stage::Mutate, "no action"));
        run.advance(RunState::Failed).unwrap();
        let result = WorkflowResult::from_run(&run, "nothing");
        assert_eq!(result.current_step, "mutate");
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].error.as_deref(), Some("no action"));
        assert_eq!(
            serde_json::to_value(result.status).unwrap(),
            serde_json::json!("failed")
        );
    }

    #[tokio::test]
    async fn test_run_appends_to_log_and_clears_active_runs() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(JsonlRunLog::new(dir.path().join("runs/log.jsonl")));
        let orchestrator = orchestrator(llm()).with_run_log(log.clone());

        let first = orchestrator.run_workflow("Show me the top 5 campaigns", None).await;
        let second = orchestrator.run_workflow("Show me the top 5 campaigns", None).await;
        assert_eq!(first.status, RunStatus::Completed);
        assert_eq!(orchestrator.active_run_count(), 0);

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let decoded: WorkflowResult = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(decoded.workflow_id, second.workflow_id);
    }

    #[tokio::test]
    async fn test_jsonl_log_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let log = JsonlRunLog::new(blocker.join("log.jsonl"));

        let run = WorkflowRun::new("q");
        let err = log.append(&WorkflowResult::from_run(&run, "x")).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn test_footer_and_events() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let orchestrator = orchestrator(llm()).with_event_bus(bus);

        let result = orchestrator.run_workflow("Show me the top 5 campaigns", None).await;
        assert!(result.is_completed());
        assert!(result.final_output.contains("tool calls succeeded"));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(WorkflowEvent::RunStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(WorkflowEvent::RunFinished {
                status: RunStatus::Completed,
                ..
            })
        ));
        assert!(events.iter().all(|e| e.run_id() == result.workflow_id));
        assert!(events
            .iter()
            .any(|e| matches!(e, WorkflowEvent::Classified { category: IntentCategory::InformationalRanking, .. })));
    }

    #[tokio::test]
    async fn test_cancel_unknown_run() {
        let orchestrator = orchestrator(llm());
        assert!(!orchestrator.cancel(uuid::Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_uses_template() {
        let orchestrator = orchestrator(llm());
        let token = CancellationToken::new();
        token.cancel();

        let result = orchestrator
            .run_with_cancel("Show me the top 5 campaigns", None, token)
            .await;

        assert!(result.errors.iter().any(|e| e.contains("cancelled")));
        assert!(result
            .tool_calls
            .iter()
            .all(|c| c.tool == Capability::ComposeAnswer));
        // nothing was collected, so the template has nothing to list
        assert_eq!(result.status, RunStatus::Failed);
        assert!(!result.errors.is_empty());
        assert_eq!(orchestrator.active_run_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_by_id_mid_run() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let slow = llm().with_delay(Duration::from_secs(30));
        let orchestrator = Arc::new(orchestrator(slow).with_event_bus(bus));

        let handle = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .run_workflow("Show me the top 5 campaigns", None)
                    .await
            })
        };

        let run_id = match rx.recv().await.unwrap() {
            WorkflowEvent::RunStarted { run_id, .. } => run_id,
            other => panic!("unexpected first event: {:?}", other),
        };
        assert!(orchestrator.cancel(run_id));

        let result = handle.await.unwrap();
        assert_eq!(result.workflow_id, run_id);
        assert!(result.errors.iter().any(|e| e.starts_with("[cancelled]")));
        assert!(!result
            .errors
            .iter()
            .any(|e| e.starts_with(&format!("[{}]", ErrorKind::SynthesisUnavailable.as_str()))));
    }

    fn grading_llm(verdict: Option<&'static str>) -> MockProvider {
        MockProvider::new().with_responder(move |req| {
            let system = req.system_prompt().unwrap_or_default();
            if system.contains("intent classifier") {
                Ok(r#"{"category": "informational_ranking", "confidence": 0.9}"#.to_string())
            } else if system.contains("You check answers") {
                verdict
                    .map(str::to_string)
                    .ok_or_else(|| adpilot_llm::Error::Network("grader offline".to_string()))
            } else {
                Ok("[fb_spring] leads with a 9% CTR.".to_string())
            }
        })
    }

    fn grading_orchestrator(llm: MockProvider, limits: EngineLimits) -> Orchestrator {
        let config = OrchestratorConfig::new()
            .with_grounding_check(true)
            .with_limits(limits);
        Orchestrator::new(Arc::new(llm), runner(), config).unwrap()
    }

    fn compile_calls(result: &WorkflowResult) -> usize {
        result.tool_calls.iter().filter(|c| c.stage == Stage::Compile).count()
    }

    #[tokio::test]
    async fn test_unsupported_answer_gets_caveat() {
        let llm = grading_llm(Some("UNSUPPORTED: the 9% CTR is not in the data"));
        let orchestrator = grading_orchestrator(llm, EngineLimits::default());

        let result = orchestrator.run_workflow("Show me the top 5 campaigns", None).await;
        assert!(result.is_completed());
        let (answer, footer) = result.final_output.split_once("\n\n---\n").unwrap();
        assert!(answer.starts_with("[fb_spring] leads"));
        assert!(answer.ends_with(crate::grader::GROUNDING_CAVEAT));
        assert!(footer.starts_with(&format!("{}/", result.summary.ok_count)));

        let verdict = result.grounding.as_ref().unwrap();
        assert!(!verdict.grounded);
        assert_eq!(verdict.reason.as_deref(), Some("the 9% CTR is not in the data"));
        assert!(result
            .errors
            .iter()
            .any(|e| e == "[unsupported_claims] compile: the 9% CTR is not in the data"));
        assert_eq!(compile_calls(&result), 2);
    }

    #[tokio::test]
    async fn test_supported_answer_left_alone() {
        let orchestrator = grading_orchestrator(grading_llm(Some("VALID")), EngineLimits::default());

        let result = orchestrator.run_workflow("Show me the top 5 campaigns", None).await;
        assert!(!result.final_output.contains(crate::grader::GROUNDING_CAVEAT));
        assert!(result.grounding.as_ref().unwrap().grounded);
        assert!(result.errors.is_empty());
        assert_eq!(compile_calls(&result), 2);
    }

    #[tokio::test]
    async fn test_failed_grounding_check_keeps_answer() {
        let orchestrator = grading_orchestrator(grading_llm(None), EngineLimits::default());

        let result = orchestrator.run_workflow("Show me the top 5 campaigns", None).await;
        assert!(result.is_completed());
        assert!(result.final_output.starts_with("[fb_spring] leads with a 9% CTR.\n\n---\n"));
        assert!(result.grounding.is_none());
        assert!(result.errors.is_empty());
        let last = result.tool_calls.last().unwrap();
        assert_eq!(last.stage, Stage::Compile);
        assert_eq!(last.status, crate::tracker::StepStatus::Error);
    }

    #[tokio::test]
    async fn test_grounding_check_respects_limits() {
        // off by default
        let result = orchestrator(grading_llm(Some("UNSUPPORTED")))
            .run_workflow("Show me the top 5 campaigns", None)
            .await;
        assert!(result.grounding.is_none());
        assert_eq!(compile_calls(&result), 1);

        // one call per stage leaves no room after generation
        let limits = EngineLimits {
            max_stages: 6,
            max_calls_per_stage: 1,
        };
        let result = grading_orchestrator(grading_llm(Some("UNSUPPORTED")), limits)
            .run_workflow("Show me the top 5 campaigns", None)
            .await;
        assert!(result.grounding.is_none());
        assert!(!result.final_output.contains(crate::grader::GROUNDING_CAVEAT));
        assert_eq!(compile_calls(&result), 1);
    }
}
