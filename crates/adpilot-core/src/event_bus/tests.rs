use super::*;
use crate::engine::Stage;
use crate::tracker::StepStatus;
use adpilot_tools::Capability;
use uuid::Uuid;

#[tokio::test]
async fn test_publish_subscribe() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();

    let run_id = Uuid::new_v4();
    bus.publish(WorkflowEvent::StageStarted {
        run_id,
        stage: Stage::FetchData,
    });

    let event = rx.recv().await.unwrap();
    assert_eq!(event.run_id(), run_id);
    match event {
        WorkflowEvent::StageStarted { stage, .. } => assert_eq!(stage, Stage::FetchData),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_multiple_subscribers_see_order() {
    let bus = EventBus::new(16);
    let mut rx1 = bus.subscribe();
    let mut rx2 = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 2);

    let run_id = Uuid::new_v4();
    bus.publish(WorkflowEvent::RunStarted {
        run_id,
        question_chars: 12,
    });
    let delivered = bus.publish(WorkflowEvent::StepRecorded {
        run_id,
        sequence: 1,
        tool: Capability::FetchCampaigns,
        stage: Stage::FetchData,
        status: StepStatus::Ok,
        duration_ms: 4,
    });
    assert_eq!(delivered, 2);

    for rx in [&mut rx1, &mut rx2] {
        assert!(matches!(rx.recv().await.unwrap(), WorkflowEvent::RunStarted { .. }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            WorkflowEvent::StepRecorded { sequence: 1, .. }
        ));
    }
}

#[test]
fn test_publish_without_subscribers() {
    let bus = EventBus::default();
    let count = bus.publish(WorkflowEvent::StageFinished {
        run_id: Uuid::nil(),
        stage: Stage::Compile,
        outcome: "ok",
    });
    assert_eq!(count, 0);
}

#[test]
fn test_event_serialization() {
    let event = WorkflowEvent::StepRecorded {
        run_id: Uuid::nil(),
        sequence: 3,
        tool: Capability::WebSearch,
        stage: Stage::Research,
        status: StepStatus::Error,
        duration_ms: 15,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"step_recorded\""));
    assert!(json.contains("\"tool\":\"web_search\""));
    assert!(json.contains("\"stage\":\"research\""));
}
