use chrono::Utc;
use execution_tracker::models::{Execution, ResultPayload, WorkflowDefinition};
use execution_tracker::state_machine::{
    ExecutionEvent, ExecutionState, ExecutionStateMachine, StateMachineError, StepRecordEvent,
    StepRecordState, StepRecordStateMachine,
};

fn every_record_event() -> Vec<StepRecordEvent> {
    vec![
        StepRecordEvent::Start,
        StepRecordEvent::complete_with(Some("notes".to_string()), Some(ResultPayload::new())),
        StepRecordEvent::skip_because("not applicable"),
        StepRecordEvent::fail_with("blocked"),
    ]
}

#[test]
fn test_terminal_record_states_are_absorbing() {
    for terminal in [
        StepRecordState::Completed,
        StepRecordState::Skipped,
        StepRecordState::Failed,
    ] {
        for event in every_record_event() {
            let result = StepRecordStateMachine::determine_target_state(terminal, &event);
            assert!(
                matches!(result, Err(StateMachineError::InvalidTransition { .. })),
                "{terminal} accepted {}",
                event.event_type()
            );
        }
    }
}

#[test]
fn test_terminal_execution_states_are_absorbing() {
    let events = [
        ExecutionEvent::Start,
        ExecutionEvent::Pause,
        ExecutionEvent::Resume,
        ExecutionEvent::Complete,
        ExecutionEvent::Cancel,
    ];
    for terminal in [ExecutionState::Completed, ExecutionState::Cancelled] {
        for event in events {
            assert!(ExecutionStateMachine::determine_target_state(terminal, event).is_err());
        }
    }
}

#[test]
fn test_full_record_lifecycle_sets_each_timestamp_once() {
    let definition = WorkflowDefinition::new("wf", ["only"]);
    let (_, records) = Execution::materialize(&definition, Utc::now());
    let started_at = Utc::now();

    let started =
        StepRecordStateMachine::apply(&records[0], &StepRecordEvent::Start, started_at).unwrap();
    let skipped = StepRecordStateMachine::apply(
        &started,
        &StepRecordEvent::skip_because("  duplicate request  "),
        Utc::now(),
    )
    .unwrap();

    assert_eq!(skipped.started_at, Some(started_at));
    assert!(skipped.skipped_at.is_some());
    assert!(skipped.completed_at.is_none());
    assert!(skipped.failed_at.is_none());
    assert_eq!(skipped.skip_reason.as_deref(), Some("  duplicate request  "));
    assert!(skipped.failure_reason.is_none());
    assert_eq!(skipped.version, 2);
}
