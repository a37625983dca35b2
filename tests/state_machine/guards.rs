use chrono::Utc;
use execution_tracker::models::{Execution, WorkflowDefinition};
use execution_tracker::state_machine::errors::GuardError;
use execution_tracker::state_machine::guards::*;
use execution_tracker::state_machine::{ExecutionState, StepRecordEvent, StepRecordState};

#[test]
fn test_guard_descriptions() {
    assert_eq!(
        NonEmptyReasonGuard.description(),
        "Skip and failure reasons must not be empty"
    );
    assert_eq!(
        ExecutionOpenGuard.description(),
        "Owning execution must not be completed or cancelled"
    );
}

#[test]
fn test_reason_guard_rejects_only_empty_strings() {
    assert!(NonEmptyReasonGuard
        .check(&StepRecordEvent::fail_with(""))
        .is_err());
    assert!(NonEmptyReasonGuard
        .check(&StepRecordEvent::fail_with(" \n\t"))
        .is_ok());
    assert!(NonEmptyReasonGuard
        .check(&StepRecordEvent::fail_with(" blocked "))
        .is_ok());
    assert!(NonEmptyReasonGuard.check(&StepRecordEvent::Start).is_ok());
}

#[test]
fn test_open_guard_by_status() {
    let definition = WorkflowDefinition::new("wf", ["a"]);
    let (mut execution, _) = Execution::materialize(&definition, Utc::now());

    for (status, open) in [
        (ExecutionState::Pending, true),
        (ExecutionState::InProgress, true),
        (ExecutionState::Paused, true),
        (ExecutionState::Completed, false),
        (ExecutionState::Cancelled, false),
    ] {
        execution.status = status;
        assert_eq!(ExecutionOpenGuard.check(&execution).is_ok(), open, "{status}");
    }
}

#[test]
fn test_all_records_terminal_guard_lists_offenders() {
    let definition = WorkflowDefinition::new("wf", ["a", "b", "c"]);
    let (execution, mut records) = Execution::materialize(&definition, Utc::now());
    records[0].status = StepRecordState::Completed;
    records[1].status = StepRecordState::InProgress;

    let err = AllRecordsTerminalGuard::new(&records)
        .check(&execution)
        .unwrap_err();
    match err {
        GuardError::RecordsNotTerminal {
            pending_count,
            pending_record_uuids,
        } => {
            assert_eq!(pending_count, 2);
            assert_eq!(
                pending_record_uuids,
                vec![records[1].step_record_uuid, records[2].step_record_uuid]
            );
        }
        other => panic!("unexpected guard error: {other:?}"),
    }
}
