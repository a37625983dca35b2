//! Walkthrough of a three-step execution from creation to completion

use execution_tracker::models::ResultPayload;
use execution_tracker::persistence::ExecutionFilter;
use execution_tracker::state_machine::{ExecutionState, StepRecordState};
use execution_tracker::TrackerError;

use crate::common::TestTracker;

#[tokio::test]
async fn test_three_step_execution_lifecycle() {
    let tracker = TestTracker::new();
    let executions = tracker.system.executions();
    let records = tracker.system.step_records();

    let execution = tracker.execution_with_steps(3).await;
    let uuid = execution.execution_uuid;
    let [record1, record2, record3] = [
        execution.record_uuids[0],
        execution.record_uuids[1],
        execution.record_uuids[2],
    ];
    executions.start(uuid).await.unwrap();

    // complete(record1) -> 33
    records.start(record1).await.unwrap();
    records
        .complete(record1, Some("ok".to_string()), Some(ResultPayload::new()))
        .await
        .unwrap();
    assert_eq!(executions.get(uuid).await.unwrap().progress, 33);

    // skip(record2) -> 66
    records.start(record2).await.unwrap();
    records.skip(record2, "not applicable").await.unwrap();
    assert_eq!(executions.get(uuid).await.unwrap().progress, 66);

    // fail(record3) -> still 66, but all terminal
    records.start(record3).await.unwrap();
    records.fail(record3, "blocked").await.unwrap();
    assert_eq!(executions.get(uuid).await.unwrap().progress, 66);
    let context = executions.context(uuid).await.unwrap();
    assert!(context.all_terminal);
    assert!(context.ready_for_completion);
    assert_eq!(context.failed_records, 1);

    // complete(execution) succeeds
    let completed = executions.complete(uuid).await.unwrap();
    assert_eq!(completed.status, ExecutionState::Completed);
    assert!(completed.completed_at.is_some());
    assert!(completed.cancelled_at.is_none());
    assert_eq!(completed.progress, 66);

    // completing record1 again is an invalid transition on a closed execution;
    // the closed execution is reported first
    let err = records.complete(record1, None, None).await.unwrap_err();
    assert!(matches!(err, TrackerError::ExecutionClosed { .. }));
}

#[tokio::test]
async fn test_completing_a_completed_record_is_invalid_transition() {
    let tracker = TestTracker::new();
    let execution = tracker.started_execution(3).await;
    let record1 = execution.record_uuids[0];
    let records = tracker.system.step_records();

    records.complete(record1, Some("ok".to_string()), None).await.unwrap();
    let before = records.get(record1).await.unwrap();

    let err = records.complete(record1, None, None).await.unwrap_err();
    assert!(matches!(err, TrackerError::InvalidTransition { ref from, .. } if from == "completed"));
    assert_eq!(records.get(record1).await.unwrap(), before);
}

#[tokio::test]
async fn test_cancel_pending_execution_with_zero_records() {
    let tracker = TestTracker::new();
    let execution = tracker.execution_with_steps(0).await;

    assert_eq!(execution.progress, 0);
    let cancelled = tracker
        .system
        .executions()
        .cancel(execution.execution_uuid)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ExecutionState::Cancelled);
    assert_eq!(cancelled.progress, 0);
    assert!(cancelled.cancelled_at.is_some());
}

#[tokio::test]
async fn test_pause_and_resume_leave_records_alone() {
    let tracker = TestTracker::new();
    let execution = tracker.started_execution(2).await;
    let executions = tracker.system.executions();

    let paused = executions.pause(execution.execution_uuid).await.unwrap();
    assert_eq!(paused.status, ExecutionState::Paused);

    // Records may still progress while paused
    tracker
        .system
        .step_records()
        .complete(execution.record_uuids[0], None, None)
        .await
        .unwrap();

    let resumed = executions.resume(execution.execution_uuid).await.unwrap();
    assert_eq!(resumed.status, ExecutionState::InProgress);
    assert_eq!(resumed.progress, 50);
    assert_eq!(resumed.started_at, paused.started_at);

    let statuses: Vec<_> = executions
        .records(execution.execution_uuid)
        .await
        .unwrap()
        .iter()
        .map(|r| r.status)
        .collect();
    assert_eq!(statuses, vec![StepRecordState::Completed, StepRecordState::InProgress]);
}

#[tokio::test]
async fn test_pause_from_pending_then_resume_sets_started_at() {
    let tracker = TestTracker::new();
    let execution = tracker.execution_with_steps(1).await;
    let executions = tracker.system.executions();

    let paused = executions.pause(execution.execution_uuid).await.unwrap();
    assert!(paused.started_at.is_none());

    let resumed = executions.resume(execution.execution_uuid).await.unwrap();
    assert!(resumed.started_at.is_some());
}

#[tokio::test]
async fn test_precompletion_lists_offending_records() {
    let tracker = TestTracker::new();
    let execution = tracker.started_execution(3).await;
    tracker
        .system
        .step_records()
        .complete(execution.record_uuids[1], None, None)
        .await
        .unwrap();

    let err = tracker
        .system
        .executions()
        .complete(execution.execution_uuid)
        .await
        .unwrap_err();
    match err {
        TrackerError::Precompletion {
            pending_count,
            pending_record_uuids,
            ..
        } => {
            assert_eq!(pending_count, 2);
            assert_eq!(
                pending_record_uuids,
                vec![execution.record_uuids[0], execution.record_uuids[2]]
            );
        }
        other => panic!("expected precompletion error, got {other:?}"),
    }

    let stored = tracker
        .system
        .executions()
        .get(execution.execution_uuid)
        .await
        .unwrap();
    assert_eq!(stored.status, ExecutionState::InProgress);
    assert!(stored.completed_at.is_none());
}

#[tokio::test]
async fn test_history_and_listing() {
    let tracker = TestTracker::new();
    let first = tracker.execution_with_steps(1).await;
    let second = tracker.execution_with_steps(1).await;
    let executions = tracker.system.executions();

    executions.start(first.execution_uuid).await.unwrap();
    executions.cancel(first.execution_uuid).await.unwrap();

    let history = executions.history(first.execution_uuid).await.unwrap();
    let path: Vec<_> = history
        .iter()
        .map(|t| (t.from_state.clone(), t.to_state.clone(), t.sort_key))
        .collect();
    assert_eq!(
        path,
        vec![
            (None, "pending".to_string(), 1),
            (Some("pending".to_string()), "in_progress".to_string(), 2),
            (Some("in_progress".to_string()), "cancelled".to_string(), 3),
        ]
    );

    let pending = executions
        .list(&ExecutionFilter {
            status: Some(ExecutionState::Pending),
            ..ExecutionFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].execution_uuid, second.execution_uuid);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let tracker = TestTracker::new();
    let missing = uuid::Uuid::new_v4();

    assert!(matches!(
        tracker.system.executions().start(missing).await,
        Err(TrackerError::NotFound { .. })
    ));
    assert!(matches!(
        tracker.system.step_records().start(missing).await,
        Err(TrackerError::NotFound { .. })
    ));
    assert!(matches!(
        tracker.system.executions().on_record_changed(missing).await,
        Err(TrackerError::NotFound { .. })
    ));
}
