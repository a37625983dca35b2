//! Races between callers acting on the same execution

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use execution_tracker::state_machine::{ExecutionState, StepRecordState};
use execution_tracker::TrackerError;

use crate::common::{test_config, TestTracker};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_terminal_transitions_have_one_winner() {
    let tracker = TestTracker::new();
    let execution = tracker.started_execution(1).await;
    let record = execution.record_uuids[0];
    let records = tracker.system.step_records().clone();

    let mut handles = Vec::new();
    for attempt in 0..8 {
        let records = Arc::clone(&records);
        handles.push(tokio::spawn(async move {
            match attempt % 3 {
                0 => records.complete(record, None, None).await,
                1 => records.skip(record, "superseded").await,
                _ => records.fail(record, "conflict").await,
            }
        }));
    }

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for loser in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(loser, TrackerError::InvalidTransition { .. }),
            "unexpected error: {loser:?}"
        );
    }

    let stored = records.get(record).await.unwrap();
    assert!(stored.status.is_terminal());
    assert_eq!(stored.version, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_complete_and_cancel_race_to_one_terminal_state() {
    for _ in 0..20 {
        let tracker = TestTracker::new();
        let execution = tracker.started_execution(1).await;
        tracker
            .system
            .step_records()
            .complete(execution.record_uuids[0], None, None)
            .await
            .unwrap();

        let executions = tracker.system.executions().clone();
        let uuid = execution.execution_uuid;
        let completing = {
            let executions = Arc::clone(&executions);
            tokio::spawn(async move { executions.complete(uuid).await })
        };
        let cancelling = {
            let executions = Arc::clone(&executions);
            tokio::spawn(async move { executions.cancel(uuid).await })
        };

        let completed = completing.await.unwrap();
        let cancelled = cancelling.await.unwrap();
        assert_ne!(completed.is_ok(), cancelled.is_ok(), "exactly one must win");

        let stored = executions.get(uuid).await.unwrap();
        match stored.status {
            ExecutionState::Completed => {
                assert!(stored.completed_at.is_some());
                assert!(stored.cancelled_at.is_none());
            }
            ExecutionState::Cancelled => {
                assert!(stored.cancelled_at.is_some());
                assert!(stored.completed_at.is_none());
            }
            other => panic!("execution left in {other}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_records_produce_exact_progress() {
    let tracker = TestTracker::new();
    let execution = tracker.started_execution(10).await;
    let records = tracker.system.step_records().clone();

    let handles = execution.record_uuids.iter().enumerate().map(|(i, record)| {
        let records = Arc::clone(&records);
        let record = *record;
        tokio::spawn(async move {
            if i % 2 == 0 {
                records.complete(record, None, None).await
            } else {
                records.fail(record, "flaky dependency").await
            }
        })
    });
    for joined in join_all(handles).await {
        joined.expect("task panicked").expect("transition succeeded");
    }

    let stored = tracker
        .system
        .executions()
        .get(execution.execution_uuid)
        .await
        .unwrap();
    assert_eq!(stored.progress, 50);

    // Recomputing against the settled records changes nothing
    let recomputed = tracker
        .system
        .executions()
        .on_record_changed(execution.execution_uuid)
        .await
        .unwrap();
    assert_eq!(recomputed, stored);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_blocks_in_flight_record_changes() {
    let tracker = TestTracker::new();
    let execution = tracker.started_execution(4).await;
    let records = tracker.system.step_records().clone();
    let executions = tracker.system.executions().clone();

    let mut handles = Vec::new();
    for record in execution.record_uuids.clone() {
        let records = Arc::clone(&records);
        handles.push(tokio::spawn(async move {
            records.complete(record, None, None).await.map(|r| r.status)
        }));
    }
    let cancelled = executions.cancel(execution.execution_uuid).await.unwrap();

    let mut completed_before_cancel = 0;
    for joined in join_all(handles).await {
        match joined.expect("task panicked") {
            Ok(StepRecordState::Completed) => completed_before_cancel += 1,
            Ok(other) => panic!("unexpected status {other}"),
            Err(TrackerError::ExecutionClosed { .. }) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    // Nothing may change once cancel committed
    let final_records = executions.records(execution.execution_uuid).await.unwrap();
    let completed_now = final_records
        .iter()
        .filter(|r| r.status == StepRecordState::Completed)
        .count();
    assert_eq!(completed_now, completed_before_cancel);
    assert_eq!(
        cancelled.progress as usize,
        completed_before_cancel * 100 / 4,
        "progress frozen at cancel time"
    );
}

#[tokio::test]
async fn test_lock_wait_is_bounded() {
    let mut config = test_config();
    config.locking.acquire_timeout_ms = 25;
    let tracker = TestTracker::with_config(config);
    let execution = tracker.started_execution(1).await;

    // Hold the exclusive execution gate as a status change would
    let _gate = tracker
        .system
        .locks()
        .lock_execution(execution.execution_uuid)
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let err = tracker
        .system
        .step_records()
        .complete(execution.record_uuids[0], None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::LockTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(2));

    let record = tracker
        .system
        .step_records()
        .get(execution.record_uuids[0])
        .await
        .unwrap();
    assert_eq!(record.status, StepRecordState::InProgress);
}
