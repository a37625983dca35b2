use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

use execution_tracker::lifecycle_events as events;
use execution_tracker::PublishedEvent;

use crate::common::TestTracker;

fn drain(receiver: &mut tokio::sync::broadcast::Receiver<PublishedEvent>) -> Vec<PublishedEvent> {
    let mut received = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => received.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
    received
}

#[tokio::test]
async fn test_lifecycle_events_follow_committed_transitions() {
    let tracker = TestTracker::new();
    let mut receiver = tracker.system.events().subscribe();

    let execution = tracker.execution_with_steps(2).await;
    let executions = tracker.system.executions();
    let records = tracker.system.step_records();

    executions.start(execution.execution_uuid).await.unwrap();
    records.start(execution.record_uuids[0]).await.unwrap();
    records
        .complete(execution.record_uuids[0], None, None)
        .await
        .unwrap();

    // Rejected calls publish nothing
    let _ = records.start(execution.record_uuids[0]).await;

    let names: Vec<String> = drain(&mut receiver).into_iter().map(|e| e.name).collect();
    assert_eq!(
        names,
        vec![
            events::EXECUTION_CREATED,
            events::EXECUTION_STARTED,
            events::STEP_RECORD_STARTED,
            events::EXECUTION_PROGRESS_UPDATED,
            events::STEP_RECORD_COMPLETED,
        ]
    );
}

#[tokio::test]
async fn test_progress_event_carries_previous_value() {
    let tracker = TestTracker::new();
    let execution = tracker.started_execution(4).await;
    let mut receiver = tracker.system.events().subscribe();

    tracker
        .system
        .step_records()
        .skip(execution.record_uuids[3], "not needed")
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let event = receiver.recv().await.expect("channel open");
            if event.name == events::EXECUTION_PROGRESS_UPDATED {
                return event;
            }
        }
    })
    .await
    .expect("progress event published");

    assert_eq!(event.context["previous_progress"], 0);
    assert_eq!(event.context["progress"], 25);
    assert_eq!(event.context["all_terminal"], false);
}
