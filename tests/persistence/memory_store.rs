use chrono::Utc;
use execution_tracker::models::{EntityKind, Execution, NewTransition, WorkflowDefinition};
use execution_tracker::persistence::{ChangeSet, ExecutionStore, MemoryExecutionStore};
use execution_tracker::state_machine::errors::PersistenceError;
use execution_tracker::state_machine::StepRecordState;
use uuid::Uuid;

#[tokio::test]
async fn test_commit_applies_record_execution_and_transition_together() {
    let store = MemoryExecutionStore::new();
    let (execution, records) =
        Execution::materialize(&WorkflowDefinition::new("wf", ["a", "b"]), Utc::now());
    store
        .insert_execution(&execution, &records, Vec::new())
        .await
        .unwrap();

    let mut record = records[0].clone();
    record.status = StepRecordState::InProgress;
    record.version += 1;
    let mut updated_execution = execution.clone();
    updated_execution.progress = 50;
    updated_execution.version += 1;
    let transition = NewTransition::new(
        EntityKind::StepRecord,
        record.step_record_uuid,
        Some("pending".to_string()),
        "in_progress",
        "start",
        Utc::now(),
    );

    store
        .commit(
            ChangeSet::record(record.clone())
                .with_execution(Some(updated_execution.clone()))
                .with_transition(transition),
        )
        .await
        .unwrap();

    assert_eq!(
        store.find_record(record.step_record_uuid).await.unwrap(),
        Some(record.clone())
    );
    assert_eq!(
        store.find_execution(execution.execution_uuid).await.unwrap(),
        Some(updated_execution)
    );
    assert_eq!(
        store
            .transitions_for(record.step_record_uuid)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_commit_for_unknown_entity_is_missing() {
    let store = MemoryExecutionStore::new();
    let (mut execution, _) =
        Execution::materialize(&WorkflowDefinition::new("wf", ["a"]), Utc::now());
    execution.version = 1;

    let err = store
        .commit(ChangeSet::execution(execution))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Missing {
            entity: EntityKind::Execution,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_execution_has_no_records_or_history() {
    let store = MemoryExecutionStore::new();
    let uuid = Uuid::new_v4();
    assert!(store.records_for_execution(uuid).await.unwrap().is_empty());
    assert!(store.transitions_for(uuid).await.unwrap().is_empty());
    assert!(store.find_execution(uuid).await.unwrap().is_none());
}
