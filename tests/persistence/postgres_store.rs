//! Postgres store tests; need `DATABASE_URL` and run with `--ignored`

use chrono::Utc;
use execution_tracker::models::{EntityKind, Execution, NewTransition, WorkflowDefinition};
use execution_tracker::persistence::{ChangeSet, ExecutionFilter, ExecutionStore, PgExecutionStore};
use execution_tracker::state_machine::errors::PersistenceError;
use execution_tracker::state_machine::{ExecutionState, StepRecordState};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a postgres database"]
async fn test_insert_and_load_execution(pool: PgPool) {
    let store = PgExecutionStore::new(pool);
    let (execution, records) =
        Execution::materialize(&WorkflowDefinition::new("wf", ["a", "b", "c"]), Utc::now());
    let initial = NewTransition::new(
        EntityKind::Execution,
        execution.execution_uuid,
        None,
        "pending",
        "initialize",
        Utc::now(),
    );

    store
        .insert_execution(&execution, &records, vec![initial])
        .await
        .unwrap();

    let loaded = store
        .find_execution(execution.execution_uuid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.record_uuids, execution.record_uuids);
    assert_eq!(loaded.status, ExecutionState::Pending);

    let loaded_records = store
        .records_for_execution(execution.execution_uuid)
        .await
        .unwrap();
    let uuids: Vec<_> = loaded_records.iter().map(|r| r.step_record_uuid).collect();
    assert_eq!(uuids, execution.record_uuids);

    let duplicate = store
        .insert_execution(&execution, &records, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(duplicate, PersistenceError::Duplicate { .. }));

    let listed = store
        .list_executions(&ExecutionFilter {
            workflow_uuid: Some(execution.workflow_uuid),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a postgres database"]
async fn test_stale_commit_rolls_back(pool: PgPool) {
    let store = PgExecutionStore::new(pool);
    let (execution, records) =
        Execution::materialize(&WorkflowDefinition::new("wf", ["a"]), Utc::now());
    store
        .insert_execution(&execution, &records, Vec::new())
        .await
        .unwrap();

    let mut record = records[0].clone();
    record.status = StepRecordState::InProgress;
    record.started_at = Some(Utc::now());
    record.version += 1;

    // Execution version not bumped: the whole change set must be rejected
    let stale_execution = execution.clone();
    let err = store
        .commit(ChangeSet::record(record.clone()).with_execution(Some(stale_execution)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::ConcurrentModification {
            entity: EntityKind::Execution,
            ..
        }
    ));

    let stored = store
        .find_record(record.step_record_uuid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, StepRecordState::Pending);
    assert_eq!(stored.version, 0);
}
