//! Postgres-backed `ExecutionStore`.
//!
//! Every `commit` runs in one transaction. Entity updates are guarded with
//! `WHERE version = $previous`, so a stale writer affects zero rows and the whole
//! transaction rolls back.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ChangeSet, ExecutionFilter, ExecutionStore};
use crate::config::DatabaseConfig;
use crate::models::{EntityKind, Execution, NewTransition, ResultPayload, StepRecord, TransitionRecord};
use crate::state_machine::errors::{PersistenceError, PersistenceResult};

const EXECUTION_COLUMNS: &str = "execution_uuid, workflow_uuid, status, progress, record_uuids, \
     started_at, completed_at, cancelled_at, version, created_at, updated_at";

const RECORD_COLUMNS: &str = "step_record_uuid, execution_uuid, step_uuid, position, status, notes, \
     skip_reason, failure_reason, result, started_at, completed_at, skipped_at, failed_at, version, \
     created_at, updated_at";

/// Execution store on a shared `PgPool`
#[derive(Debug, Clone)]
pub struct PgExecutionStore {
    pool: PgPool,
}

impl PgExecutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> PersistenceResult<Self> {
        let url = config
            .database_url()
            .ok_or_else(|| PersistenceError::Unavailable {
                reason: "no database url configured (database.url or DATABASE_URL)".to_string(),
            })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&url)
            .await
            .map_err(|e| PersistenceError::Unavailable {
                reason: format!("Failed to connect to database: {e}"),
            })?;

        info!(
            max_connections = config.max_connections,
            "Connected execution store to postgres"
        );
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> PersistenceResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PersistenceError::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_state<T: std::str::FromStr<Err = String>>(
    field: &'static str,
    raw: &str,
) -> PersistenceResult<T> {
    raw.parse()
        .map_err(|reason| PersistenceError::InvalidData { field, reason })
}

fn execution_from_row(row: &PgRow) -> PersistenceResult<Execution> {
    let status: String = row.try_get("status")?;
    let progress: i16 = row.try_get("progress")?;

    Ok(Execution {
        execution_uuid: row.try_get("execution_uuid")?,
        workflow_uuid: row.try_get("workflow_uuid")?,
        status: parse_state("status", &status)?,
        progress: u8::try_from(progress).map_err(|_| PersistenceError::InvalidData {
            field: "progress",
            reason: format!("{progress} is out of range"),
        })?,
        record_uuids: row.try_get("record_uuids")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn record_from_row(row: &PgRow) -> PersistenceResult<StepRecord> {
    let status: String = row.try_get("status")?;
    let result: Option<serde_json::Value> = row.try_get("result")?;
    let result = result
        .map(ResultPayload::try_from)
        .transpose()
        .map_err(|e| PersistenceError::InvalidData {
            field: "result",
            reason: e.to_string(),
        })?;

    Ok(StepRecord {
        step_record_uuid: row.try_get("step_record_uuid")?,
        execution_uuid: row.try_get("execution_uuid")?,
        step_uuid: row.try_get("step_uuid")?,
        position: row.try_get("position")?,
        status: parse_state("status", &status)?,
        notes: row.try_get("notes")?,
        skip_reason: row.try_get("skip_reason")?,
        failure_reason: row.try_get("failure_reason")?,
        result,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        skipped_at: row.try_get("skipped_at")?,
        failed_at: row.try_get("failed_at")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn transition_from_row(row: &PgRow) -> PersistenceResult<TransitionRecord> {
    let entity: String = row.try_get("entity")?;

    Ok(TransitionRecord {
        entity: parse_state("entity", &entity)?,
        entity_uuid: row.try_get("entity_uuid")?,
        from_state: row.try_get("from_state")?,
        to_state: row.try_get("to_state")?,
        event: row.try_get("event")?,
        sort_key: row.try_get("sort_key")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn insert_record(
    tx: &mut Transaction<'_, Postgres>,
    record: &StepRecord,
) -> PersistenceResult<()> {
    sqlx::query(
        "INSERT INTO tracker_step_records (step_record_uuid, execution_uuid, step_uuid, position, \
         status, notes, skip_reason, failure_reason, result, started_at, completed_at, skipped_at, \
         failed_at, version, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(record.step_record_uuid)
    .bind(record.execution_uuid)
    .bind(record.step_uuid)
    .bind(record.position)
    .bind(record.status.to_string())
    .bind(&record.notes)
    .bind(&record.skip_reason)
    .bind(&record.failure_reason)
    .bind(record.result.clone().map(serde_json::Value::from))
    .bind(record.started_at)
    .bind(record.completed_at)
    .bind(record.skipped_at)
    .bind(record.failed_at)
    .bind(record.version)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_transition(
    tx: &mut Transaction<'_, Postgres>,
    transition: &NewTransition,
) -> PersistenceResult<()> {
    sqlx::query(
        "INSERT INTO tracker_transitions (entity, entity_uuid, from_state, to_state, event, \
         sort_key, metadata, created_at) \
         SELECT $1, $2, $3, $4, $5, COALESCE(MAX(sort_key), 0) + 1, $6, $7 \
         FROM tracker_transitions WHERE entity_uuid = $2",
    )
    .bind(transition.entity.to_string())
    .bind(transition.entity_uuid)
    .bind(&transition.from_state)
    .bind(&transition.to_state)
    .bind(&transition.event)
    .bind(&transition.metadata)
    .bind(transition.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Distinguish a missing row from a version mismatch after a zero-row update
async fn stale_write_error(
    tx: &mut Transaction<'_, Postgres>,
    entity: EntityKind,
    entity_uuid: Uuid,
) -> PersistenceError {
    let table = match entity {
        EntityKind::StepRecord => "SELECT 1 FROM tracker_step_records WHERE step_record_uuid = $1",
        _ => "SELECT 1 FROM tracker_executions WHERE execution_uuid = $1",
    };

    match sqlx::query(table)
        .bind(entity_uuid)
        .fetch_optional(&mut **tx)
        .await
    {
        Ok(Some(_)) => PersistenceError::ConcurrentModification {
            entity,
            entity_uuid,
        },
        Ok(None) => PersistenceError::Missing {
            entity,
            entity_uuid,
        },
        Err(e) => e.into(),
    }
}

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn insert_execution(
        &self,
        execution: &Execution,
        records: &[StepRecord],
        transitions: Vec<NewTransition>,
    ) -> PersistenceResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO tracker_executions (execution_uuid, workflow_uuid, status, progress, \
             record_uuids, started_at, completed_at, cancelled_at, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (execution_uuid) DO NOTHING",
        )
        .bind(execution.execution_uuid)
        .bind(execution.workflow_uuid)
        .bind(execution.status.to_string())
        .bind(i16::from(execution.progress))
        .bind(&execution.record_uuids)
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .bind(execution.cancelled_at)
        .bind(execution.version)
        .bind(execution.created_at)
        .bind(execution.updated_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(PersistenceError::Duplicate {
                entity: EntityKind::Execution,
                entity_uuid: execution.execution_uuid,
            });
        }

        for record in records {
            insert_record(&mut tx, record).await?;
        }
        for transition in &transitions {
            insert_transition(&mut tx, transition).await?;
        }

        tx.commit().await?;
        debug!(
            execution_uuid = %execution.execution_uuid,
            records = records.len(),
            "Inserted execution"
        );
        Ok(())
    }

    async fn find_execution(&self, execution_uuid: Uuid) -> PersistenceResult<Option<Execution>> {
        let sql = format!("SELECT {EXECUTION_COLUMNS} FROM tracker_executions WHERE execution_uuid = $1");
        let row = sqlx::query(&sql)
            .bind(execution_uuid)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(execution_from_row).transpose()
    }

    async fn find_record(&self, step_record_uuid: Uuid) -> PersistenceResult<Option<StepRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM tracker_step_records WHERE step_record_uuid = $1");
        let row = sqlx::query(&sql)
            .bind(step_record_uuid)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn records_for_execution(
        &self,
        execution_uuid: Uuid,
    ) -> PersistenceResult<Vec<StepRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM tracker_step_records WHERE execution_uuid = $1 \
             ORDER BY position, step_record_uuid"
        );
        let rows = sqlx::query(&sql)
            .bind(execution_uuid)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn list_executions(&self, filter: &ExecutionFilter) -> PersistenceResult<Vec<Execution>> {
        let sql = format!(
            "SELECT {EXECUTION_COLUMNS} FROM tracker_executions \
             WHERE ($1::uuid IS NULL OR workflow_uuid = $1) \
             AND ($2::varchar IS NULL OR status = $2) \
             ORDER BY created_at, execution_uuid"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.workflow_uuid)
            .bind(filter.status.map(|status| status.to_string()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(execution_from_row).collect()
    }

    async fn commit(&self, changes: ChangeSet) -> PersistenceResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        if let Some(record) = &changes.record {
            let updated = sqlx::query(
                "UPDATE tracker_step_records SET status = $3, notes = $4, skip_reason = $5, \
                 failure_reason = $6, result = $7, started_at = $8, completed_at = $9, \
                 skipped_at = $10, failed_at = $11, version = $12, updated_at = $13 \
                 WHERE step_record_uuid = $1 AND version = $2",
            )
            .bind(record.step_record_uuid)
            .bind(record.version - 1)
            .bind(record.status.to_string())
            .bind(&record.notes)
            .bind(&record.skip_reason)
            .bind(&record.failure_reason)
            .bind(record.result.clone().map(serde_json::Value::from))
            .bind(record.started_at)
            .bind(record.completed_at)
            .bind(record.skipped_at)
            .bind(record.failed_at)
            .bind(record.version)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(
                    stale_write_error(&mut tx, EntityKind::StepRecord, record.step_record_uuid).await,
                );
            }
        }

        if let Some(execution) = &changes.execution {
            let updated = sqlx::query(
                "UPDATE tracker_executions SET status = $3, progress = $4, started_at = $5, \
                 completed_at = $6, cancelled_at = $7, version = $8, updated_at = $9 \
                 WHERE execution_uuid = $1 AND version = $2",
            )
            .bind(execution.execution_uuid)
            .bind(execution.version - 1)
            .bind(execution.status.to_string())
            .bind(i16::from(execution.progress))
            .bind(execution.started_at)
            .bind(execution.completed_at)
            .bind(execution.cancelled_at)
            .bind(execution.version)
            .bind(execution.updated_at)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(
                    stale_write_error(&mut tx, EntityKind::Execution, execution.execution_uuid)
                        .await,
                );
            }
        }

        for transition in &changes.transitions {
            insert_transition(&mut tx, transition).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn transitions_for(&self, entity_uuid: Uuid) -> PersistenceResult<Vec<TransitionRecord>> {
        let rows = sqlx::query(
            "SELECT entity, entity_uuid, from_state, to_state, event, sort_key, metadata, created_at \
             FROM tracker_transitions WHERE entity_uuid = $1 ORDER BY sort_key",
        )
        .bind(entity_uuid)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transition_from_row).collect()
    }
}
