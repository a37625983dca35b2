use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kinds of entities the tracker addresses by uuid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Execution,
    StepRecord,
    Workflow,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution => write!(f, "execution"),
            Self::StepRecord => write!(f, "step_record"),
            Self::Workflow => write!(f, "workflow"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "execution" => Ok(Self::Execution),
            "step_record" => Ok(Self::StepRecord),
            "workflow" => Ok(Self::Workflow),
            _ => Err(format!("Invalid entity kind: {s}")),
        }
    }
}

/// Persisted state change audit entry for an execution or a step record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub entity: EntityKind,
    pub entity_uuid: Uuid,
    pub from_state: Option<String>,
    pub to_state: String,
    pub event: String,
    pub sort_key: i32,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Transition awaiting persistence; the store assigns the sort key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransition {
    pub entity: EntityKind,
    pub entity_uuid: Uuid,
    pub from_state: Option<String>,
    pub to_state: String,
    pub event: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewTransition {
    pub fn new(
        entity: EntityKind,
        entity_uuid: Uuid,
        from_state: Option<String>,
        to_state: impl Into<String>,
        event: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let event = event.into();
        Self {
            entity,
            entity_uuid,
            from_state,
            to_state: to_state.into(),
            metadata: serde_json::json!({
                "event": event,
                "timestamp": created_at.to_rfc3339(),
            }),
            event,
            created_at,
        }
    }

    /// Merge extra keys into the transition metadata
    pub fn with_metadata(mut self, extra: serde_json::Value) -> Self {
        if let (Some(base), serde_json::Value::Object(extra)) = (self.metadata.as_object_mut(), extra)
        {
            base.extend(extra);
        }
        self
    }

    pub fn into_record(self, sort_key: i32) -> TransitionRecord {
        TransitionRecord {
            entity: self.entity,
            entity_uuid: self.entity_uuid,
            from_state: self.from_state,
            to_state: self.to_state,
            event: self.event,
            sort_key,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}
