use serde::{Deserialize, Serialize};

use crate::models::ResultPayload;

/// Requests that can trigger execution state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    /// Begin working the execution
    Start,
    /// Put the execution on hold
    Pause,
    /// Continue a paused execution
    Resume,
    /// Close the execution once every step record is terminal
    Complete,
    /// Abandon the execution
    Cancel,
}

impl ExecutionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancel)
    }
}

/// Requests that can trigger step record state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StepRecordEvent {
    /// Begin working the step
    Start,
    /// Finish the step with optional notes and structured result
    Complete {
        notes: Option<String>,
        result: Option<ResultPayload>,
    },
    /// Skip the step; the reason is mandatory
    Skip(String),
    /// Fail the step; the reason is mandatory
    Fail(String),
}

impl StepRecordEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete { .. } => "complete",
            Self::Skip(_) => "skip",
            Self::Fail(_) => "fail",
        }
    }

    /// Skip or failure reason carried by the event
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Skip(reason) | Self::Fail(reason) => Some(reason),
            _ => None,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Start)
    }

    /// Create a completion event
    pub fn complete_with(notes: Option<String>, result: Option<ResultPayload>) -> Self {
        Self::Complete { notes, result }
    }

    /// Create a skip event with the given reason
    pub fn skip_because(reason: impl Into<String>) -> Self {
        Self::Skip(reason.into())
    }

    /// Create a failure event with the given reason
    pub fn fail_with(reason: impl Into<String>) -> Self {
        Self::Fail(reason.into())
    }
}
