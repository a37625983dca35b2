use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One step of an external workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub step_uuid: Uuid,
    pub name: String,
    pub position: i32,
}

/// Workflow definition as returned by a `WorkflowDefinitionSource`
///
/// Definitions are owned by the surrounding application; the tracker only reads
/// the ordered step list when an execution is instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub workflow_uuid: Uuid,
    pub name: String,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    /// Build a definition whose steps are positioned in the given order
    pub fn new<I, S>(name: impl Into<String>, step_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps = step_names
            .into_iter()
            .enumerate()
            .map(|(index, step_name)| StepDefinition {
                step_uuid: Uuid::new_v4(),
                name: step_name.into(),
                position: index as i32,
            })
            .collect();

        Self {
            workflow_uuid: Uuid::new_v4(),
            name: name.into(),
            steps,
        }
    }

    /// Steps sorted by position, ties broken by declaration order
    pub fn ordered_steps(&self) -> Vec<&StepDefinition> {
        let mut steps: Vec<&StepDefinition> = self.steps.iter().collect();
        steps.sort_by_key(|step| step.position);
        steps
    }
}
