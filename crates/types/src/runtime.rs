use crate::authoring::{
    BranchOperator, CreateTaskConfig, NotificationConfig, SendEmailConfig, UpdateContactConfig,
    UpdateStatusConfig,
};
use serde::{Deserialize, Serialize};

/// Synthetic id of the terminal runtime step.
pub const WORKFLOW_END_STEP_ID: &str = "workflow_end";

/// Trigger vocabulary understood by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeTriggerKind {
    Manual,
    ContactCreated,
    ContactFieldChanged,
    FormSubmission,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerStepConfig {
    pub trigger: RuntimeTriggerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForTaskConfig {
    /// Runtime id of the `assign_task` step being waited on.
    pub task_step_id: String,
    pub timeout_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayConfig {
    pub days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionTest {
    pub variable: String,
    pub operator: BranchOperator,
    pub value: String,
}

/// A goto edge out of a condition step. `when: None` always matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionBranch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<ConditionTest>,
    pub goto: String,
}

/// Condition steps are the only runtime steps carrying control flow. With no matching
/// branch and no default they fall through to the next step in array order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionConfig {
    #[serde(default)]
    pub branches: Vec<ConditionBranch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_goto: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeStepKind {
    Trigger(TriggerStepConfig),
    AssignTask(CreateTaskConfig),
    SendEmail(SendEmailConfig),
    Notification(NotificationConfig),
    UpdateContact(UpdateContactConfig),
    UpdateStatus(UpdateStatusConfig),
    WaitForTask(WaitForTaskConfig),
    Delay(DelayConfig),
    Condition(ConditionConfig),
}

impl RuntimeStepKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeStepKind::Trigger(_) => "trigger",
            RuntimeStepKind::AssignTask(_) => "assign_task",
            RuntimeStepKind::SendEmail(_) => "send_email",
            RuntimeStepKind::Notification(_) => "notification",
            RuntimeStepKind::UpdateContact(_) => "update_contact",
            RuntimeStepKind::UpdateStatus(_) => "update_status",
            RuntimeStepKind::WaitForTask(_) => "wait_for_task",
            RuntimeStepKind::Delay(_) => "delay",
            RuntimeStepKind::Condition(_) => "condition",
        }
    }
}

/// Flat, goto-addressed execution step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStep {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: RuntimeStepKind,
}

impl RuntimeStep {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: RuntimeStepKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn condition(&self) -> Option<&ConditionConfig> {
        match &self.kind {
            RuntimeStepKind::Condition(config) => Some(config),
            _ => None,
        }
    }

    /// Every goto target named by this step.
    pub fn goto_targets(&self) -> Vec<&str> {
        match &self.kind {
            RuntimeStepKind::Condition(config) => config
                .branches
                .iter()
                .map(|branch| branch.goto.as_str())
                .chain(config.default_goto.as_deref())
                .collect(),
            _ => Vec::new(),
        }
    }
}
