use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event that starts a workflow, optionally seeding the record's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WorkflowTrigger {
    Manual {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_status: Option<String>,
    },
    ContactCreated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_status: Option<String>,
    },
    ContactFieldChanged {
        #[serde(default)]
        watched_fields: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_status: Option<String>,
    },
    FormSubmission {
        form_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_status: Option<String>,
    },
    Api {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_status: Option<String>,
    },
}

impl Default for WorkflowTrigger {
    fn default() -> Self {
        WorkflowTrigger::Manual {
            initial_status: None,
        }
    }
}

impl WorkflowTrigger {
    pub fn initial_status(&self) -> Option<&str> {
        match self {
            WorkflowTrigger::Manual { initial_status }
            | WorkflowTrigger::ContactCreated { initial_status }
            | WorkflowTrigger::ContactFieldChanged { initial_status, .. }
            | WorkflowTrigger::FormSubmission { initial_status, .. }
            | WorkflowTrigger::Api { initial_status } => initial_status.as_deref(),
        }
    }

    /// Wire name of the trigger variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            WorkflowTrigger::Manual { .. } => "manual",
            WorkflowTrigger::ContactCreated { .. } => "contact_created",
            WorkflowTrigger::ContactFieldChanged { .. } => "contact_field_changed",
            WorkflowTrigger::FormSubmission { .. } => "form_submission",
            WorkflowTrigger::Api { .. } => "api",
        }
    }
}

/// Closed list of action kinds an authoring document may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    SendEmail,
    Notification,
    CreateTask,
    UpdateContact,
    UpdateStatus,
    UpdateTask,
    CreateContact,
    SetVariable,
}

impl ActionType {
    pub const ALL: [ActionType; 8] = [
        ActionType::SendEmail,
        ActionType::Notification,
        ActionType::CreateTask,
        ActionType::UpdateContact,
        ActionType::UpdateStatus,
        ActionType::UpdateTask,
        ActionType::CreateContact,
        ActionType::SetVariable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::SendEmail => "send_email",
            ActionType::Notification => "notification",
            ActionType::CreateTask => "create_task",
            ActionType::UpdateContact => "update_contact",
            ActionType::UpdateStatus => "update_status",
            ActionType::UpdateTask => "update_task",
            ActionType::CreateContact => "create_contact",
            ActionType::SetVariable => "set_variable",
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown action type '{}'", value))
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailConfig {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskConfig {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Days until the task is due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<TaskLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFieldUpdate {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactConfig {
    #[serde(default)]
    pub fields: Vec<ContactFieldUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusConfig {
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskConfig {
    pub task_action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactConfig {
    #[serde(default)]
    pub fields: Vec<ContactFieldUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableConfig {
    pub variable_id: String,
    pub value: Value,
}

/// One discrete effect performed when a step runs.
///
/// Unknown types and malformed configs land in [`WorkflowAction::Other`] and are reported by
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowAction {
    SendEmail {
        #[serde(default)]
        id: String,
        config: SendEmailConfig,
    },
    Notification {
        #[serde(default)]
        id: String,
        config: NotificationConfig,
    },
    CreateTask {
        #[serde(default)]
        id: String,
        config: CreateTaskConfig,
    },
    UpdateContact {
        #[serde(default)]
        id: String,
        config: UpdateContactConfig,
    },
    UpdateStatus {
        #[serde(default)]
        id: String,
        config: UpdateStatusConfig,
    },
    UpdateTask {
        #[serde(default)]
        id: String,
        config: UpdateTaskConfig,
    },
    CreateContact {
        #[serde(default)]
        id: String,
        config: CreateContactConfig,
    },
    SetVariable {
        #[serde(default)]
        id: String,
        config: SetVariableConfig,
    },
    #[serde(untagged)]
    Other {
        #[serde(rename = "type")]
        action_type: String,
        #[serde(default)]
        id: String,
        #[serde(default)]
        config: Value,
    },
}

impl WorkflowAction {
    pub fn id(&self) -> &str {
        match self {
            WorkflowAction::SendEmail { id, .. }
            | WorkflowAction::Notification { id, .. }
            | WorkflowAction::CreateTask { id, .. }
            | WorkflowAction::UpdateContact { id, .. }
            | WorkflowAction::UpdateStatus { id, .. }
            | WorkflowAction::UpdateTask { id, .. }
            | WorkflowAction::CreateContact { id, .. }
            | WorkflowAction::SetVariable { id, .. }
            | WorkflowAction::Other { id, .. } => id,
        }
    }

    pub fn set_id(&mut self, new_id: impl Into<String>) {
        let new_id = new_id.into();
        match self {
            WorkflowAction::SendEmail { id, .. }
            | WorkflowAction::Notification { id, .. }
            | WorkflowAction::CreateTask { id, .. }
            | WorkflowAction::UpdateContact { id, .. }
            | WorkflowAction::UpdateStatus { id, .. }
            | WorkflowAction::UpdateTask { id, .. }
            | WorkflowAction::CreateContact { id, .. }
            | WorkflowAction::SetVariable { id, .. }
            | WorkflowAction::Other { id, .. } => *id = new_id,
        }
    }

    /// `None` for actions that did not parse into a known kind.
    pub fn action_type(&self) -> Option<ActionType> {
        let action_type = match self {
            WorkflowAction::SendEmail { .. } => ActionType::SendEmail,
            WorkflowAction::Notification { .. } => ActionType::Notification,
            WorkflowAction::CreateTask { .. } => ActionType::CreateTask,
            WorkflowAction::UpdateContact { .. } => ActionType::UpdateContact,
            WorkflowAction::UpdateStatus { .. } => ActionType::UpdateStatus,
            WorkflowAction::UpdateTask { .. } => ActionType::UpdateTask,
            WorkflowAction::CreateContact { .. } => ActionType::CreateContact,
            WorkflowAction::SetVariable { .. } => ActionType::SetVariable,
            WorkflowAction::Other { .. } => return None,
        };
        Some(action_type)
    }

    /// Wire name of the action's type, as written in the document.
    pub fn type_name(&self) -> &str {
        match self {
            WorkflowAction::Other { action_type, .. } => action_type,
            known => known.action_type().map_or("", |kind| kind.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCompletionMode {
    Any,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Days,
    Weeks,
}

impl DurationUnit {
    /// `duration` expressed in days. May overflow to infinity for huge week counts.
    pub fn to_days(self, duration: f64) -> f64 {
        match self {
            DurationUnit::Days => duration,
            DurationUnit::Weeks => duration * 7.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
}

/// Outcome of a multi-branch dispatch condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchBranch {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goto_step_id: Option<String>,
}

/// Rule deciding when execution leaves a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AdvancementCondition {
    #[default]
    Automatic,
    WhenTaskCompleted {
        task_action_id: String,
    },
    WhenTasksCompleted {
        task_action_ids: Vec<String>,
        mode: TaskCompletionMode,
    },
    WhenApproved {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        approver: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        approved_goto: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rejected_goto: Option<String>,
    },
    WhenFormSubmitted {
        form_id: String,
    },
    WhenDurationPasses {
        duration: f64,
        unit: DurationUnit,
    },
    ManualButton {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    MultiBranch {
        branches: Vec<DispatchBranch>,
    },
    Compound {
        operator: LogicalOperator,
        conditions: Vec<AdvancementCondition>,
    },
    /// Unknown or malformed condition, kept by its type name.
    #[serde(untagged)]
    Other {
        #[serde(rename = "type")]
        condition_type: String,
    },
}

impl AdvancementCondition {
    pub fn type_name(&self) -> &str {
        match self {
            AdvancementCondition::Automatic => "automatic",
            AdvancementCondition::WhenTaskCompleted { .. } => "when_task_completed",
            AdvancementCondition::WhenTasksCompleted { .. } => "when_tasks_completed",
            AdvancementCondition::WhenApproved { .. } => "when_approved",
            AdvancementCondition::WhenFormSubmitted { .. } => "when_form_submitted",
            AdvancementCondition::WhenDurationPasses { .. } => "when_duration_passes",
            AdvancementCondition::ManualButton { .. } => "manual_button",
            AdvancementCondition::MultiBranch { .. } => "multi_branch",
            AdvancementCondition::Compound { .. } => "compound",
            AdvancementCondition::Other { condition_type } => condition_type,
        }
    }
}

/// A step that performs actions and then advances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardStep {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub actions: Vec<WorkflowAction>,
    #[serde(default)]
    pub advancement: AdvancementCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StandardStep {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            actions: Vec::new(),
            advancement: AdvancementCondition::Automatic,
            phase_id: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
    #[serde(untagged)]
    Other(String),
}

impl BranchOperator {
    pub fn as_str(&self) -> &str {
        match self {
            BranchOperator::Equals => "equals",
            BranchOperator::NotEquals => "not_equals",
            BranchOperator::Contains => "contains",
            BranchOperator::GreaterThan => "greater_than",
            BranchOperator::LessThan => "less_than",
            BranchOperator::IsEmpty => "is_empty",
            BranchOperator::IsNotEmpty => "is_not_empty",
            BranchOperator::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchCondition {
    pub variable_ref: String,
    pub operator: BranchOperator,
    #[serde(default)]
    pub compare_value: Value,
}

/// One of the two step sequences inside a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchTrack {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StandardStep>,
}

/// Binary split into two tracks. Branches perform no actions themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchStep {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub condition: BranchCondition,
    #[serde(default)]
    pub tracks: Vec<BranchTrack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BranchStep {
    pub fn track(&self, track_id: &str) -> Option<&BranchTrack> {
        self.tracks.iter().find(|track| track.id == track_id)
    }

    pub fn track_mut(&mut self, track_id: &str) -> Option<&mut BranchTrack> {
        self.tracks.iter_mut().find(|track| track.id == track_id)
    }
}

/// Top-level entry of an authoring document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthoringStep {
    Standard(StandardStep),
    Branch(BranchStep),
}

impl AuthoringStep {
    pub fn id(&self) -> &str {
        match self {
            AuthoringStep::Standard(step) => &step.id,
            AuthoringStep::Branch(branch) => &branch.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AuthoringStep::Standard(step) => &step.name,
            AuthoringStep::Branch(branch) => &branch.name,
        }
    }

    pub fn as_standard(&self) -> Option<&StandardStep> {
        match self {
            AuthoringStep::Standard(step) => Some(step),
            AuthoringStep::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&BranchStep> {
        match self {
            AuthoringStep::Branch(branch) => Some(branch),
            AuthoringStep::Standard(_) => None,
        }
    }

    pub fn as_branch_mut(&mut self) -> Option<&mut BranchStep> {
        match self {
            AuthoringStep::Branch(branch) => Some(branch),
            AuthoringStep::Standard(_) => None,
        }
    }
}

impl From<StandardStep> for AuthoringStep {
    fn from(step: StandardStep) -> Self {
        AuthoringStep::Standard(step)
    }
}

impl From<BranchStep> for AuthoringStep {
    fn from(branch: BranchStep) -> Self {
        AuthoringStep::Branch(branch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    Contact,
    Task,
    Form,
    Custom,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Text,
    Number,
    Date,
    Boolean,
    Email,
    Phone,
    Url,
}

/// Where a variable's value comes from at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum VariableSource {
    Trigger,
    ActionOutput {
        action_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_key: Option<String>,
    },
    Custom {
        value: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableField {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowVariable {
    pub id: String,
    pub name: String,
    pub variable_type: VariableType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    pub source: VariableSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<VariableField>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    pub id: String,
    pub name: String,
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPhase {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Editable authoring document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: String,
    #[serde(default)]
    pub metadata: WorkflowMetadata,
    #[serde(default)]
    pub trigger: WorkflowTrigger,
    #[serde(default)]
    pub steps: Vec<AuthoringStep>,
    #[serde(default)]
    pub phases: Vec<WorkflowPhase>,
    #[serde(default)]
    pub statuses: Vec<WorkflowStatus>,
    #[serde(default)]
    pub variables: Vec<WorkflowVariable>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            metadata: WorkflowMetadata {
                name: name.into(),
                ..WorkflowMetadata::default()
            },
            trigger: WorkflowTrigger::default(),
            steps: Vec::new(),
            phases: Vec::new(),
            statuses: Vec::new(),
            variables: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&AuthoringStep> {
        self.steps.iter().find(|step| step.id() == step_id)
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(AuthoringStep::id).collect()
    }
}
