//! Task records
//!
//! A Task is one durable unit of pipeline work with a typed status
//! lifecycle. The kind is serialized as a `type` tag on the document, so
//! the consumer can route by tag and leave documents with unknown tags
//! untouched for operator investigation.

use std::collections::HashMap;

use docstore::{Filter, IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::generate_id;

/// Task type tag for plan generation
pub const TYPE_GENERATE_CAMPAIGN_PLAN: &str = "generate_campaign_plan";

/// Task type tag for campaign publication
pub const TYPE_CREATE_YEKTANET_CAMPAIGN: &str = "create_yektanet_campaign";

/// Task status
///
/// Legal edges per kind:
///
/// `generate_campaign_plan`:
/// new -> pending_confirm | failed; pending_confirm -> confirmed |
/// retry_with_feedback (human edge); retry_with_feedback ->
/// pending_confirm | failed; confirmed -> completed.
///
/// `create_yektanet_campaign`:
/// new -> create_ads | failed; create_ads -> create_ads | completed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Just enqueued, no work performed yet
    #[default]
    New,
    /// Plan drafted, parked until a human approves or rejects
    PendingConfirm,
    /// Rejected with feedback, awaiting a planner revision pass
    RetryWithFeedback,
    /// Approved by a human, downstream work not yet enqueued
    Confirmed,
    /// Campaign exists on the platform, ads still being created
    CreateAds,
    /// Terminal success
    Completed,
    /// Terminal failure, surfaced for manual intervention
    Failed,
}

impl TaskStatus {
    /// Terminal states are absorbing: no handler transitions past them
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Wait states depend on external (human) action and must never be
    /// selected by the consumer loop
    pub fn is_wait(self) -> bool {
        matches!(self, Self::PendingConfirm)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::PendingConfirm => write!(f, "pending_confirm"),
            Self::RetryWithFeedback => write!(f, "retry_with_feedback"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::CreateAds => write!(f, "create_ads"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Kind-specific task payload, tagged with `type` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    /// Draft a CampaignPlan for a stored CampaignRequest
    GenerateCampaignPlan {
        campaign_request_id: String,
        /// Set once the planner has produced a plan; the same plan is
        /// revised in place across feedback rounds
        campaign_plan_id: Option<String>,
        /// Reviewer rejections, append-only, in submission order
        #[serde(default)]
        feedbacks: Vec<String>,
    },
    /// Publish a confirmed CampaignPlan to Yektanet
    CreateYektanetCampaign {
        campaign_plan_id: String,
        campaign_request_id: String,
        /// Server-assigned campaign id, recorded the moment creation succeeds
        created_campaign_id: Option<i64>,
        /// Ad ids already confirmed created on the platform
        #[serde(default)]
        created_ads: Vec<i64>,
        /// Failed create_ads passes so far; the 6th failure is fatal
        #[serde(default)]
        retry_count: u32,
    },
}

impl TaskKind {
    /// The wire tag for this kind
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::GenerateCampaignPlan { .. } => TYPE_GENERATE_CAMPAIGN_PLAN,
            Self::CreateYektanetCampaign { .. } => TYPE_CREATE_YEKTANET_CAMPAIGN,
        }
    }
}

/// One durable unit of pipeline work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,

    /// Correlates the task to a CampaignRequest / conversation
    pub session_id: String,

    /// Human-readable summary, shown in listings and failure reports
    pub description: String,

    /// Current status; transitions only via the documented edges
    pub status: TaskStatus,

    /// Kind payload; the `type` tag is immutable after creation
    #[serde(flatten)]
    pub kind: TaskKind,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Task {
    /// Enqueue-ready plan-generation task for a stored request
    pub fn generate_campaign_plan(
        session_id: impl Into<String>,
        campaign_request_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        debug!(%session_id, "Task::generate_campaign_plan: called");
        let now = now_ms();
        Self {
            id: generate_id("task", TYPE_GENERATE_CAMPAIGN_PLAN),
            session_id,
            description: description.into(),
            status: TaskStatus::New,
            kind: TaskKind::GenerateCampaignPlan {
                campaign_request_id: campaign_request_id.into(),
                campaign_plan_id: None,
                feedbacks: Vec::new(),
            },
            created_at: now,
            updated_at: now,
        }
    }

    /// Enqueue-ready publication task for a confirmed plan
    pub fn create_yektanet_campaign(
        session_id: impl Into<String>,
        campaign_plan_id: impl Into<String>,
        campaign_request_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        debug!(%session_id, "Task::create_yektanet_campaign: called");
        let now = now_ms();
        Self {
            id: generate_id("task", TYPE_CREATE_YEKTANET_CAMPAIGN),
            session_id,
            description: description.into(),
            status: TaskStatus::New,
            kind: TaskKind::CreateYektanetCampaign {
                campaign_plan_id: campaign_plan_id.into(),
                campaign_request_id: campaign_request_id.into(),
                created_campaign_id: None,
                created_ads: Vec::new(),
                retry_count: 0,
            },
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the status
    pub fn set_status(&mut self, status: TaskStatus) {
        debug!(%self.id, from = %self.status, to = %status, "Task::set_status: called");
        self.status = status;
        self.updated_at = now_ms();
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append a reviewer feedback (plan-generation tasks only)
    ///
    /// Returns false if this task kind carries no feedback list.
    pub fn append_feedback(&mut self, feedback: impl Into<String>) -> bool {
        match &mut self.kind {
            TaskKind::GenerateCampaignPlan { feedbacks, .. } => {
                feedbacks.push(feedback.into());
                self.updated_at = now_ms();
                true
            }
            TaskKind::CreateYektanetCampaign { .. } => false,
        }
    }

    /// Filter selecting tasks the consumer loop may claim: everything
    /// outside the terminal/wait set
    pub fn eligibility_filter() -> Filter {
        Filter::not_in(
            "status",
            vec![
                IndexValue::from(TaskStatus::Completed.to_string()),
                IndexValue::from(TaskStatus::Failed.to_string()),
                IndexValue::from(TaskStatus::PendingConfirm.to_string()),
            ],
        )
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "tasks"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), IndexValue::String(self.status.to_string()));
        fields.insert("type".to_string(), IndexValue::String(self.kind.type_name().to_string()));
        fields.insert("session_id".to_string(), IndexValue::String(self.session_id.clone()));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generate_task() {
        let task = Task::generate_campaign_plan("sess-1", "req-1", "plan for cafe");
        assert_eq!(task.status, TaskStatus::New);
        assert!(task.id.contains("-task-"));
        assert_eq!(task.kind.type_name(), TYPE_GENERATE_CAMPAIGN_PLAN);
        match &task.kind {
            TaskKind::GenerateCampaignPlan {
                campaign_request_id,
                campaign_plan_id,
                feedbacks,
            } => {
                assert_eq!(campaign_request_id, "req-1");
                assert!(campaign_plan_id.is_none());
                assert!(feedbacks.is_empty());
            }
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn test_type_tag_serialization() {
        let task = Task::generate_campaign_plan("sess-1", "req-1", "d");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "generate_campaign_plan");
        assert_eq!(json["status"], "new");

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_unknown_type_fails_deserialization() {
        let json = serde_json::json!({
            "id": "x-task-1",
            "session_id": "s",
            "description": "d",
            "status": "new",
            "type": "reticulate_splines",
            "created_at": 0,
            "updated_at": 0,
        });
        assert!(serde_json::from_value::<Task>(json).is_err());
    }

    #[test]
    fn test_terminal_and_wait_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::New.is_terminal());
        assert!(TaskStatus::PendingConfirm.is_wait());
        assert!(!TaskStatus::CreateAds.is_wait());
    }

    #[test]
    fn test_append_feedback_order() {
        let mut task = Task::generate_campaign_plan("sess-1", "req-1", "d");
        assert!(task.append_feedback("budget too high"));
        assert!(task.append_feedback("wrong audience"));
        match &task.kind {
            TaskKind::GenerateCampaignPlan { feedbacks, .. } => {
                assert_eq!(feedbacks, &["budget too high", "wrong audience"]);
            }
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn test_append_feedback_rejected_for_publication_task() {
        let mut task = Task::create_yektanet_campaign("sess-1", "plan-1", "req-1", "d");
        assert!(!task.append_feedback("nope"));
    }

    #[test]
    fn test_indexed_fields() {
        let task = Task::create_yektanet_campaign("sess-9", "plan-1", "req-1", "d");
        let fields = task.indexed_fields();
        assert_eq!(fields.get("status"), Some(&IndexValue::String("new".to_string())));
        assert_eq!(
            fields.get("type"),
            Some(&IndexValue::String("create_yektanet_campaign".to_string()))
        );
        assert_eq!(fields.get("session_id"), Some(&IndexValue::String("sess-9".to_string())));
    }

    #[test]
    fn test_status_display_roundtrip() {
        for status in [
            TaskStatus::New,
            TaskStatus::PendingConfirm,
            TaskStatus::RetryWithFeedback,
            TaskStatus::Confirmed,
            TaskStatus::CreateAds,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let s = serde_json::to_string(&status).unwrap();
            assert_eq!(s.trim_matches('"'), status.to_string());
        }
    }
}
