use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Lenient parse: upstream generators emit free-form casing and
    /// occasionally unknown values, which are treated as medium.
    pub fn parse_lenient(s: &str) -> Priority {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            "critical" => Priority::Critical,
            _ => Priority::Medium,
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::parse_lenient(&s)
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkItemStatus
// ---------------------------------------------------------------------------

/// Lifecycle status shared by work items and business briefs.
///
/// Unknown strings are preserved in `Other` so a round trip through the
/// store never loses what the backing API sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkItemStatus {
    #[default]
    Backlog,
    Planned,
    InProgress,
    Completed,
    Draft,
    Submitted,
    InReview,
    Approved,
    Rejected,
    Active,
    OnHold,
    Cancelled,
    Other(String),
}

impl WorkItemStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkItemStatus::Backlog => "backlog",
            WorkItemStatus::Planned => "planned",
            WorkItemStatus::InProgress => "in_progress",
            WorkItemStatus::Completed => "completed",
            WorkItemStatus::Draft => "draft",
            WorkItemStatus::Submitted => "submitted",
            WorkItemStatus::InReview => "in_review",
            WorkItemStatus::Approved => "approved",
            WorkItemStatus::Rejected => "rejected",
            WorkItemStatus::Active => "active",
            WorkItemStatus::OnHold => "on-hold",
            WorkItemStatus::Cancelled => "cancelled",
            WorkItemStatus::Other(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> WorkItemStatus {
        match s.trim().to_ascii_lowercase().as_str() {
            "backlog" => WorkItemStatus::Backlog,
            "planned" => WorkItemStatus::Planned,
            "in_progress" | "in-progress" => WorkItemStatus::InProgress,
            "completed" | "done" => WorkItemStatus::Completed,
            "draft" => WorkItemStatus::Draft,
            "submitted" => WorkItemStatus::Submitted,
            "in_review" | "in-review" => WorkItemStatus::InReview,
            "approved" => WorkItemStatus::Approved,
            "rejected" => WorkItemStatus::Rejected,
            "active" => WorkItemStatus::Active,
            "on-hold" | "on_hold" => WorkItemStatus::OnHold,
            "cancelled" | "canceled" => WorkItemStatus::Cancelled,
            _ => WorkItemStatus::Other(s.to_string()),
        }
    }
}

impl From<String> for WorkItemStatus {
    fn from(s: String) -> Self {
        WorkItemStatus::parse(&s)
    }
}

impl From<WorkItemStatus> for String {
    fn from(s: WorkItemStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkItemKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    Initiative,
    Feature,
    Epic,
    Story,
}

impl WorkItemKind {
    pub fn all() -> &'static [WorkItemKind] {
        &[
            WorkItemKind::Initiative,
            WorkItemKind::Feature,
            WorkItemKind::Epic,
            WorkItemKind::Story,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkItemKind::Initiative => "initiative",
            WorkItemKind::Feature => "feature",
            WorkItemKind::Epic => "epic",
            WorkItemKind::Story => "story",
        }
    }

    /// Plural name used for collection files and list endpoints.
    pub fn collection(self) -> &'static str {
        match self {
            WorkItemKind::Initiative => "initiatives",
            WorkItemKind::Feature => "features",
            WorkItemKind::Epic => "epics",
            WorkItemKind::Story => "stories",
        }
    }

    pub fn parent_kind(self) -> Option<WorkItemKind> {
        match self {
            WorkItemKind::Initiative => None,
            WorkItemKind::Feature => Some(WorkItemKind::Initiative),
            WorkItemKind::Epic => Some(WorkItemKind::Feature),
            WorkItemKind::Story => Some(WorkItemKind::Epic),
        }
    }

    pub fn child_kind(self) -> Option<WorkItemKind> {
        match self {
            WorkItemKind::Initiative => Some(WorkItemKind::Feature),
            WorkItemKind::Feature => Some(WorkItemKind::Epic),
            WorkItemKind::Epic => Some(WorkItemKind::Story),
            WorkItemKind::Story => None,
        }
    }
}

impl fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkItemKind {
    type Err = crate::error::AuraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiative" | "initiatives" => Ok(WorkItemKind::Initiative),
            "feature" | "features" => Ok(WorkItemKind::Feature),
            "epic" | "epics" => Ok(WorkItemKind::Epic),
            "story" | "stories" => Ok(WorkItemKind::Story),
            _ => Err(crate::error::AuraError::InvalidKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowStage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    #[default]
    Table,
    Config,
    Generated,
}

impl WorkflowStage {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::Table => "table",
            WorkflowStage::Config => "config",
            WorkflowStage::Generated => "generated",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_parent_child_chain() {
        assert_eq!(WorkItemKind::Initiative.parent_kind(), None);
        assert_eq!(
            WorkItemKind::Story.parent_kind(),
            Some(WorkItemKind::Epic)
        );
        assert_eq!(
            WorkItemKind::Feature.child_kind(),
            Some(WorkItemKind::Epic)
        );
        assert_eq!(WorkItemKind::Story.child_kind(), None);
    }

    #[test]
    fn kind_accepts_singular_and_plural() {
        assert_eq!(
            WorkItemKind::from_str("stories").unwrap(),
            WorkItemKind::Story
        );
        assert_eq!(
            WorkItemKind::from_str("epic").unwrap(),
            WorkItemKind::Epic
        );
        assert!(WorkItemKind::from_str("task").is_err());
    }

    #[test]
    fn priority_is_lenient() {
        assert_eq!(Priority::parse_lenient("HIGH"), Priority::High);
        assert_eq!(Priority::parse_lenient(" critical "), Priority::Critical);
        assert_eq!(Priority::parse_lenient("urgent"), Priority::Medium);
        let p: Priority = serde_json::from_str("\"Low\"").unwrap();
        assert_eq!(p, Priority::Low);
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    }

    #[test]
    fn status_preserves_unknown_values() {
        let s: WorkItemStatus = serde_json::from_str("\"blocked-by-legal\"").unwrap();
        assert_eq!(s, WorkItemStatus::Other("blocked-by-legal".into()));
        assert_eq!(
            serde_json::to_string(&s).unwrap(),
            "\"blocked-by-legal\""
        );
        assert_eq!(WorkItemStatus::parse("done"), WorkItemStatus::Completed);
        assert_eq!(WorkItemStatus::parse("in-progress"), WorkItemStatus::InProgress);
    }
}
