use crate::types::{Priority, WorkItemKind, WorkItemStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Synthetic id used for the portfolio/brief bucket of items without one.
pub const UNASSIGNED: &str = "unassigned";

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

fn string_or_null<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// The list APIs send acceptance criteria either as an array or as a
/// JSON-encoded string holding that array.
fn criteria<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Encoded(String),
    }

    match Option::<Raw>::deserialize(d)? {
        None => Ok(Vec::new()),
        Some(Raw::List(v)) => Ok(v),
        Some(Raw::Encoded(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Raw::Encoded(s)) => match serde_json::from_str::<Vec<String>>(&s) {
            Ok(v) => Ok(v),
            // A plain sentence is a single criterion, not a decode failure.
            Err(_) => Ok(vec![s]),
        },
    }
}

/// Normalize an optional foreign key: blank and the synthetic bucket id both
/// mean "no reference".
pub fn normalize_ref(value: Option<&str>) -> Option<&str> {
    match value.map(str::trim) {
        None | Some("") => None,
        Some(v) if v == UNASSIGNED => None,
        Some(v) => Some(v),
    }
}

// ---------------------------------------------------------------------------
// WorkItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: String,
    /// Stamped from the owning collection on insert; payloads rarely carry it.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: WorkItemKind,
    #[serde(default, deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: WorkItemStatus,
    #[serde(default, alias = "portfolio_id", skip_serializing_if = "Option::is_none")]
    pub portfolio_id: Option<String>,
    #[serde(
        default,
        alias = "business_brief_id",
        deserialize_with = "string_or_null"
    )]
    pub business_brief_id: String,
    #[serde(default, alias = "initiative_id", skip_serializing_if = "Option::is_none")]
    pub initiative_id: Option<String>,
    #[serde(default, alias = "feature_id", skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(default, alias = "epic_id", skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<String>,
    #[serde(
        default,
        alias = "acceptance_criteria",
        deserialize_with = "criteria",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, alias = "business_value", skip_serializing_if = "Option::is_none")]
    pub business_value: Option<String>,
    #[serde(default, alias = "story_points", skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_kind() -> WorkItemKind {
    WorkItemKind::Initiative
}

impl WorkItem {
    pub fn new(kind: WorkItemKind, id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            status: WorkItemStatus::default(),
            portfolio_id: None,
            business_brief_id: String::new(),
            initiative_id: None,
            feature_id: None,
            epic_id: None,
            acceptance_criteria: Vec::new(),
            business_value: None,
            story_points: None,
            labels: Vec::new(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// A fresh id such as `feature-1f0c9a2e`.
    pub fn generate_id(kind: WorkItemKind) -> String {
        let short = uuid::Uuid::new_v4().simple().to_string();
        let short = short.get(..8).unwrap_or(&short);
        format!("{}-{short}", kind.as_str())
    }

    pub fn with_brief(mut self, brief_id: impl Into<String>) -> Self {
        self.business_brief_id = brief_id.into();
        self
    }

    pub fn with_portfolio(mut self, portfolio_id: impl Into<String>) -> Self {
        self.portfolio_id = Some(portfolio_id.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the kind-appropriate parent reference. No-op for initiatives.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.set_parent_ref(Some(parent_id.into()));
        self
    }

    /// The foreign key naming this item's direct parent, if it has a usable one.
    pub fn parent_ref(&self) -> Option<&str> {
        let raw = match self.kind {
            WorkItemKind::Initiative => None,
            WorkItemKind::Feature => self.initiative_id.as_deref(),
            WorkItemKind::Epic => self.feature_id.as_deref(),
            WorkItemKind::Story => self.epic_id.as_deref(),
        };
        normalize_ref(raw)
    }

    pub fn set_parent_ref(&mut self, parent_id: Option<String>) {
        match self.kind {
            WorkItemKind::Initiative => {}
            WorkItemKind::Feature => self.initiative_id = parent_id,
            WorkItemKind::Epic => self.feature_id = parent_id,
            WorkItemKind::Story => self.epic_id = parent_id,
        }
        self.updated_at = Some(Utc::now());
    }

    pub fn effective_brief_id(&self) -> &str {
        normalize_ref(Some(self.business_brief_id.as_str())).unwrap_or(UNASSIGNED)
    }

    pub fn effective_portfolio_id(&self) -> &str {
        normalize_ref(self.portfolio_id.as_deref()).unwrap_or(UNASSIGNED)
    }
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Portfolio {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            function: None,
            color: None,
        }
    }
}

// ---------------------------------------------------------------------------
// BusinessBrief
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    Gold,
    Silver,
    Bronze,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessBrief {
    pub id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default)]
    pub status: WorkItemStatus,
    #[serde(default, alias = "portfolio_id", skip_serializing_if = "Option::is_none")]
    pub portfolio_id: Option<String>,
    #[serde(default, alias = "quality_score", skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f32>,
    #[serde(default, alias = "quality_grade", skip_serializing_if = "Option::is_none")]
    pub quality_grade: Option<QualityGrade>,
}

impl BusinessBrief {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: WorkItemStatus::Draft,
            portfolio_id: None,
            quality_score: None,
            quality_grade: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
