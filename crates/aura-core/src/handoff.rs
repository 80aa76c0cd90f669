//! One-shot hand-off of a selected work item between views.
//!
//! The sender writes the item and an auto-advance flag; the receiver takes
//! them, and taking always deletes every hand-off key so a later visit never
//! replays a stale selection.

use crate::error::Result;
use crate::generation::compose_auto_prompt;
use crate::io;
use crate::work_item::WorkItem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const SELECTED_ITEM_KEY: &str = "selectedWorkItem";
pub const SELECTED_TAB_KEY: &str = "selectedWorkItemTab";
pub const AUTO_ADVANCE_KEY: &str = "designAutoAdvance";
pub const WORK_ITEM_TAB: &str = "work-item";

const HANDOFF_KEYS: [&str; 3] = [SELECTED_ITEM_KEY, SELECTED_TAB_KEY, AUTO_ADVANCE_KEY];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffPayload {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub business_brief_id: String,
    #[serde(default)]
    pub portfolio_id: String,
}

impl HandoffPayload {
    pub fn from_work_item(item: &WorkItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            kind: item.kind.as_str().to_string(),
            priority: item.priority.as_str().to_string(),
            status: item.status.as_str().to_string(),
            business_brief_id: item.business_brief_id.clone(),
            portfolio_id: item.portfolio_id.clone().unwrap_or_default(),
        }
    }

    pub fn auto_prompt(&self) -> String {
        compose_auto_prompt(&self.title, &self.description, &self.priority, &self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub payload: HandoffPayload,
    pub auto_advance: bool,
}

/// String key/value session store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandoffStore {
    entries: BTreeMap<String, String>,
}

impl HandoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML map; a missing or empty file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) if s.trim().is_empty() => Ok(Self::default()),
            Ok(s) => Ok(serde_yaml::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(path, data.as_bytes())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn put_selection(&mut self, payload: &HandoffPayload, auto_advance: bool) -> Result<()> {
        self.set(SELECTED_ITEM_KEY, serde_json::to_string(payload)?);
        self.set(SELECTED_TAB_KEY, WORK_ITEM_TAB);
        if auto_advance {
            self.set(AUTO_ADVANCE_KEY, "true");
        } else {
            self.remove(AUTO_ADVANCE_KEY);
        }
        Ok(())
    }

    /// Read and clear the hand-off. Malformed data is logged and discarded.
    pub fn take_selection(&mut self) -> Option<Handoff> {
        let [raw, tab, flag] = HANDOFF_KEYS.map(|k| self.remove(k));
        let raw = raw?;
        let payload: HandoffPayload = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed hand-off");
                return None;
            }
        };
        let auto_advance = tab.as_deref() == Some(WORK_ITEM_TAB) && flag.as_deref() == Some("true");
        Some(Handoff {
            payload,
            auto_advance,
        })
    }
}
