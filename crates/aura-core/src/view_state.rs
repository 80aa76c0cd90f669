//! Expansion, selection and the table → config → generated workflow.

use crate::error::{AuraError, Result};
use crate::generation::DesignCode;
use crate::handoff::HandoffPayload;
use crate::hierarchy::{Node, Tree};
use crate::store::Snapshot;
use crate::types::{WorkItemKind, WorkflowStage};
use crate::work_item::{normalize_ref, UNASSIGNED};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub fn portfolio_key(id: &str) -> String {
    format!("portfolio-{id}")
}

pub fn brief_key(id: &str) -> String {
    format!("brief-{id}")
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// Open/closed flags per node key. Closing an ancestor hides open
/// descendants without clearing their flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionState {
    open: BTreeSet<String>,
    #[serde(default)]
    auto_expanded: bool,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one node. Returns the new open state.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.open.remove(key) {
            false
        } else {
            self.open.insert(key.to_string());
            true
        }
    }

    pub fn is_open(&self, key: &str) -> bool {
        self.open.contains(key)
    }

    pub fn open(&mut self, key: impl Into<String>) {
        self.open.insert(key.into());
    }

    pub fn close(&mut self, key: &str) {
        self.open.remove(key);
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.open.iter().map(String::as_str)
    }

    /// Open every group and every node that has children.
    pub fn open_all(&mut self, tree: &Tree) {
        fn walk(node: &Node, open: &mut BTreeSet<String>) {
            if node.has_children() {
                open.insert(node.item.id.clone());
            }
            for child in &node.children {
                walk(child, open);
            }
        }
        for p in &tree.portfolios {
            self.open.insert(portfolio_key(&p.key));
            for b in &p.briefs {
                self.open.insert(brief_key(&b.key));
                for n in &b.initiatives {
                    walk(n, &mut self.open);
                }
            }
        }
    }

    /// Pre-open the first `limit` distinct portfolio ids referenced by
    /// initiatives plus the unassigned buckets. Fires at most once, and only
    /// while nothing is open and there are initiatives to show.
    pub fn auto_expand(&mut self, snapshot: &Snapshot, limit: usize) -> bool {
        if self.auto_expanded || !self.open.is_empty() || snapshot.initiatives.is_empty() {
            return false;
        }
        self.auto_expanded = true;

        let mut seen: Vec<&str> = Vec::new();
        for init in &snapshot.initiatives {
            if seen.len() >= limit {
                break;
            }
            if let Some(id) = normalize_ref(init.portfolio_id.as_deref()) {
                if !seen.contains(&id) {
                    seen.push(id);
                }
            }
        }
        for id in seen {
            self.open.insert(portfolio_key(id));
        }
        self.open.insert(brief_key(UNASSIGNED));
        self.open.insert(portfolio_key(UNASSIGNED));
        tracing::debug!(open = self.open.len(), "auto-expanded tree");
        true
    }
}

// ---------------------------------------------------------------------------
// Visible rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Portfolio,
    Brief,
    Item(WorkItemKind),
}

/// One line of the rendered tree.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    pub depth: usize,
    pub kind: RowKind,
    /// Expansion key for groups, item id for work items.
    pub key: String,
    pub label: &'a str,
    pub child_count: usize,
    pub open: bool,
    pub node: Option<&'a Node>,
    /// Colour configured on the portfolio, for portfolio rows.
    pub portfolio_color: Option<&'a str>,
}

impl Row<'_> {
    pub fn color(&self) -> &str {
        crate::badges::type_color(self.kind, self.portfolio_color)
    }
}

/// Flatten the tree into the rows currently visible under `expansion`.
pub fn visible_rows<'a>(tree: &'a Tree, expansion: &ExpansionState) -> Vec<Row<'a>> {
    fn push_node<'a>(
        node: &'a Node,
        depth: usize,
        expansion: &ExpansionState,
        rows: &mut Vec<Row<'a>>,
    ) {
        let open = node.has_children() && expansion.is_open(&node.item.id);
        rows.push(Row {
            depth,
            kind: RowKind::Item(node.item.kind),
            key: node.item.id.clone(),
            label: &node.item.title,
            child_count: node.child_count(),
            open,
            node: Some(node),
            portfolio_color: None,
        });
        if open {
            for child in &node.children {
                push_node(child, depth + 1, expansion, rows);
            }
        }
    }

    let mut rows = Vec::new();
    for p in &tree.portfolios {
        let pkey = portfolio_key(&p.key);
        let p_open = expansion.is_open(&pkey);
        rows.push(Row {
            depth: 0,
            kind: RowKind::Portfolio,
            key: pkey,
            label: p.label(),
            child_count: p.briefs.len(),
            open: p_open,
            node: None,
            portfolio_color: p.color(),
        });
        if !p_open {
            continue;
        }
        for b in &p.briefs {
            let bkey = brief_key(&b.key);
            let b_open = expansion.is_open(&bkey);
            rows.push(Row {
                depth: 1,
                kind: RowKind::Brief,
                key: bkey,
                label: b.label(),
                child_count: b.initiatives.len(),
                open: b_open,
                node: None,
                portfolio_color: None,
            });
            if !b_open {
                continue;
            }
            for n in &b.initiatives {
                push_node(n, 2, expansion, &mut rows);
            }
        }
    }
    rows
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// At most one selected work item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    selected: Option<String>,
}

impl SelectionState {
    pub fn select(&mut self, id: impl Into<String>) {
        self.selected = Some(id.into());
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Toggled { open: bool },
    Selected,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowSession {
    stage: WorkflowStage,
    pub expansion: ExpansionState,
    selection: SelectionState,
    generated: Option<DesignCode>,
    saved_designs: BTreeMap<String, DesignCode>,
    prompt: String,
}

impl WorkflowSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn selected(&self) -> Option<&str> {
        self.selection.selected()
    }

    pub fn generated(&self) -> Option<&DesignCode> {
        self.generated.as_ref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn saved_design(&self, id: &str) -> Option<&DesignCode> {
        self.saved_designs.get(id)
    }

    pub fn has_saved_design(&self, id: &str) -> bool {
        self.saved_designs.contains_key(id)
    }

    pub fn saved_ids(&self) -> impl Iterator<Item = &str> {
        self.saved_designs.keys().map(String::as_str)
    }

    pub fn select(&mut self, id: impl Into<String>) {
        self.selection.select(id);
    }

    /// Nodes with children toggle; leaves select.
    pub fn click(&mut self, node: &Node) -> ClickOutcome {
        if node.has_children() {
            let open = self.expansion.toggle(&node.item.id);
            ClickOutcome::Toggled { open }
        } else {
            self.selection.select(node.item.id.clone());
            ClickOutcome::Selected
        }
    }

    fn transition(&mut self, to: WorkflowStage, allowed: &[WorkflowStage], reason: &str) -> Result<()> {
        if !allowed.contains(&self.stage) {
            return Err(AuraError::InvalidTransition {
                from: self.stage.to_string(),
                to: to.to_string(),
                reason: reason.to_string(),
            });
        }
        self.stage = to;
        Ok(())
    }

    pub fn advance_to_config(&mut self) -> Result<()> {
        if self.selection.selected().is_none() {
            return Err(AuraError::InvalidTransition {
                from: self.stage.to_string(),
                to: WorkflowStage::Config.to_string(),
                reason: "no work item selected".into(),
            });
        }
        self.transition(
            WorkflowStage::Config,
            &[WorkflowStage::Table, WorkflowStage::Config],
            "config follows the table stage",
        )
    }

    pub fn complete_generation(&mut self, payload: DesignCode) -> Result<()> {
        self.transition(
            WorkflowStage::Generated,
            &[WorkflowStage::Config],
            "generation runs from the config stage",
        )?;
        self.generated = Some(payload);
        Ok(())
    }

    /// Return to the table, dropping the selection and any generated payload.
    pub fn back(&mut self) {
        self.stage = WorkflowStage::Table;
        self.selection.clear();
        self.generated = None;
    }

    /// Store the generated design under the selected item, then go back.
    pub fn save_design(&mut self) -> Result<String> {
        let (Some(id), Some(code)) = (self.selection.selected(), self.generated.as_ref()) else {
            return Err(AuraError::InvalidTransition {
                from: self.stage.to_string(),
                to: WorkflowStage::Table.to_string(),
                reason: "nothing generated to save".into(),
            });
        };
        let id = id.to_string();
        self.saved_designs.insert(id.clone(), code.clone());
        self.back();
        Ok(id)
    }

    pub fn view_saved(&mut self, id: &str) -> Result<&DesignCode> {
        let Some(code) = self.saved_designs.get(id).cloned() else {
            return Err(AuraError::InvalidTransition {
                from: self.stage.to_string(),
                to: WorkflowStage::Generated.to_string(),
                reason: format!("no saved design for '{id}'"),
            });
        };
        self.selection.select(id);
        self.stage = WorkflowStage::Generated;
        Ok(self.generated.insert(code))
    }

    /// Apply a hand-off from another page. With auto-advance the session
    /// jumps to config and returns the pre-filled prompt.
    pub fn accept_handoff(&mut self, payload: &HandoffPayload, auto_advance: bool) -> Result<Option<String>> {
        self.selection.select(payload.id.clone());
        if !auto_advance {
            return Ok(None);
        }
        self.stage = WorkflowStage::Config;
        self.prompt = payload.auto_prompt();
        Ok(Some(self.prompt.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
