//! Groups the flat work-item collections into
//! `Portfolio → BusinessBrief → Initiative → Feature → Epic → Story`.
//!
//! Parent links are resolved in two passes per level. An explicit foreign key
//! always wins. Only children whose own key is empty fall back to the first
//! parent (in source order) sharing their business brief. Each child is
//! claimed at most once, and children that match nothing are kept in
//! [`Tree::orphans`] instead of being dropped.
//!
//! The tree is rebuilt from the current collections on every call; no
//! placement survives a data change.

use crate::store::Snapshot;
use crate::types::WorkItemKind;
use crate::work_item::{BusinessBrief, Portfolio, WorkItem, UNASSIGNED};
use serde::Serialize;
use std::collections::HashMap;

pub const UNASSIGNED_PORTFOLIO_LABEL: &str = "Unassigned Portfolio";
pub const UNASSIGNED_BRIEF_LABEL: &str = "Unassigned Brief";

// ---------------------------------------------------------------------------
// Tree types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub item: WorkItem,
    pub children: Vec<Node>,
}

impl Node {
    fn leaf(item: WorkItem) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.item.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefGroup {
    /// Brief id, or `"unassigned"`.
    pub key: String,
    pub brief: Option<BusinessBrief>,
    pub initiatives: Vec<Node>,
}

impl BriefGroup {
    pub fn label(&self) -> &str {
        match &self.brief {
            Some(b) if !b.title.is_empty() => &b.title,
            Some(b) => &b.id,
            None => UNASSIGNED_BRIEF_LABEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioGroup {
    /// Portfolio id, or `"unassigned"`.
    pub key: String,
    pub portfolio: Option<Portfolio>,
    pub briefs: Vec<BriefGroup>,
}

impl PortfolioGroup {
    /// A lookup miss renders as the unassigned placeholder too.
    pub fn label(&self) -> &str {
        match &self.portfolio {
            Some(p) if !p.name.is_empty() => &p.name,
            Some(p) => &p.id,
            None => UNASSIGNED_PORTFOLIO_LABEL,
        }
    }

    pub fn color(&self) -> Option<&str> {
        self.portfolio.as_ref().and_then(|p| p.color.as_deref())
    }

    pub fn initiative_count(&self) -> usize {
        self.briefs.iter().map(|b| b.initiatives.len()).sum()
    }
}

/// Children that no parent claimed, with whatever subtrees they own.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Orphans {
    pub features: Vec<Node>,
    pub epics: Vec<Node>,
    pub stories: Vec<Node>,
}

impl Orphans {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.epics.is_empty() && self.stories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len() + self.epics.len() + self.stories.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub portfolios: Vec<PortfolioGroup>,
    pub orphans: Orphans,
}

impl Tree {
    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty() && self.orphans.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.initiatives()
            .chain(self.orphans.features.iter())
            .chain(self.orphans.epics.iter())
            .chain(self.orphans.stories.iter())
            .find_map(|n| n.find(id))
    }

    /// Top-level initiative nodes, in display order.
    pub fn initiatives(&self) -> impl Iterator<Item = &Node> {
        self.portfolios
            .iter()
            .flat_map(|p| p.briefs.iter())
            .flat_map(|b| b.initiatives.iter())
    }

    /// Total number of work-item nodes placed under portfolio groups.
    pub fn descendant_count(&self) -> usize {
        self.initiatives().map(|n| 1 + n.descendant_count()).sum()
    }

    /// Display label for a group expansion key such as `portfolio-P1` or
    /// `brief-unassigned`.
    pub fn display_label(&self, key: &str) -> Option<&str> {
        if let Some(id) = key.strip_prefix("portfolio-") {
            return self
                .portfolios
                .iter()
                .find(|p| p.key == id)
                .map(|p| p.label())
                .or((id == UNASSIGNED).then_some(UNASSIGNED_PORTFOLIO_LABEL));
        }
        if let Some(id) = key.strip_prefix("brief-") {
            return self
                .portfolios
                .iter()
                .flat_map(|p| p.briefs.iter())
                .find(|b| b.key == id)
                .map(|b| b.label())
                .or((id == UNASSIGNED).then_some(UNASSIGNED_BRIEF_LABEL));
        }
        None
    }

    /// Id of the initiative node whose subtree contains `id`.
    pub fn ancestor_initiative(&self, id: &str) -> Option<&str> {
        self.initiatives()
            .find(|n| n.find(id).is_some())
            .map(|n| n.item.id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Two-pass resolver
// ---------------------------------------------------------------------------

/// For each child (by index), the id of the parent that claims it.
fn resolve_parents(parents: &[WorkItem], children: &[WorkItem]) -> Vec<Option<String>> {
    let parent_ids: std::collections::HashSet<&str> =
        parents.iter().map(|p| p.id.as_str()).collect();

    // First parent per brief, in source order. Items without a brief share
    // the unassigned key, so a keyless, briefless child still attaches to
    // the first briefless parent.
    let mut first_by_brief: HashMap<&str, &str> = HashMap::new();
    for p in parents {
        first_by_brief
            .entry(p.effective_brief_id())
            .or_insert(p.id.as_str());
    }

    let mut claims = Vec::with_capacity(children.len());
    // Pass 1: exact foreign key.
    for child in children {
        let claim = child
            .parent_ref()
            .filter(|p| parent_ids.contains(p))
            .map(str::to_string);
        claims.push(claim);
    }
    // Pass 2: unclaimed children with an empty key, by shared brief.
    for (child, claim) in children.iter().zip(claims.iter_mut()) {
        if claim.is_some() || child.parent_ref().is_some() {
            continue;
        }
        *claim = first_by_brief
            .get(child.effective_brief_id())
            .map(|p| p.to_string());
    }
    claims
}

/// Build child nodes for one level and bucket them by claiming parent id.
fn attach(
    parents: &[WorkItem],
    children: &[WorkItem],
    mut grandchildren: HashMap<String, Vec<Node>>,
    kind: WorkItemKind,
    orphans: &mut Vec<Node>,
) -> HashMap<String, Vec<Node>> {
    let claims = resolve_parents(parents, children);
    let mut by_parent: HashMap<String, Vec<Node>> = HashMap::new();

    for (child, claim) in children.iter().zip(claims) {
        let mut node = Node::leaf(child.clone());
        node.item.kind = kind;
        if let Some(kids) = grandchildren.remove(&child.id) {
            node.children = kids;
        }
        match claim {
            Some(parent_id) => by_parent.entry(parent_id).or_default().push(node),
            None => {
                tracing::debug!(kind = %kind, id = %child.id, "work item has no resolvable parent");
                orphans.push(node);
            }
        }
    }
    by_parent
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Build the display tree from the current collections. Never fails.
pub fn aggregate(snapshot: &Snapshot) -> Tree {
    let portfolio_map: HashMap<&str, &Portfolio> = snapshot
        .portfolios
        .iter()
        .map(|p| (p.id.as_str(), p))
        .collect();
    let brief_map: HashMap<&str, &BusinessBrief> = snapshot
        .business_briefs
        .iter()
        .map(|b| (b.id.as_str(), b))
        .collect();

    let mut orphans = Orphans::default();

    let stories = attach(
        &snapshot.epics,
        &snapshot.stories,
        HashMap::new(),
        WorkItemKind::Story,
        &mut orphans.stories,
    );
    let epics = attach(
        &snapshot.features,
        &snapshot.epics,
        stories,
        WorkItemKind::Epic,
        &mut orphans.epics,
    );
    let mut features = attach(
        &snapshot.initiatives,
        &snapshot.features,
        epics,
        WorkItemKind::Feature,
        &mut orphans.features,
    );

    let mut portfolios: Vec<PortfolioGroup> = Vec::new();
    let mut portfolio_index: HashMap<String, usize> = HashMap::new();

    for initiative in &snapshot.initiatives {
        let portfolio_key = initiative.effective_portfolio_id().to_string();
        let brief_key = initiative.effective_brief_id().to_string();

        let pi = *portfolio_index
            .entry(portfolio_key.clone())
            .or_insert_with(|| {
                let portfolio = if portfolio_key == UNASSIGNED {
                    None
                } else {
                    portfolio_map.get(portfolio_key.as_str()).map(|p| (*p).clone())
                };
                portfolios.push(PortfolioGroup {
                    key: portfolio_key.clone(),
                    portfolio,
                    briefs: Vec::new(),
                });
                portfolios.len() - 1
            });
        let group = &mut portfolios[pi];

        let bi = match group.briefs.iter().position(|b| b.key == brief_key) {
            Some(i) => i,
            None => {
                group.briefs.push(BriefGroup {
                    brief: brief_map.get(brief_key.as_str()).map(|b| (*b).clone()),
                    key: brief_key,
                    initiatives: Vec::new(),
                });
                group.briefs.len() - 1
            }
        };

        let mut node = Node::leaf(initiative.clone());
        node.item.kind = WorkItemKind::Initiative;
        if let Some(kids) = features.remove(&initiative.id) {
            node.children = kids;
        }
        group.briefs[bi].initiatives.push(node);
    }

    Tree {
        portfolios,
        orphans,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
