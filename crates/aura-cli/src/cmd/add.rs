use crate::output::print_json;
use anyhow::{bail, Context};
use aura_core::store::{Snapshot, WorkItemStore};
use aura_core::types::{Priority, WorkItemKind};
use aura_core::work_item::WorkItem;
use std::path::Path;

pub struct AddArgs {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub parent: Option<String>,
    pub brief: Option<String>,
    pub portfolio: Option<String>,
    pub priority: Option<String>,
}

pub fn run(root: &Path, kind: &str, args: AddArgs, json: bool) -> anyhow::Result<()> {
    let kind: WorkItemKind = kind.parse()?;
    let snapshot = Snapshot::load(root).context("failed to load work items")?;
    let mut store = WorkItemStore::from_snapshot(snapshot)?;

    let id = args
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| WorkItem::generate_id(kind));
    let mut item = WorkItem::new(kind, id.clone(), args.title);
    if let Some(description) = args.description {
        item = item.with_description(description);
    }
    if let Some(priority) = args.priority {
        item = item.with_priority(Priority::parse_lenient(&priority));
    }

    let mut inherited_brief = None;
    if let Some(parent_id) = args.parent {
        let Some(parent_kind) = kind.parent_kind() else {
            bail!("{kind} items have no parent; use --brief and --portfolio instead");
        };
        match store.get(parent_kind, &parent_id) {
            Some(parent) => inherited_brief = Some(parent.business_brief_id.clone()),
            None => {
                tracing::warn!(%parent_kind, parent = %parent_id, "parent not found, item will be listed as unlinked")
            }
        }
        item = item.with_parent(parent_id);
    }
    if let Some(brief) = args.brief.or(inherited_brief) {
        item = item.with_brief(brief);
    }
    if let Some(portfolio) = args.portfolio {
        item = item.with_portfolio(portfolio);
    }

    store
        .add(kind, item)
        .with_context(|| format!("failed to add {kind} '{id}'"))?;
    store
        .snapshot()
        .save(root)
        .context("failed to save work items")?;

    let saved = store.get(kind, &id).context("item missing after add")?;
    if json {
        print_json(saved)?;
    } else {
        println!("Added {kind} '{id}': {}", saved.title);
    }
    Ok(())
}
