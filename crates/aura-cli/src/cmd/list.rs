use crate::output::{print_json, print_table};
use anyhow::Context;
use aura_core::store::Snapshot;
use aura_core::types::WorkItemKind;
use std::path::Path;

pub fn run(root: &Path, kind: &str, json: bool) -> anyhow::Result<()> {
    let snapshot = Snapshot::load(root).context("failed to load work items")?;

    match kind {
        "portfolios" | "portfolio" => {
            if json {
                return print_json(&snapshot.portfolios);
            }
            let rows = snapshot
                .portfolios
                .iter()
                .map(|p| {
                    vec![
                        p.id.clone(),
                        p.name.clone(),
                        p.function.clone().unwrap_or_default(),
                        p.color.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "FUNCTION", "COLOR"], rows);
        }
        "briefs" | "brief" | "business-briefs" | "business_briefs" => {
            if json {
                return print_json(&snapshot.business_briefs);
            }
            let rows = snapshot
                .business_briefs
                .iter()
                .map(|b| {
                    vec![
                        b.id.clone(),
                        b.title.clone(),
                        b.status.as_str().to_string(),
                        b.portfolio_id.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(&["ID", "TITLE", "STATUS", "PORTFOLIO"], rows);
        }
        other => {
            let kind: WorkItemKind = other.parse()?;
            let items = snapshot.items(kind);
            if json {
                return print_json(&items);
            }
            if items.is_empty() {
                println!("No {}.", kind.collection());
                return Ok(());
            }
            let rows = items
                .iter()
                .map(|item| {
                    vec![
                        item.id.clone(),
                        item.title.clone(),
                        item.priority.as_str().to_string(),
                        item.status.as_str().to_string(),
                        item.parent_ref().unwrap_or("-").to_string(),
                        item.effective_brief_id().to_string(),
                    ]
                })
                .collect();
            print_table(&["ID", "TITLE", "PRIORITY", "STATUS", "PARENT", "BRIEF"], rows);
        }
    }
    Ok(())
}
