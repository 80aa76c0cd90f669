use crate::output::{paint, print_json};
use anyhow::Context;
use aura_core::badges::{priority_badge, status_badge};
use aura_core::config::Config;
use aura_core::hierarchy::{self, Node};
use aura_core::store::Snapshot;
use aura_core::view_state::{visible_rows, ExpansionState, Row, RowKind};
use aura_core::work_item::WorkItem;
use std::path::Path;

pub fn run(root: &Path, expand_all: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let snapshot = Snapshot::load(root).context("failed to load work items")?;
    let tree = hierarchy::aggregate(&snapshot);

    let mut expansion = ExpansionState::new();
    if expand_all {
        expansion.open_all(&tree);
    } else {
        expansion.auto_expand(&snapshot, config.tree.auto_expand_portfolios);
    }

    if json {
        let expanded: Vec<&str> = expansion.keys().collect();
        return print_json(&serde_json::json!({
            "portfolios": tree.portfolios,
            "orphans": tree.orphans,
            "expanded": expanded,
        }));
    }

    if tree.is_empty() {
        println!("No work items. Add one with `aura add initiative --title ...`.");
        return Ok(());
    }

    for row in visible_rows(&tree, &expansion) {
        println!("{}", format_row(&row));
    }

    let orphans = [
        ("features", &tree.orphans.features),
        ("epics", &tree.orphans.epics),
        ("stories", &tree.orphans.stories),
    ];
    if orphans.iter().any(|(_, nodes)| !nodes.is_empty()) {
        println!();
        println!("Unlinked:");
        for (label, nodes) in orphans {
            if nodes.is_empty() {
                continue;
            }
            println!("  {label}:");
            for node in nodes.iter() {
                print_orphan(node, 2, expand_all);
            }
        }
    }
    Ok(())
}

fn marker(child_count: usize, open: bool) -> &'static str {
    match (child_count, open) {
        (0, _) => "•",
        (_, true) => "▾",
        (_, false) => "▸",
    }
}

fn format_row(row: &Row<'_>) -> String {
    let indent = "  ".repeat(row.depth);
    let mark = marker(row.child_count, row.open);
    let count = if row.child_count > 0 {
        format!(" ({})", row.child_count)
    } else {
        String::new()
    };
    match (row.kind, row.node) {
        (RowKind::Item(_), Some(node)) => {
            format!("{indent}{mark} {}{count}{}", item_label(&node.item), badges(&node.item))
        }
        _ => format!("{indent}{mark} {}{count}", paint(row.label, "1")),
    }
}

fn item_label(item: &WorkItem) -> String {
    format!("[{}] {} {}", item.kind, item.id, item.title)
}

fn badges(item: &WorkItem) -> String {
    format!(
        "  {}  {}",
        paint(item.priority.as_str(), priority_badge(item.priority).ansi()),
        paint(item.status.as_str(), status_badge(&item.status).ansi()),
    )
}

fn print_orphan(node: &Node, depth: usize, expand: bool) {
    let count = node.child_count();
    let suffix = if count > 0 {
        format!(" ({count})")
    } else {
        String::new()
    };
    println!(
        "{}{} {}{suffix}{}",
        "  ".repeat(depth),
        marker(count, expand),
        item_label(&node.item),
        badges(&node.item)
    );
    if expand {
        for child in &node.children {
            print_orphan(child, depth + 1, expand);
        }
    }
}
