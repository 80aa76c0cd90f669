use aura_core::badges::{priority_badge, status_badge};
use aura_core::hierarchy;
use aura_core::view_state::{visible_rows, ExpansionState, RowKind};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

/// GET /api/hierarchy — the grouped tree, rebuilt from the current
/// collections, plus the keys a fresh view should open by default.
pub async fn get_hierarchy(State(app): State<AppState>) -> Json<serde_json::Value> {
    let store = app.read_store();
    let snapshot = store.snapshot();
    let tree = hierarchy::aggregate(snapshot);

    let mut expansion = ExpansionState::new();
    expansion.auto_expand(snapshot, app.config.tree.auto_expand_portfolios);
    let expanded: Vec<&str> = expansion.keys().collect();

    Json(serde_json::json!({
        "success": true,
        "data": {
            "portfolios": tree.portfolios,
            "orphans": tree.orphans,
            "expanded": expanded,
            "counts": snapshot.counts(),
        },
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsQuery {
    #[serde(default)]
    pub expand_all: bool,
}

/// GET /api/hierarchy/rows — the tree flattened into display rows, with
/// accent colours and badge classes resolved.
pub async fn get_rows(
    State(app): State<AppState>,
    Query(query): Query<RowsQuery>,
) -> Json<serde_json::Value> {
    let store = app.read_store();
    let snapshot = store.snapshot();
    let tree = hierarchy::aggregate(snapshot);

    let mut expansion = ExpansionState::new();
    if query.expand_all {
        expansion.open_all(&tree);
    } else {
        expansion.auto_expand(snapshot, app.config.tree.auto_expand_portfolios);
    }

    let rows: Vec<serde_json::Value> = visible_rows(&tree, &expansion)
        .iter()
        .map(|row| {
            let kind = match row.kind {
                RowKind::Portfolio => "portfolio",
                RowKind::Brief => "brief",
                RowKind::Item(kind) => kind.as_str(),
            };
            let mut value = serde_json::json!({
                "key": row.key,
                "kind": kind,
                "label": row.label,
                "depth": row.depth,
                "childCount": row.child_count,
                "open": row.open,
                "color": row.color(),
            });
            if let Some(node) = row.node {
                value["priorityClass"] = priority_badge(node.item.priority).class().into();
                value["statusClass"] = status_badge(&node.item.status).class().into();
            }
            value
        })
        .collect();

    Json(serde_json::json!({ "success": true, "data": rows }))
}
