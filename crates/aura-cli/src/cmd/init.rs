use crate::output::print_json;
use anyhow::Context;
use aura_core::store;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let written = store::init_project(root)
        .with_context(|| format!("failed to initialize {}", root.display()))?;
    let created: Vec<String> = written
        .iter()
        .map(|p| p.strip_prefix(root).unwrap_or(p).display().to_string())
        .collect();

    if json {
        return print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "created": created,
        }));
    }

    println!("Initializing aura in: {}", root.display());
    if created.is_empty() {
        println!("  already initialized, nothing to do");
    }
    for path in &created {
        println!("  created: {path}");
    }
    Ok(())
}
