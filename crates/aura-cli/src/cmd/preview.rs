use crate::output::print_json;
use anyhow::Context;
use aura_core::config::Config;
use aura_core::generation::DesignCode;
use aura_core::io;
use aura_core::preview::{compose_document, SandboxPolicy};
use std::path::Path;

pub fn run(
    root: &Path,
    design: &Path,
    out: Option<&Path>,
    iframe: bool,
    json: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(design)
        .with_context(|| format!("failed to read {}", design.display()))?;
    let code: DesignCode = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a design JSON file", design.display()))?;

    let mut document = compose_document(&code);
    if iframe {
        let config = Config::load(root).context("failed to load config")?;
        document = SandboxPolicy::from_config(&config.preview).iframe_tag(&document);
    }

    match out {
        Some(path) => {
            io::atomic_write(path, document.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            if json {
                print_json(&serde_json::json!({
                    "path": path.display().to_string(),
                    "bytes": document.len(),
                }))?;
            } else {
                println!("Wrote preview to {}", path.display());
            }
        }
        None if json => print_json(&serde_json::json!({ "document": document }))?,
        None => println!("{document}"),
    }
    Ok(())
}
