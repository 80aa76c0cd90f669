use crate::output::print_json;
use anyhow::Context;
use aura_core::generation::{bundle_file_name, download_bundle, CodeProject};
use aura_core::io;
use std::path::{Path, PathBuf};

pub fn run(
    project: &Path,
    out: Option<PathBuf>,
    work_item: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(project)
        .with_context(|| format!("failed to read {}", project.display()))?;
    let project: CodeProject = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a generated project file", project.display()))?;
    let bundle = download_bundle(&project);

    let Some(path) = out.or_else(|| work_item.map(|id| PathBuf::from(bundle_file_name(id)))) else {
        print!("{bundle}");
        return Ok(());
    };

    io::atomic_write(&path, bundle.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    if json {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "files": project.files.len(),
        }))?;
    } else {
        println!("Wrote {} files to {}", project.files.len(), path.display());
    }
    Ok(())
}
