use super::generate::load_item;
use crate::output::print_json;
use anyhow::Context;
use aura_core::generation::{
    bundle_file_name, download_bundle, generate_code_with_fallback, CodeRequest, CodeType,
};
use aura_core::io;
use std::path::{Path, PathBuf};

pub fn run(
    root: &Path,
    id: &str,
    code_type: &str,
    language: &str,
    prompt: Option<&str>,
    out: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let (config, item) = load_item(root, id)?;
    let code_type: CodeType = code_type.parse()?;
    let request = CodeRequest::from_work_item(&item, code_type, language, prompt);
    let backend = aura_server::backend::from_config(&config.generation);

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(generate_code_with_fallback(backend.as_ref(), &request, &item));
    if outcome.used_fallback && !json {
        eprintln!("note: generation backend failed, using the template project");
    }

    let path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(bundle_file_name(&item.id)));
    io::atomic_write(&path, download_bundle(&outcome.project).as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        return print_json(&serde_json::json!({
            "workItemId": item.id,
            "provider": outcome.provider,
            "usedFallback": outcome.used_fallback,
            "project": outcome.project,
            "path": path.display().to_string(),
        }));
    }
    println!(
        "Generated {} {} project for '{}' via {} → {}",
        outcome.project.language,
        outcome.project.code_type,
        item.id,
        outcome.provider,
        path.display()
    );
    Ok(())
}
