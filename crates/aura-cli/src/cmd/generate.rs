use crate::output::print_json;
use anyhow::{anyhow, Context};
use aura_core::config::Config;
use aura_core::generation::{generate_with_fallback, DesignRequest, ImageAttachment};
use aura_core::io;
use aura_core::preview::{render_design, FrameRenderer, MemoryFrame};
use aura_core::progress::{track_with, ProgressSimulator};
use aura_core::store::{Snapshot, WorkItemStore};
use aura_core::view_state::WorkflowSession;
use aura_core::work_item::WorkItem;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

const BAR_WIDTH: usize = 30;

pub struct GenerateArgs {
    pub image: Option<PathBuf>,
    pub prompt: Option<String>,
    pub framework: Option<String>,
    pub out: Option<PathBuf>,
    pub download: Option<PathBuf>,
}

/// Config plus the work item `id`, loaded fresh from disk.
pub(crate) fn load_item(root: &Path, id: &str) -> anyhow::Result<(Config, WorkItem)> {
    let config = Config::load(root).context("failed to load config")?;
    let store = WorkItemStore::from_snapshot(
        Snapshot::load(root).context("failed to load work items")?,
    )?;
    let item = store
        .find(id)
        .cloned()
        .ok_or_else(|| anyhow!("work item not found: {id}"))?;
    Ok((config, item))
}

pub fn run(root: &Path, id: &str, args: GenerateArgs, json: bool) -> anyhow::Result<()> {
    let (config, item) = load_item(root, id)?;

    let image = match args.image.as_deref() {
        Some(path) => {
            let attachment = ImageAttachment::from_path(path)
                .with_context(|| format!("cannot attach {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Some((attachment, name))
        }
        None => None,
    };

    let mut session = WorkflowSession::new();
    session.select(item.id.clone());
    if let Some(prompt) = &args.prompt {
        session.set_prompt(prompt.clone());
    }
    session.advance_to_config()?;

    let framework = args
        .framework
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| config.generation.framework.clone());
    let request = DesignRequest::from_work_item(&item, Some(session.prompt()), image, &framework);
    let backend = aura_server::backend::from_config(&config.generation);

    let rt = tokio::runtime::Runtime::new()?;
    let (outcome, document) = rt.block_on(async {
        let ticket = ProgressSimulator::start(&config.progress);
        let bar = (!json && std::io::stderr().is_terminal())
            .then(|| tokio::spawn(draw_progress(ticket.subscribe())));

        let outcome = track_with(ticket, async {
            anyhow::Ok(generate_with_fallback(backend.as_ref(), &request, &item).await)
        })
        .await;

        if let Some(bar) = bar {
            let _ = bar.await;
        }
        let outcome = outcome?;

        let frame = Arc::new(MemoryFrame::new());
        let renderer = FrameRenderer::new(frame.clone(), &config.preview);
        let composed = render_design(&renderer, &outcome.code)
            .await
            .context("preview render failed")?;
        let document = frame.document().unwrap_or(composed);
        anyhow::Ok((outcome, document))
    })?;

    if outcome.used_fallback && !json {
        eprintln!("note: generation backend failed, showing the template design");
    }
    session.complete_generation(outcome.code.clone())?;

    if let Some(path) = args.out.as_deref() {
        io::atomic_write(path, document.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = args.download.as_deref() {
        io::atomic_write(path, outcome.code.download_text().as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if json {
        return print_json(&serde_json::json!({
            "workItemId": item.id,
            "stage": session.stage(),
            "provider": outcome.provider,
            "usedFallback": outcome.used_fallback,
            "code": outcome.code,
            "path": args.out.as_deref().map(|p| p.display().to_string()),
            "download": args.download.as_deref().map(|p| p.display().to_string()),
        }));
    }
    match args.out.as_deref() {
        Some(path) => println!(
            "Generated {} design for '{}' via {} → {}",
            outcome.code.framework,
            item.id,
            outcome.provider,
            path.display()
        ),
        None => println!("{document}"),
    }
    Ok(())
}

/// Redraw a one-line bar on stderr until the ticket reaches 100 or is dropped.
pub(crate) async fn draw_progress(mut rx: watch::Receiver<u8>) {
    let mut stderr = std::io::stderr();
    loop {
        if rx.changed().await.is_err() {
            break;
        }
        let value = *rx.borrow_and_update();
        let _ = write!(stderr, "\r{}", bar_line(value));
        let _ = stderr.flush();
        if value >= 100 {
            break;
        }
    }
    let _ = writeln!(stderr);
}

fn bar_line(value: u8) -> String {
    let filled = usize::from(value.min(100)) * BAR_WIDTH / 100;
    format!(
        "generating [{}{}] {value:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar_line(0), format!("generating [{}]   0%", "-".repeat(30)));
        assert_eq!(
            bar_line(50),
            format!("generating [{}{}]  50%", "#".repeat(15), "-".repeat(15))
        );
        assert!(bar_line(100).ends_with("] 100%"));
    }
}
