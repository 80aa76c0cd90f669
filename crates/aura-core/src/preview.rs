//! Live preview: compose a standalone document from generated code and push
//! it into a sandboxed frame.
//!
//! Rendering goes through [`SandboxRenderer`]. The frame-backed renderer
//! writes the document first and, if the frame body is still empty after
//! `fallback_delay`, assigns it through `srcdoc` instead.

use crate::config::PreviewConfig;
use crate::generation::DesignCode;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("preview frame is not available")]
    Unavailable,

    #[error("preview frame document is not accessible (cross-origin)")]
    CrossOrigin,

    #[error("preview write failed: {0}")]
    WriteFailed(String),
}

// ---------------------------------------------------------------------------
// Document composition
// ---------------------------------------------------------------------------

pub fn is_complete_document(html: &str) -> bool {
    html.contains("<!DOCTYPE html>") || html.contains("<html")
}

/// Complete documents pass through verbatim; fragments get a minimal shell.
pub fn compose_document(code: &DesignCode) -> String {
    if is_complete_document(&code.html) {
        return code.html.clone();
    }

    let script = if code.javascript.is_empty() {
        String::new()
    } else {
        format!("<script>{}</script>", code.javascript)
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Preview</title>
    <style>
      body {{
        margin: 0;
        padding: 20px;
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background-color: #f9fafb;
      }}
      {css}
    </style>
</head>
<body>
    {html}
    {script}
</body>
</html>"#,
        css = code.css,
        html = code.html,
    )
}

// ---------------------------------------------------------------------------
// Sandbox policy
// ---------------------------------------------------------------------------

const FORBIDDEN_TOKENS: &[&str] = &["allow-same-origin", "allow-top-navigation"];

/// Value of the iframe `sandbox` attribute. Scripts may run; the frame never
/// gets same-origin access or top-level navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPolicy {
    tokens: Vec<String>,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            tokens: vec!["allow-scripts".to_string()],
        }
    }
}

impl SandboxPolicy {
    /// Build from configured tokens, dropping any that would let content
    /// escape its frame.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept: Vec<String> = Vec::new();
        for token in tokens {
            let token = token.into();
            let token = token.trim().to_ascii_lowercase();
            if token.is_empty() || kept.contains(&token) {
                continue;
            }
            if FORBIDDEN_TOKENS.iter().any(|f| token.starts_with(f)) {
                tracing::warn!(token = %token, "ignoring sandbox token");
                continue;
            }
            kept.push(token);
        }
        Self { tokens: kept }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.sandbox.iter().cloned())
    }

    pub fn allows(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn attribute(&self) -> String {
        self.tokens.join(" ")
    }

    /// A self-contained `<iframe>` element carrying the document in `srcdoc`.
    pub fn iframe_tag(&self, document: &str) -> String {
        format!(
            r#"<iframe title="Preview" sandbox="{}" srcdoc="{}" style="width:100%;height:100%;border:0"></iframe>"#,
            escape_attr(&self.attribute()),
            escape_attr(document)
        )
    }
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Renderer seam
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SandboxRenderer: Send + Sync {
    async fn render(&self, document: &str) -> Result<(), RenderError>;
}

/// The document surface of an embedded frame.
pub trait PreviewFrame: Send + Sync {
    fn is_accessible(&self) -> bool;
    fn write_document(&self, document: &str) -> Result<(), RenderError>;
    fn body_child_count(&self) -> usize;
    fn set_srcdoc(&self, document: &str) -> Result<(), RenderError>;
}

pub struct FrameRenderer<F: PreviewFrame> {
    frame: Option<Arc<F>>,
    fallback_delay: Duration,
}

impl<F: PreviewFrame> FrameRenderer<F> {
    pub fn new(frame: Arc<F>, config: &PreviewConfig) -> Self {
        Self {
            frame: Some(frame),
            fallback_delay: config.fallback_delay(),
        }
    }

    /// A renderer with no frame attached yet.
    pub fn detached(config: &PreviewConfig) -> Self {
        Self {
            frame: None,
            fallback_delay: config.fallback_delay(),
        }
    }

    pub fn attach(&mut self, frame: Arc<F>) {
        self.frame = Some(frame);
    }
}

#[async_trait]
impl<F: PreviewFrame> SandboxRenderer for FrameRenderer<F> {
    async fn render(&self, document: &str) -> Result<(), RenderError> {
        let Some(frame) = self.frame.as_ref() else {
            tracing::warn!("no preview frame attached, skipping render");
            return Err(RenderError::Unavailable);
        };
        if !frame.is_accessible() {
            tracing::warn!("preview frame document not accessible, skipping render");
            return Err(RenderError::CrossOrigin);
        }

        if let Err(e) = frame.write_document(document) {
            tracing::debug!(error = %e, "direct write failed");
        }

        tokio::time::sleep(self.fallback_delay).await;

        if frame.body_child_count() == 0 {
            tracing::debug!("frame body empty after write, assigning srcdoc");
            frame.set_srcdoc(document)?;
        }
        Ok(())
    }
}

/// Compose and render a generated design. Returns the composed document.
pub async fn render_design<R>(renderer: &R, code: &DesignCode) -> Result<String, RenderError>
where
    R: SandboxRenderer + ?Sized,
{
    let document = compose_document(code);
    renderer.render(&document).await?;
    Ok(document)
}

// ---------------------------------------------------------------------------
// In-memory frame
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FrameContents {
    written: Option<String>,
    srcdoc: Option<String>,
    writes: usize,
}

/// A frame held in memory. It can be told to silently lose direct writes or
/// to refuse access, which is how the fallback and failure paths run.
#[derive(Debug)]
pub struct MemoryFrame {
    accessible: bool,
    drop_writes: bool,
    contents: Mutex<FrameContents>,
}

impl Default for MemoryFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFrame {
    pub fn new() -> Self {
        Self {
            accessible: true,
            drop_writes: false,
            contents: Mutex::new(FrameContents::default()),
        }
    }

    pub fn dropping_writes() -> Self {
        Self {
            drop_writes: true,
            ..Self::new()
        }
    }

    pub fn cross_origin() -> Self {
        Self {
            accessible: false,
            ..Self::new()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FrameContents> {
        self.contents.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The document the frame currently shows; `srcdoc` wins over a write.
    pub fn document(&self) -> Option<String> {
        let c = self.lock();
        c.srcdoc.clone().or_else(|| c.written.clone())
    }

    pub fn srcdoc(&self) -> Option<String> {
        self.lock().srcdoc.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes
    }
}

/// Body of a document, or the whole text when it has no `<body>` tag.
fn body_of(document: &str) -> &str {
    let lower = document.to_ascii_lowercase();
    let Some(open) = lower.find("<body") else {
        return document;
    };
    let Some(start) = lower[open..].find('>').map(|i| open + i + 1) else {
        return "";
    };
    let end = lower[start..].find("</body>").map_or(document.len(), |i| start + i);
    &document[start..end]
}

impl PreviewFrame for MemoryFrame {
    fn is_accessible(&self) -> bool {
        self.accessible
    }

    fn write_document(&self, document: &str) -> Result<(), RenderError> {
        let mut c = self.lock();
        c.writes += 1;
        if !self.drop_writes {
            c.written = Some(document.to_string());
            c.srcdoc = None;
        }
        Ok(())
    }

    /// Counts top-level elements only roughly: any markup in the body is one.
    fn body_child_count(&self) -> usize {
        match self.document() {
            Some(doc) if body_of(&doc).contains('<') => 1,
            _ => 0,
        }
    }

    fn set_srcdoc(&self, document: &str) -> Result<(), RenderError> {
        self.lock().srcdoc = Some(document.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
