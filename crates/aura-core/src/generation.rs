//! Generation payloads, prompt assembly, response parsing and the template
//! fallbacks that keep the UI from ever showing an empty result.

use crate::error::{AuraError, Result};
use crate::work_item::WorkItem;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_FRAMEWORK: &str = "react";
pub const MOCK_PROVIDER: &str = "Mock";
pub const FALLBACK_PROVIDER: &str = "Template";

// ---------------------------------------------------------------------------
// DesignCode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignCode {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default, alias = "js")]
    pub javascript: String,
    #[serde(default = "default_framework")]
    pub framework: String,
}

fn default_framework() -> String {
    DEFAULT_FRAMEWORK.to_string()
}

impl DesignCode {
    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty() && self.css.trim().is_empty() && self.javascript.trim().is_empty()
    }

    /// Plain-text download: script, then styles, then markup.
    pub fn download_text(&self) -> String {
        format!(
            "// Generated Design Component\n{}\n\n/* Styles */\n{}\n\n<!-- HTML Template -->\n{}",
            self.javascript, self.css, self.html
        )
    }
}

// ---------------------------------------------------------------------------
// CodeProject
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeType {
    #[default]
    Frontend,
    Backend,
    Fullstack,
}

impl CodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            CodeType::Frontend => "frontend",
            CodeType::Backend => "backend",
            CodeType::Fullstack => "fullstack",
        }
    }

    pub fn has_ui(self) -> bool {
        !matches!(self, CodeType::Backend)
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeType {
    type Err = AuraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frontend" => Ok(CodeType::Frontend),
            "backend" => Ok(CodeType::Backend),
            "fullstack" => Ok(CodeType::Fullstack),
            other => Err(AuraError::Validation(format!("unknown code type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeFileType {
    Main,
    Component,
    Config,
    Test,
    Style,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFile {
    pub filename: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub file_type: CodeFileType,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeProject {
    pub language: String,
    #[serde(default)]
    pub code_type: CodeType,
    #[serde(default)]
    pub files: Vec<CodeFile>,
    #[serde(default)]
    pub project_structure: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub run_instructions: String,
}

/// Markdown download of a generated project.
pub fn download_bundle(project: &CodeProject) -> String {
    let title = project
        .files
        .first()
        .and_then(|f| f.filename.split('.').next())
        .unwrap_or("project");

    let mut out = format!(
        "# {title} - Generated Code\n\n## Project Structure\n```\n{}\n```\n\n## Dependencies\n{}\n\n## Run Instructions\n{}\n\n## Files\n\n",
        project.project_structure,
        project.dependencies.join(", "),
        project.run_instructions,
    );
    for file in &project.files {
        out.push_str(&format!(
            "### {}\n```{}\n{}\n```\n\n",
            file.filename, file.language, file.content
        ));
    }
    out
}

pub fn bundle_file_name(work_item_id: &str) -> String {
    format!("{work_item_id}-generated-code.md")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Reference image sent alongside a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub data_base64: String,
    pub mime_type: String,
}

impl ImageAttachment {
    /// Encode `bytes`, taking the MIME type from `file_name`.
    pub fn from_bytes(bytes: &[u8], file_name: &str) -> Result<Self> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        if mime.type_() != mime_guess::mime::IMAGE {
            return Err(AuraError::Validation(format!(
                "'{file_name}' is not an image ({mime})"
            )));
        }
        Ok(Self {
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime.essence_str().to_string(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_bytes(&bytes, &name)
    }

    pub fn decoded_len(&self) -> Result<usize> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data_base64)
            .map(|b| b.len())
            .map_err(|e| AuraError::Validation(format!("invalid image data: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignRequest {
    pub work_item_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub prompt: String,
    #[serde(default)]
    pub context: String,
    pub framework: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
    #[serde(default = "yes")]
    pub include_responsive: bool,
    #[serde(default = "yes")]
    pub include_accessibility: bool,
}

fn yes() -> bool {
    true
}

impl DesignRequest {
    /// Assemble the request for a selected work item. `extra` is the user's
    /// design prompt; an attached image adds a visual-reference section.
    pub fn from_work_item(
        item: &WorkItem,
        extra: Option<&str>,
        image: Option<(ImageAttachment, String)>,
        framework: &str,
    ) -> Self {
        let mut context = format!("Work Item: {}", item.title);
        let mut prompt = format!(
            "Generate a modern, responsive web component for the work item \"{}\".\n\nDescription: {}\nRequirements: Create a user interface that addresses the work item requirements.",
            item.title, item.description
        );

        let (image_data, image_type) = match image {
            Some((attachment, name)) => {
                context.push_str(&format!(" | Reference Design: {name}"));
                prompt.push_str(
                    "\n\nVISUAL REFERENCE: Match the attached design image as closely as possible: \
                     layout, colour palette, typography and component styling.",
                );
                (Some(attachment.data_base64), Some(attachment.mime_type))
            }
            None => (None, None),
        };

        let extra = extra.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(
            "Focus on user experience, accessibility, and modern design patterns.",
        );
        prompt.push('\n');
        prompt.push_str(extra);

        Self {
            work_item_id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            prompt,
            context,
            framework: framework.to_string(),
            image_data,
            image_type,
            include_responsive: true,
            include_accessibility: true,
        }
    }
}

/// Prompt pre-filled when a work item is handed over with auto-advance.
pub fn auto_prompt(item: &WorkItem) -> String {
    compose_auto_prompt(
        &item.title,
        &item.description,
        item.priority.as_str(),
        item.kind.as_str(),
    )
}

pub(crate) fn compose_auto_prompt(title: &str, description: &str, priority: &str, kind: &str) -> String {
    let mut parts = vec![format!("\"{title}\"")];
    if !description.is_empty() {
        parts.push(format!("Description: {description}"));
    }
    if !priority.is_empty() {
        parts.push(format!("Priority: {priority}"));
    }
    if !kind.is_empty() {
        parts.push(format!("Type: {kind}"));
    }
    format!("Create a modern, responsive UI component for {}.", parts.join(". "))
}

/// Request for a runnable project built from a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRequest {
    pub work_item_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code_type: CodeType,
    pub language: String,
    pub prompt: String,
}

impl CodeRequest {
    pub fn from_work_item(item: &WorkItem, code_type: CodeType, language: &str, extra: Option<&str>) -> Self {
        let language = match language.trim() {
            "" => "auto",
            other => other,
        };
        let mut prompt = format!(
            "Generate a {code_type} project in {language} for the work item \"{}\".\n\nDescription: {}",
            item.title, item.description
        );
        if let Some(extra) = extra.map(str::trim).filter(|s| !s.is_empty()) {
            prompt.push('\n');
            prompt.push_str(extra);
        }
        Self {
            work_item_id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            code_type,
            language: language.to_string(),
            prompt,
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CodeBody {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    css: Option<String>,
    #[serde(default)]
    javascript: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DesignData {
    code: Option<CodeBody>,
    #[serde(default)]
    framework: Option<String>,
}

/// Parse a generation endpoint response. Anything short of a 2xx
/// `success: true` envelope carrying `data.code` is an error.
pub fn parse_design_response(status: u16, body: &str) -> Result<DesignCode> {
    if !(200..300).contains(&status) {
        return Err(AuraError::Generation(format!("endpoint returned status {status}")));
    }
    let envelope: ApiEnvelope<DesignData> = serde_json::from_str(body)
        .map_err(|e| AuraError::Generation(format!("malformed response: {e}")))?;
    if !envelope.success {
        let reason = envelope
            .message
            .or(envelope.error)
            .unwrap_or_else(|| "endpoint reported failure".to_string());
        return Err(AuraError::Generation(reason));
    }
    let data = envelope
        .data
        .ok_or_else(|| AuraError::Generation("API returned success but no data".into()))?;
    let code = data
        .code
        .ok_or_else(|| AuraError::Generation("response has no code".into()))?;

    Ok(DesignCode {
        html: code.html.unwrap_or_default(),
        css: code.css.unwrap_or_default(),
        javascript: code.javascript.unwrap_or_default(),
        framework: data
            .framework
            .filter(|f| !f.is_empty())
            .unwrap_or_else(default_framework),
    })
}

/// Parse a code-generation response: a `success: true` envelope whose
/// `data` is the project itself.
pub fn parse_code_response(status: u16, body: &str) -> Result<CodeProject> {
    if !(200..300).contains(&status) {
        return Err(AuraError::Generation(format!("endpoint returned status {status}")));
    }
    let envelope: ApiEnvelope<CodeProject> = serde_json::from_str(body)
        .map_err(|e| AuraError::Generation(format!("malformed response: {e}")))?;
    if !envelope.success {
        let reason = envelope
            .message
            .or(envelope.error)
            .unwrap_or_else(|| "endpoint reported failure".to_string());
        return Err(AuraError::Generation(reason));
    }
    envelope
        .data
        .ok_or_else(|| AuraError::Generation("API returned success but no data".into()))
}

// ---------------------------------------------------------------------------
// Template fallbacks
// ---------------------------------------------------------------------------

fn slug(title: &str) -> String {
    let s: Vec<String> = title
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect();
    if s.is_empty() {
        "generated-app".to_string()
    } else {
        s.join("-")
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn template_design(title: &str, description: &str, badge: &str, framework: &str) -> DesignCode {
    let title = escape_html(title);
    let description = if description.is_empty() {
        "Generated preview component".to_string()
    } else {
        escape_html(description)
    };

    let html = format!(
        r#"<main class="aura-card">
  <header class="aura-card__header">
    <h1>{title}</h1>
    <span class="aura-badge">{badge}</span>
  </header>
  <p class="aura-card__body">{description}</p>
  <button class="aura-button" id="aura-action">Get started</button>
</main>"#
    );

    let css = r#".aura-card { max-width: 640px; margin: 0 auto; padding: 24px; border-radius: 12px; background: #ffffff; box-shadow: 0 1px 3px rgba(0,0,0,0.1); }
.aura-card__header { display: flex; align-items: center; justify-content: space-between; gap: 12px; }
.aura-card__header h1 { margin: 0; font-size: 1.5rem; color: #111827; }
.aura-card__body { color: #4b5563; line-height: 1.6; }
.aura-badge { padding: 2px 10px; border-radius: 9999px; font-size: 0.75rem; background: #eef2ff; color: #4338ca; text-transform: capitalize; }
.aura-button { padding: 10px 18px; border: 0; border-radius: 8px; background: #4f46e5; color: #ffffff; cursor: pointer; }
.aura-button:hover { background: #4338ca; }"#
        .to_string();

    let javascript = r#"document.getElementById('aura-action')?.addEventListener('click', function () {
  this.textContent = 'Thanks!';
});"#
        .to_string();

    DesignCode {
        html,
        css,
        javascript,
        framework: framework.to_string(),
    }
}

/// Deterministic placeholder design for a work item.
pub fn fallback_design(item: &WorkItem, framework: &str) -> DesignCode {
    template_design(&item.title, &item.description, item.priority.as_str(), framework)
}

fn frontend_source(title: &str, description: &str) -> String {
    format!(
        r#"import React from 'react';
import './App.css';

export default function App() {{
  return (
    <main className="app">
      <h1>{title}</h1>
      <p>{description}</p>
    </main>
  );
}}
"#,
        title = escape_html(title),
        description = escape_html(description),
    )
}

fn backend_source(title: &str) -> String {
    format!(
        r#"import express from 'express';
import cors from 'cors';

const app = express();
app.use(cors());
app.use(express.json());

// {title}
app.get('/api/{slug}', (_req, res) => {{
  res.json({{ success: true, data: [] }});
}});

app.listen(process.env.PORT || 3001);
"#,
        slug = slug(title),
    )
}

fn single_html(title: &str, description: &str, badge: &str) -> String {
    let design = template_design(title, description, badge, "html");
    crate::preview::compose_document(&design)
}

fn package_json(title: &str, description: &str, code_type: CodeType) -> String {
    let (scripts, deps) = if code_type == CodeType::Backend {
        (
            serde_json::json!({
                "start": "node dist/server.js",
                "dev": "ts-node server.ts",
                "build": "tsc"
            }),
            serde_json::json!({
                "express": "^4.18.2",
                "cors": "^2.8.5",
                "@types/express": "^4.17.17",
                "@types/cors": "^2.8.13"
            }),
        )
    } else {
        (
            serde_json::json!({
                "start": "react-scripts start",
                "build": "react-scripts build",
                "test": "react-scripts test"
            }),
            serde_json::json!({
                "react": "^18.2.0",
                "react-dom": "^18.2.0",
                "@types/react": "^18.2.0",
                "@types/react-dom": "^18.2.0"
            }),
        )
    };
    let manifest = serde_json::json!({
        "name": slug(title),
        "version": "1.0.0",
        "description": description,
        "scripts": scripts,
        "dependencies": deps,
    });
    serde_json::to_string_pretty(&manifest).unwrap_or_default()
}

/// Deterministic placeholder project. `language` may be `auto` (TypeScript)
/// or `html-single` (one self-contained HTML file).
pub fn fallback_project(item: &WorkItem, code_type: CodeType, language: &str) -> CodeProject {
    template_project(
        &item.title,
        &item.description,
        item.priority.as_str(),
        code_type,
        language,
    )
}

fn template_project(
    title: &str,
    description: &str,
    badge: &str,
    code_type: CodeType,
    language: &str,
) -> CodeProject {
    if language == "html-single" {
        return CodeProject {
            language: "html".into(),
            code_type,
            files: vec![CodeFile {
                filename: "index.html".into(),
                content: single_html(title, description, badge),
                file_type: CodeFileType::Main,
                language: "html".into(),
            }],
            project_structure: "Single HTML file containing all code".into(),
            dependencies: Vec::new(),
            run_instructions: "Open index.html in any modern web browser".into(),
        };
    }

    let language = if language.is_empty() || language == "auto" {
        "typescript"
    } else {
        language
    };
    let backend = code_type == CodeType::Backend;

    let mut files = vec![CodeFile {
        filename: if backend { "server.ts" } else { "App.tsx" }.into(),
        content: if backend {
            backend_source(title)
        } else {
            frontend_source(title, description)
        },
        file_type: CodeFileType::Main,
        language: language.into(),
    }];
    if code_type.has_ui() {
        files.push(CodeFile {
            filename: "App.css".into(),
            content: template_design(title, description, badge, "react").css,
            file_type: CodeFileType::Style,
            language: "css".into(),
        });
    }
    files.push(CodeFile {
        filename: "package.json".into(),
        content: package_json(title, description, code_type),
        file_type: CodeFileType::Config,
        language: "json".into(),
    });

    let (structure, deps, run) = if backend {
        (
            "backend/\n├── src/\n│   ├── server.ts\n│   ├── routes/\n│   ├── controllers/\n│   └── models/\n├── package.json\n├── tsconfig.json\n└── README.md",
            vec!["express", "cors", "typescript", "ts-node"],
            "npm install && npm run dev",
        )
    } else {
        (
            "frontend/\n├── src/\n│   ├── App.tsx\n│   ├── App.css\n│   ├── components/\n│   └── pages/\n├── public/\n├── package.json\n└── README.md",
            vec!["react", "react-dom", "typescript"],
            "npm install && npm start",
        )
    };

    CodeProject {
        language: language.into(),
        code_type,
        files,
        project_structure: structure.into(),
        dependencies: deps.into_iter().map(String::from).collect(),
        run_instructions: run.into(),
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn generate_design(&self, request: &DesignRequest) -> Result<DesignCode>;
    async fn generate_code(&self, request: &CodeRequest) -> Result<CodeProject>;
}

/// Offline backend that answers every request from the template.
#[derive(Debug, Clone, Default)]
pub struct MockGenerationBackend;

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    fn name(&self) -> &str {
        MOCK_PROVIDER
    }

    async fn generate_design(&self, request: &DesignRequest) -> Result<DesignCode> {
        let badge = if request.image_data.is_some() {
            "image-based"
        } else {
            "text-based"
        };
        Ok(template_design(
            &request.title,
            &request.description,
            badge,
            &request.framework,
        ))
    }

    async fn generate_code(&self, request: &CodeRequest) -> Result<CodeProject> {
        Ok(template_project(
            &request.title,
            &request.description,
            "text-based",
            request.code_type,
            &request.language,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub code: DesignCode,
    pub provider: String,
    pub used_fallback: bool,
}

/// Ask `backend` for a design, substituting the template on any failure or
/// empty answer.
pub async fn generate_with_fallback(
    backend: &dyn GenerationBackend,
    request: &DesignRequest,
    item: &WorkItem,
) -> GenerationOutcome {
    let run_id = uuid::Uuid::new_v4();
    tracing::info!(%run_id, work_item = %item.id, provider = backend.name(), "generating design");

    match backend.generate_design(request).await {
        Ok(code) if !code.is_empty() => GenerationOutcome {
            code,
            provider: backend.name().to_string(),
            used_fallback: false,
        },
        Ok(_) => {
            tracing::warn!(%run_id, "backend returned empty design, using template");
            fallback_outcome(item, &request.framework)
        }
        Err(e) => {
            tracing::warn!(%run_id, error = %e, "generation failed, using template");
            fallback_outcome(item, &request.framework)
        }
    }
}

fn fallback_outcome(item: &WorkItem, framework: &str) -> GenerationOutcome {
    GenerationOutcome {
        code: fallback_design(item, framework),
        provider: FALLBACK_PROVIDER.to_string(),
        used_fallback: true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeOutcome {
    pub project: CodeProject,
    pub provider: String,
    pub used_fallback: bool,
}

/// Ask `backend` for a project, substituting the template project when the
/// call fails or comes back without files.
pub async fn generate_code_with_fallback(
    backend: &dyn GenerationBackend,
    request: &CodeRequest,
    item: &WorkItem,
) -> CodeOutcome {
    let run_id = uuid::Uuid::new_v4();
    tracing::info!(
        %run_id,
        work_item = %item.id,
        code_type = %request.code_type,
        provider = backend.name(),
        "generating code"
    );

    let failure = match backend.generate_code(request).await {
        Ok(project) if !project.files.is_empty() => {
            return CodeOutcome {
                project,
                provider: backend.name().to_string(),
                used_fallback: false,
            }
        }
        Ok(_) => "backend returned no files".to_string(),
        Err(e) => e.to_string(),
    };
    tracing::warn!(%run_id, error = %failure, "code generation failed, using template project");
    CodeOutcome {
        project: fallback_project(item, request.code_type, &request.language),
        provider: FALLBACK_PROVIDER.to_string(),
        used_fallback: true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
