use crate::error::{AuraError, Result};
use crate::types::WorkItemKind;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const AURA_DIR: &str = ".aura";
pub const DATA_DIR: &str = ".aura/data";
pub const CONFIG_FILE: &str = ".aura/config.yaml";
pub const SESSION_FILE: &str = ".aura/session.yaml";

pub const PORTFOLIOS_FILE: &str = "portfolios.yaml";
pub const BRIEFS_FILE: &str = "business_briefs.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn aura_dir(root: &Path) -> PathBuf {
    root.join(AURA_DIR)
}

pub fn data_dir(root: &Path) -> PathBuf {
    root.join(DATA_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn session_path(root: &Path) -> PathBuf {
    root.join(SESSION_FILE)
}

pub fn collection_path(root: &Path, kind: WorkItemKind) -> PathBuf {
    data_dir(root).join(format!("{}.yaml", kind.collection()))
}

pub fn portfolios_path(root: &Path) -> PathBuf {
    data_dir(root).join(PORTFOLIOS_FILE)
}

pub fn briefs_path(root: &Path) -> PathBuf {
    data_dir(root).join(BRIEFS_FILE)
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:\-]*$").unwrap())
}

/// Ids come from an external store, so the rule is loose: printable, no
/// whitespace, no path separators, at most 128 bytes.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 128 || !id_re().is_match(id) {
        return Err(AuraError::InvalidId(id.to_string()));
    }
    Ok(())
}
