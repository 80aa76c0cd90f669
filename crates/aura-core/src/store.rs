use crate::error::{AuraError, Result};
use crate::io;
use crate::paths;
use crate::types::WorkItemKind;
use crate::work_item::{BusinessBrief, Portfolio, WorkItem};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The six collections as fetched from the backing API, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub initiatives: Vec<WorkItem>,
    #[serde(default)]
    pub features: Vec<WorkItem>,
    #[serde(default)]
    pub epics: Vec<WorkItem>,
    #[serde(default)]
    pub stories: Vec<WorkItem>,
    #[serde(default)]
    pub portfolios: Vec<Portfolio>,
    #[serde(default, alias = "business_briefs")]
    pub business_briefs: Vec<BusinessBrief>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub initiatives: usize,
    pub features: usize,
    pub epics: usize,
    pub stories: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.initiatives + self.features + self.epics + self.stories
    }
}

impl Snapshot {
    pub fn items(&self, kind: WorkItemKind) -> &[WorkItem] {
        match kind {
            WorkItemKind::Initiative => &self.initiatives,
            WorkItemKind::Feature => &self.features,
            WorkItemKind::Epic => &self.epics,
            WorkItemKind::Story => &self.stories,
        }
    }

    fn items_mut(&mut self, kind: WorkItemKind) -> &mut Vec<WorkItem> {
        match kind {
            WorkItemKind::Initiative => &mut self.initiatives,
            WorkItemKind::Feature => &mut self.features,
            WorkItemKind::Epic => &mut self.epics,
            WorkItemKind::Story => &mut self.stories,
        }
    }

    pub fn counts(&self) -> Counts {
        Counts {
            initiatives: self.initiatives.len(),
            features: self.features.len(),
            epics: self.epics.len(),
            stories: self.stories.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    /// Stamp every item with the kind of the collection holding it.
    fn stamp_kinds(&mut self) {
        for &kind in WorkItemKind::all() {
            for item in self.items_mut(kind) {
                item.kind = kind;
            }
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// Load all collections from `.aura/data/`. Missing files are empty collections.
    pub fn load(root: &Path) -> Result<Self> {
        if !paths::aura_dir(root).exists() {
            return Err(AuraError::NotInitialized);
        }
        let mut snapshot = Snapshot {
            initiatives: io::read_yaml_list(&paths::collection_path(root, WorkItemKind::Initiative))?,
            features: io::read_yaml_list(&paths::collection_path(root, WorkItemKind::Feature))?,
            epics: io::read_yaml_list(&paths::collection_path(root, WorkItemKind::Epic))?,
            stories: io::read_yaml_list(&paths::collection_path(root, WorkItemKind::Story))?,
            portfolios: io::read_yaml_list(&paths::portfolios_path(root))?,
            business_briefs: io::read_yaml_list(&paths::briefs_path(root))?,
        };
        snapshot.stamp_kinds();
        Ok(snapshot)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        for &kind in WorkItemKind::all() {
            let data = serde_yaml::to_string(self.items(kind))?;
            io::atomic_write(&paths::collection_path(root, kind), data.as_bytes())?;
        }
        let data = serde_yaml::to_string(&self.portfolios)?;
        io::atomic_write(&paths::portfolios_path(root), data.as_bytes())?;
        let data = serde_yaml::to_string(&self.business_briefs)?;
        io::atomic_write(&paths::briefs_path(root), data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Project init
// ---------------------------------------------------------------------------

/// Create `.aura/` with a default config and empty collection files.
/// Existing files are left alone. Returns the files that were written.
pub fn init_project(root: &Path) -> Result<Vec<PathBuf>> {
    io::ensure_dir(&paths::data_dir(root))?;
    let mut written = Vec::new();

    let config = serde_yaml::to_string(&crate::config::Config::default())?;
    let config_path = paths::config_path(root);
    if io::write_if_missing(&config_path, config.as_bytes())? {
        written.push(config_path);
    }

    let mut files: Vec<PathBuf> = WorkItemKind::all()
        .iter()
        .map(|&kind| paths::collection_path(root, kind))
        .collect();
    files.push(paths::portfolios_path(root));
    files.push(paths::briefs_path(root));
    for path in files {
        if io::write_if_missing(&path, b"[]\n")? {
            written.push(path);
        }
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// ExtractedItems
// ---------------------------------------------------------------------------

/// Work items returned by a reverse-engineering run, ready to be persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedItems {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_brief: Option<BusinessBrief>,
    #[serde(default)]
    pub initiatives: Vec<WorkItem>,
    #[serde(default)]
    pub features: Vec<WorkItem>,
    #[serde(default)]
    pub epics: Vec<WorkItem>,
    #[serde(default)]
    pub stories: Vec<WorkItem>,
}

// ---------------------------------------------------------------------------
// WorkItemStore
// ---------------------------------------------------------------------------

/// Process-wide collections. Only `add`, `clear_all` and `reload` grow or
/// shrink them.
#[derive(Debug, Clone, Default)]
pub struct WorkItemStore {
    data: Snapshot,
}

impl WorkItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut store = Self::new();
        store.reload(snapshot)?;
        Ok(store)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.data
    }

    pub fn counts(&self) -> Counts {
        self.data.counts()
    }

    pub fn items(&self, kind: WorkItemKind) -> &[WorkItem] {
        self.data.items(kind)
    }

    pub fn portfolios(&self) -> &[Portfolio] {
        &self.data.portfolios
    }

    pub fn business_briefs(&self) -> &[BusinessBrief] {
        &self.data.business_briefs
    }

    pub fn get(&self, kind: WorkItemKind, id: &str) -> Option<&WorkItem> {
        self.data.items(kind).iter().find(|i| i.id == id)
    }

    /// Look an id up across all four collections.
    pub fn find(&self, id: &str) -> Option<&WorkItem> {
        WorkItemKind::all()
            .iter()
            .find_map(|&kind| self.get(kind, id))
    }

    /// Append an item to the collection of `kind`, stamping the kind.
    pub fn add(&mut self, kind: WorkItemKind, mut item: WorkItem) -> Result<()> {
        paths::validate_id(&item.id)?;
        if self.get(kind, &item.id).is_some() {
            return Err(AuraError::WorkItemExists {
                kind: kind.to_string(),
                id: item.id,
            });
        }
        item.kind = kind;
        self.data.items_mut(kind).push(item);
        Ok(())
    }

    pub fn add_portfolio(&mut self, portfolio: Portfolio) -> Result<()> {
        paths::validate_id(&portfolio.id)?;
        self.data.portfolios.retain(|p| p.id != portfolio.id);
        self.data.portfolios.push(portfolio);
        Ok(())
    }

    pub fn add_business_brief(&mut self, brief: BusinessBrief) -> Result<()> {
        paths::validate_id(&brief.id)?;
        self.data.business_briefs.retain(|b| b.id != brief.id);
        self.data.business_briefs.push(brief);
        Ok(())
    }

    pub fn update<F>(&mut self, kind: WorkItemKind, id: &str, f: F) -> Result<&WorkItem>
    where
        F: FnOnce(&mut WorkItem),
    {
        let item = self
            .data
            .items_mut(kind)
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AuraError::WorkItemNotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            })?;
        f(item);
        item.kind = kind;
        item.updated_at = Some(Utc::now());
        Ok(&*item)
    }

    pub fn remove(&mut self, kind: WorkItemKind, id: &str) -> Result<WorkItem> {
        let items = self.data.items_mut(kind);
        let pos = items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| AuraError::WorkItemNotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            })?;
        Ok(items.remove(pos))
    }

    /// Empty the four work-item collections. Portfolios and briefs are kept.
    pub fn clear_all(&mut self) {
        for &kind in WorkItemKind::all() {
            self.data.items_mut(kind).clear();
        }
    }

    /// Clear, then add every item of `snapshot`, as one step.
    ///
    /// The new contents are staged first, so a rejected item leaves the
    /// store exactly as it was.
    pub fn reload(&mut self, snapshot: Snapshot) -> Result<Counts> {
        let mut staged = WorkItemStore {
            data: Snapshot {
                portfolios: snapshot.portfolios,
                business_briefs: snapshot.business_briefs,
                ..Snapshot::default()
            },
        };
        for (kind, items) in [
            (WorkItemKind::Initiative, snapshot.initiatives),
            (WorkItemKind::Feature, snapshot.features),
            (WorkItemKind::Epic, snapshot.epics),
            (WorkItemKind::Story, snapshot.stories),
        ] {
            for item in items {
                staged.add(kind, item)?;
            }
        }
        *self = staged;
        Ok(self.counts())
    }

    /// Persist reverse-engineered items through `add`. All or nothing: the
    /// first failure aborts the save and the store is left untouched.
    pub fn save_extracted(&mut self, extracted: ExtractedItems) -> Result<usize> {
        let mut staged = self.clone();
        let mut saved = 0;

        if let Some(brief) = extracted.business_brief {
            staged.add_business_brief(brief)?;
            saved += 1;
        }
        for (kind, items) in [
            (WorkItemKind::Initiative, extracted.initiatives),
            (WorkItemKind::Feature, extracted.features),
            (WorkItemKind::Epic, extracted.epics),
            (WorkItemKind::Story, extracted.stories),
        ] {
            for item in items {
                staged.add(kind, item)?;
                saved += 1;
            }
        }

        *self = staged;
        tracing::info!(saved, "saved extracted work items");
        Ok(saved)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_empty_collections_once() {
        let dir = TempDir::new().unwrap();
        let written = init_project(dir.path()).unwrap();
        assert_eq!(written.len(), 7);
        assert!(Snapshot::load(dir.path()).unwrap().is_empty());
        assert!(init_project(dir.path()).unwrap().is_empty());
    }

    fn item(kind: WorkItemKind, id: &str) -> WorkItem {
        WorkItem::new(kind, id, format!("{kind} {id}"))
    }

    fn fixture() -> Snapshot {
        Snapshot {
            initiatives: vec![
                item(WorkItemKind::Initiative, "I1"),
                item(WorkItemKind::Initiative, "I2"),
            ],
            features: vec![
                item(WorkItemKind::Feature, "F1"),
                item(WorkItemKind::Feature, "F2"),
                item(WorkItemKind::Feature, "F3"),
            ],
            epics: vec![item(WorkItemKind::Epic, "E1")],
            stories: vec![],
            portfolios: vec![Portfolio::new("P1", "Core")],
            business_briefs: vec![],
        }
    }

    #[test]
    fn clear_then_reload_yields_exact_counts() {
        let mut store = WorkItemStore::new();
        store
            .add(WorkItemKind::Story, item(WorkItemKind::Story, "OLD-S"))
            .unwrap();
        store
            .add(WorkItemKind::Initiative, item(WorkItemKind::Initiative, "I1"))
            .unwrap();

        store.clear_all();
        assert_eq!(store.counts().total(), 0);

        let counts = store.reload(fixture()).unwrap();
        assert_eq!(
            counts,
            Counts {
                initiatives: 2,
                features: 3,
                epics: 1,
                stories: 0
            }
        );
        assert!(store.get(WorkItemKind::Story, "OLD-S").is_none());
    }

    #[test]
    fn reload_replaces_without_duplication() {
        let mut store = WorkItemStore::from_snapshot(fixture()).unwrap();
        store.reload(fixture()).unwrap();
        assert_eq!(store.counts().initiatives, 2);
        assert_eq!(store.counts().features, 3);
    }

    #[test]
    fn failed_reload_leaves_store_untouched() {
        let mut store = WorkItemStore::from_snapshot(fixture()).unwrap();
        let mut bad = fixture();
        bad.features.push(item(WorkItemKind::Feature, "F1"));
        assert!(matches!(
            store.reload(bad),
            Err(AuraError::WorkItemExists { .. })
        ));
        assert_eq!(store.counts().features, 3);
    }

    #[test]
    fn add_rejects_duplicate_id_within_kind_only() {
        let mut store = WorkItemStore::new();
        store
            .add(WorkItemKind::Feature, item(WorkItemKind::Feature, "X1"))
            .unwrap();
        assert!(store
            .add(WorkItemKind::Feature, item(WorkItemKind::Feature, "X1"))
            .is_err());
        store
            .add(WorkItemKind::Epic, item(WorkItemKind::Epic, "X1"))
            .unwrap();
    }

    #[test]
    fn add_stamps_collection_kind() {
        let mut store = WorkItemStore::new();
        store
            .add(WorkItemKind::Epic, item(WorkItemKind::Initiative, "E9"))
            .unwrap();
        assert_eq!(store.get(WorkItemKind::Epic, "E9").unwrap().kind, WorkItemKind::Epic);
    }

    #[test]
    fn update_and_remove() {
        let mut store = WorkItemStore::from_snapshot(fixture()).unwrap();
        store
            .update(WorkItemKind::Feature, "F1", |f| {
                f.initiative_id = Some("I2".into())
            })
            .unwrap();
        assert_eq!(
            store.get(WorkItemKind::Feature, "F1").unwrap().parent_ref(),
            Some("I2")
        );
        store.remove(WorkItemKind::Feature, "F2").unwrap();
        assert_eq!(store.counts().features, 2);
        assert!(matches!(
            store.remove(WorkItemKind::Feature, "F2"),
            Err(AuraError::WorkItemNotFound { .. })
        ));
    }

    #[test]
    fn save_extracted_is_all_or_nothing() {
        let mut store = WorkItemStore::from_snapshot(fixture()).unwrap();
        let extracted = ExtractedItems {
            business_brief: Some(BusinessBrief::new("B9", "Reverse engineered")),
            initiatives: vec![item(WorkItemKind::Initiative, "I9")],
            // F1 collides, so nothing from this batch may land.
            features: vec![item(WorkItemKind::Feature, "F9"), item(WorkItemKind::Feature, "F1")],
            ..Default::default()
        };
        assert!(store.save_extracted(extracted).is_err());
        assert!(store.get(WorkItemKind::Initiative, "I9").is_none());
        assert!(store.business_briefs().is_empty());

        let ok = ExtractedItems {
            initiatives: vec![item(WorkItemKind::Initiative, "I9")],
            stories: vec![item(WorkItemKind::Story, "S9")],
            ..Default::default()
        };
        assert_eq!(store.save_extracted(ok).unwrap(), 2);
        assert_eq!(store.counts().stories, 1);
    }

    #[test]
    fn snapshot_file_roundtrip_stamps_kinds() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".aura")).unwrap();
        fixture().save(dir.path()).unwrap();

        let loaded = Snapshot::load(dir.path()).unwrap();
        assert_eq!(loaded.counts(), fixture().counts());
        assert!(loaded.epics.iter().all(|e| e.kind == WorkItemKind::Epic));
        assert_eq!(loaded.portfolios[0].name, "Core");
    }

    #[test]
    fn snapshot_tolerates_absent_collections() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".aura/data")).unwrap();
        std::fs::write(
            dir.path().join(".aura/data/features.yaml"),
            "- id: F1\n  title: Only feature\n  initiative_id: I1\n",
        )
        .unwrap();
        let loaded = Snapshot::load(dir.path()).unwrap();
        assert!(loaded.initiatives.is_empty());
        assert_eq!(loaded.features[0].parent_ref(), Some("I1"));
        assert_eq!(loaded.features[0].kind, WorkItemKind::Feature);
    }

    #[test]
    fn snapshot_requires_init() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Snapshot::load(dir.path()),
            Err(AuraError::NotInitialized)
        ));
    }
}
