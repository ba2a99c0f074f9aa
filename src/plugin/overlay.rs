//! Virtual file overlay.
//!
//! Maps absolute synthetic paths to in-memory module records. Populated once
//! per run before bundling and dropped when the batch build returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::utils;
use crate::{ScriptDialect, WidgetSource};

/// One synthesized module that only exists in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRecord {
    pub absolute_path: PathBuf,
    pub content: String,
    pub dialect: ScriptDialect,
    /// Directory the content's relative imports are resolved against.
    pub base_directory: PathBuf,
    /// Position of the owning widget in the run; scopes every module the
    /// entry pulls in.
    pub widget_index: usize,
}

/// Thread-safe overlay table keyed by normalized absolute path.
#[derive(Debug, Clone, Default)]
pub struct VirtualOverlay {
    records: Arc<DashMap<PathBuf, OverlayRecord>>,
}

impl VirtualOverlay {
    /// Create a new empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the overlay for a set of discovered widgets: one record per
    /// widget at `<widgets-root>/<directory_name>/entry.<ext>`.
    pub fn for_widgets(widgets_root: &Path, sources: &[WidgetSource]) -> Self {
        let overlay = Self::new();
        for (widget_index, source) in sources.iter().enumerate() {
            let base_directory = utils::normalize_path(&widgets_root.join(&source.directory_name));
            overlay.insert(OverlayRecord {
                absolute_path: utils::synthetic_entry_path(
                    widgets_root,
                    &source.directory_name,
                    source.script_dialect,
                ),
                content: source.entry_script_text.clone(),
                dialect: source.script_dialect,
                base_directory,
                widget_index,
            });
        }
        overlay
    }

    /// Insert or overwrite a record. Returns the old record if any.
    pub fn insert(&self, record: OverlayRecord) -> Option<OverlayRecord> {
        let key = utils::normalize_path(&record.absolute_path);
        self.records.insert(key, record)
    }

    /// Exact-path lookup.
    pub fn get(&self, path: &Path) -> Option<OverlayRecord> {
        self.records
            .get(&utils::normalize_path(path))
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(&utils::normalize_path(path))
    }

    /// Base directory recorded for an overlay path.
    pub fn base_directory(&self, path: &Path) -> Option<PathBuf> {
        self.records
            .get(&utils::normalize_path(path))
            .map(|entry| entry.value().base_directory.clone())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the overlay is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.records.clear();
    }
}
