//! Selection of entries within one directory view.

use std::path::{Path, PathBuf};

use haul_core::FileEntry;
use indexmap::IndexMap;

/// Insertion-ordered set of selected entries, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    entries: IndexMap<PathBuf, FileEntry>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns false if it was already selected.
    pub fn select(&mut self, entry: FileEntry) -> bool {
        if self.entries.contains_key(&entry.path) {
            return false;
        }
        self.entries.insert(entry.path.clone(), entry);
        true
    }

    pub fn deselect(&mut self, path: &Path) -> Option<FileEntry> {
        self.entries.shift_remove(path)
    }

    /// Flip selection of an entry. Returns whether it is now selected.
    pub fn toggle(&mut self, entry: FileEntry) -> bool {
        if self.entries.shift_remove(&entry.path).is_some() {
            false
        } else {
            self.entries.insert(entry.path.clone(), entry);
            true
        }
    }

    /// Select every entry of a listing, keeping existing order first.
    pub fn select_all(&mut self, entries: impl IntoIterator<Item = FileEntry>) {
        for entry in entries {
            self.entries.entry(entry.path.clone()).or_insert(entry);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_selected(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Selected entries, in selection order.
    pub fn selected(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the selection in order and clear it.
    pub fn take(&mut self) -> Vec<FileEntry> {
        std::mem::take(&mut self.entries).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_order_and_toggle() {
        let mut selection = SelectionModel::new();
        assert!(selection.select(FileEntry::file("/d/b.txt")));
        assert!(selection.select(FileEntry::file("/d/a.txt")));
        assert!(!selection.select(FileEntry::file("/d/b.txt")));

        assert!(!selection.toggle(FileEntry::file("/d/b.txt")));
        assert!(selection.toggle(FileEntry::directory("/d/c")));

        let names: Vec<&str> = selection.selected().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "c"]);
    }

    #[test]
    fn test_select_all_and_take() {
        let mut selection = SelectionModel::new();
        selection.select(FileEntry::file("/d/z"));
        selection.select_all([FileEntry::file("/d/a"), FileEntry::file("/d/z")]);
        assert_eq!(selection.len(), 2);
        assert!(selection.is_selected(Path::new("/d/a")));

        let taken = selection.take();
        assert_eq!(taken[0].path, PathBuf::from("/d/z"));
        assert_eq!(taken[1].path, PathBuf::from("/d/a"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_deselect() {
        let mut selection = SelectionModel::new();
        selection.select(FileEntry::file("/d/a"));
        assert!(selection.deselect(Path::new("/d/a")).is_some());
        assert!(selection.deselect(Path::new("/d/a")).is_none());
    }
}
