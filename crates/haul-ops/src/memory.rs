//! In-memory adapter.
//!
//! Keeps a whole tree in a map, records every call and can be told to fail
//! specific paths. Useful for embedding the engine without touching disk and
//! for exercising failure paths deterministically.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use haul_core::{ErrorKind, FileEntry, FsResult, OperationError};
use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;

/// A call made against a [`MemoryFileSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCall {
    List(PathBuf),
    Metadata(PathBuf),
    Copy(PathBuf, PathBuf),
    Move(PathBuf, PathBuf),
    Delete(PathBuf),
    CreateEntry(PathBuf, bool),
    Compress(Vec<PathBuf>, PathBuf),
    Extract(PathBuf, PathBuf),
}

impl FsCall {
    /// Whether the call changes the tree.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Metadata(_))
    }
}

#[derive(Debug, Clone)]
struct Node {
    is_dir: bool,
    data: Vec<u8>,
    modified: SystemTime,
}

impl Node {
    fn dir() -> Self {
        Self {
            is_dir: true,
            data: Vec::new(),
            modified: SystemTime::now(),
        }
    }

    fn file(data: Vec<u8>) -> Self {
        Self {
            is_dir: false,
            data,
            modified: SystemTime::now(),
        }
    }
}

/// Serialized body of an archive produced by [`MemoryFileSystem::compress`].
#[derive(Debug, Serialize, Deserialize)]
struct ArchivedNode {
    path: PathBuf,
    is_dir: bool,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<PathBuf, Node>,
    faults: HashMap<PathBuf, ErrorKind>,
    calls: Vec<FsCall>,
}

impl State {
    fn check_fault(&self, path: &Path) -> FsResult<()> {
        match self.faults.get(path) {
            Some(kind) => Err(OperationError::new(*kind, path, "Injected failure")),
            None => Ok(()),
        }
    }

    fn node(&self, path: &Path) -> FsResult<&Node> {
        self.nodes
            .get(path)
            .ok_or_else(|| OperationError::not_found(path))
    }

    fn require_dir(&self, path: &Path) -> FsResult<()> {
        match self.nodes.get(path) {
            Some(node) if node.is_dir => Ok(()),
            _ => Err(OperationError::not_found(path)),
        }
    }

    fn require_vacant(&self, path: &Path) -> FsResult<()> {
        if self.nodes.contains_key(path) {
            return Err(OperationError::already_exists(path));
        }
        let parent = path
            .parent()
            .ok_or_else(|| OperationError::invalid_name(path, "Path has no parent"))?;
        self.require_dir(parent)
    }

    /// `root` and everything beneath it, relative to `root`.
    fn subtree(&self, root: &Path) -> Vec<(PathBuf, Node)> {
        self.nodes
            .iter()
            .filter(|(path, _)| path.starts_with(root))
            .filter_map(|(path, node)| {
                path.strip_prefix(root)
                    .ok()
                    .map(|rel| (rel.to_path_buf(), node.clone()))
            })
            .collect()
    }

    fn remove_subtree(&mut self, root: &Path) {
        self.nodes.retain(|path, _| !path.starts_with(root));
    }

    fn entry(&self, path: &Path, node: &Node) -> FileEntry {
        let entry = if node.is_dir {
            FileEntry::directory(path)
        } else {
            FileEntry::file(path).with_size(node.data.len() as u64)
        };
        entry.with_modified(node.modified)
    }
}

/// In-memory filesystem with call recording and fault injection.
#[derive(Debug)]
pub struct MemoryFileSystem {
    state: Mutex<State>,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    /// Create a filesystem containing only `/`.
    pub fn new() -> Self {
        let mut state = State::default();
        state.nodes.insert(PathBuf::from("/"), Node::dir());
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a directory and any missing parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let mut state = self.lock();
        let mut current = PathBuf::new();
        for component in path.as_ref().components() {
            current.push(component);
            state
                .nodes
                .entry(current.clone())
                .or_insert_with(Node::dir);
        }
        drop(state);
        self
    }

    /// Create a file (and missing parents) with the given contents.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> &Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.lock()
            .nodes
            .insert(path.to_path_buf(), Node::file(contents.into()));
        self
    }

    /// Make every call whose primary path is `path` fail with `kind`.
    pub fn fail_on(&self, path: impl Into<PathBuf>, kind: ErrorKind) -> &Self {
        self.lock().faults.insert(path.into(), kind);
        self
    }

    /// Snapshot of an entry, as the engine would see it.
    pub fn entry(&self, path: impl AsRef<Path>) -> Option<FileEntry> {
        let state = self.lock();
        let path = path.as_ref();
        state.nodes.get(path).map(|node| state.entry(path, node))
    }

    /// Whether anything exists at `path`.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.lock().nodes.contains_key(path.as_ref())
    }

    /// Contents of a file.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock()
            .nodes
            .get(path.as_ref())
            .filter(|node| !node.is_dir)
            .map(|node| node.data.clone())
    }

    /// Sorted names of the direct children of `dir`.
    pub fn children(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let dir = dir.as_ref();
        self.lock()
            .nodes
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<FsCall> {
        self.lock().calls.clone()
    }

    /// Number of mutating calls attempted, failed ones included.
    pub fn mutation_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_mutation()).count()
    }
}

impl FileSystem for MemoryFileSystem {
    fn list(&self, dir: &Path) -> FsResult<Vec<FileEntry>> {
        let mut state = self.lock();
        state.calls.push(FsCall::List(dir.to_path_buf()));
        state.check_fault(dir)?;
        state.require_dir(dir)?;

        Ok(state
            .nodes
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, node)| state.entry(path, node))
            .collect())
    }

    fn metadata(&self, path: &Path) -> FsResult<FileEntry> {
        let mut state = self.lock();
        state.calls.push(FsCall::Metadata(path.to_path_buf()));
        state.check_fault(path)?;
        let node = state.node(path)?;
        Ok(state.entry(path, node))
    }

    fn copy(&self, src: &Path, dest: &Path) -> FsResult<()> {
        let mut state = self.lock();
        state
            .calls
            .push(FsCall::Copy(src.to_path_buf(), dest.to_path_buf()));
        state.check_fault(src)?;
        state.node(src)?;
        state.require_vacant(dest)?;

        for (rel, node) in state.subtree(src) {
            let target = if rel.as_os_str().is_empty() {
                dest.to_path_buf()
            } else {
                dest.join(rel)
            };
            state.nodes.insert(target, node);
        }
        Ok(())
    }

    fn move_entry(&self, src: &Path, dest: &Path) -> FsResult<()> {
        let mut state = self.lock();
        state
            .calls
            .push(FsCall::Move(src.to_path_buf(), dest.to_path_buf()));
        state.check_fault(src)?;
        state.node(src)?;
        state.require_vacant(dest)?;

        let moved = state.subtree(src);
        state.remove_subtree(src);
        for (rel, node) in moved {
            let target = if rel.as_os_str().is_empty() {
                dest.to_path_buf()
            } else {
                dest.join(rel)
            };
            state.nodes.insert(target, node);
        }
        Ok(())
    }

    fn delete(&self, path: &Path) -> FsResult<()> {
        let mut state = self.lock();
        state.calls.push(FsCall::Delete(path.to_path_buf()));
        state.check_fault(path)?;
        state.node(path)?;
        state.remove_subtree(path);
        Ok(())
    }

    fn create_entry(&self, parent: &Path, name: &str, is_dir: bool) -> FsResult<()> {
        let path = parent.join(name);
        let mut state = self.lock();
        state.calls.push(FsCall::CreateEntry(path.clone(), is_dir));
        state.check_fault(&path)?;
        state.require_vacant(&path)?;

        let node = if is_dir {
            Node::dir()
        } else {
            Node::file(Vec::new())
        };
        state.nodes.insert(path, node);
        Ok(())
    }

    fn compress(&self, sources: &[PathBuf], archive: &Path) -> FsResult<()> {
        let mut state = self.lock();
        state
            .calls
            .push(FsCall::Compress(sources.to_vec(), archive.to_path_buf()));
        state.check_fault(archive)?;
        state.require_vacant(archive)?;

        let mut body = Vec::new();
        for source in sources {
            state.check_fault(source)?;
            state.node(source)?;
            let name = source
                .file_name()
                .ok_or_else(|| OperationError::invalid_name(source, "Path has no final segment"))?;
            for (rel, node) in state.subtree(source) {
                let path = if rel.as_os_str().is_empty() {
                    PathBuf::from(name)
                } else {
                    Path::new(name).join(rel)
                };
                body.push(ArchivedNode {
                    path,
                    is_dir: node.is_dir,
                    data: node.data,
                });
            }
        }

        let bytes = serde_json::to_vec(&body)
            .map_err(|e| OperationError::archive(archive, e.to_string()))?;
        state.nodes.insert(archive.to_path_buf(), Node::file(bytes));
        Ok(())
    }

    fn extract(&self, archive: &Path, dest_dir: &Path) -> FsResult<Vec<PathBuf>> {
        let mut state = self.lock();
        state
            .calls
            .push(FsCall::Extract(archive.to_path_buf(), dest_dir.to_path_buf()));
        state.check_fault(archive)?;
        state.require_dir(dest_dir)?;

        let body: Vec<ArchivedNode> = serde_json::from_slice(&state.node(archive)?.data)
            .map_err(|e| OperationError::archive(archive, e.to_string()))?;

        let mut top_level: Vec<PathBuf> = Vec::new();
        for item in &body {
            let safe = item
                .path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            let Some(first) = item.path.components().next().filter(|_| safe) else {
                return Err(OperationError::archive(
                    archive,
                    format!("Entry escapes the destination: {}", item.path.display()),
                ));
            };
            let top = dest_dir.join(first);
            if !top_level.contains(&top) {
                if state.nodes.contains_key(&top) {
                    return Err(OperationError::already_exists(&top));
                }
                top_level.push(top);
            }
        }

        for item in body {
            let node = if item.is_dir {
                Node::dir()
            } else {
                Node::file(item.data)
            };
            state.nodes.insert(dest_dir.join(item.path), node);
        }

        top_level.sort();
        Ok(top_level)
    }
}
