//! File and directory entry types.

use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::ArchiveFormat;

/// Read/write/execute flags for the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
}

impl Permissions {
    /// Create a new permission set.
    pub fn new(readable: bool, writable: bool, executable: bool) -> Self {
        Self {
            readable,
            writable,
            executable,
        }
    }

    /// Derive permissions from platform metadata.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let mode = metadata.permissions().mode();
        Self {
            readable: mode & 0o444 != 0,
            writable: mode & 0o222 != 0,
            executable: mode & 0o111 != 0,
        }
    }

    /// Derive permissions from platform metadata.
    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            readable: true,
            writable: !metadata.permissions().readonly(),
            executable: false,
        }
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::new(true, true, false)
    }
}

/// A file or directory identified by its absolute, normalized path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute, normalized path. Unique within a filesystem root.
    pub path: PathBuf,
    /// Final path segment.
    pub name: CompactString,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Access flags.
    pub permissions: Permissions,
}

impl FileEntry {
    fn new(path: impl AsRef<Path>, is_dir: bool) -> Self {
        let path = normalize_path(path.as_ref());
        let name = path
            .file_name()
            .map(|n| CompactString::from(n.to_string_lossy()))
            .unwrap_or_default();
        Self {
            path,
            name,
            is_dir,
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            permissions: Permissions::default(),
        }
    }

    /// Create a file entry with default metadata.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(path, false)
    }

    /// Create a directory entry with default metadata.
    pub fn directory(path: impl AsRef<Path>) -> Self {
        Self::new(path, true)
    }

    /// Create an entry from platform metadata.
    pub fn from_metadata(path: impl AsRef<Path>, metadata: &Metadata) -> Self {
        let is_dir = metadata.is_dir();
        let mut entry = Self::new(path, is_dir);
        entry.size = if is_dir { 0 } else { metadata.len() };
        entry.modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        entry.permissions = Permissions::from_metadata(metadata);
        entry
    }

    /// Set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Set the modification time.
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = modified;
        self
    }

    /// Set the access flags.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Parent directory path, if any.
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// True when `other` is this entry or lies beneath it.
    pub fn contains(&self, other: &Path) -> bool {
        other.starts_with(&self.path)
    }

    /// Archive format implied by the name, if any.
    pub fn archive_format(&self) -> Option<ArchiveFormat> {
        if self.is_dir {
            None
        } else {
            ArchiveFormat::detect(&self.name)
        }
    }
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the parent.
///
/// Does not touch the filesystem, so symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
