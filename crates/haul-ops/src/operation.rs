//! File operation request types.

use std::path::PathBuf;

use haul_core::{
    normalize_path, validate_name, ArchiveFormat, EngineConfig, FileEntry, OperationError,
};
use serde::{Deserialize, Serialize};

/// Identifier assigned to a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of operation, without its payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum OperationKind {
    Copy,
    Cut,
    Delete,
    #[strum(serialize = "Create")]
    CreateEntry,
    Rename,
    Compress,
    Extract,
}

/// An operation together with the parameters only it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Copy sources into the destination.
    Copy,
    /// Move sources into the destination.
    Cut,
    /// Delete sources.
    Delete,
    /// Create one empty file or directory in the destination.
    CreateEntry { name: String, is_directory: bool },
    /// Rename the single source within its parent.
    Rename { new_name: String },
    /// Bundle all sources into one archive in the destination.
    Compress { archive_name: Option<String> },
    /// Unpack the single source archive into the destination.
    Extract,
}

impl Operation {
    /// The payload-free kind.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Copy => OperationKind::Copy,
            Self::Cut => OperationKind::Cut,
            Self::Delete => OperationKind::Delete,
            Self::CreateEntry { .. } => OperationKind::CreateEntry,
            Self::Rename { .. } => OperationKind::Rename,
            Self::Compress { .. } => OperationKind::Compress,
            Self::Extract => OperationKind::Extract,
        }
    }
}

/// An immutable description of one operation to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    operation: Operation,
    sources: Vec<FileEntry>,
    destination: FileEntry,
}

impl OperationRequest {
    /// Create a request from its parts.
    pub fn new(operation: Operation, sources: Vec<FileEntry>, destination: FileEntry) -> Self {
        Self {
            operation,
            sources,
            destination,
        }
    }

    /// Copy `sources` into `destination`.
    pub fn copy(sources: Vec<FileEntry>, destination: FileEntry) -> Self {
        Self::new(Operation::Copy, sources, destination)
    }

    /// Move `sources` into `destination`.
    pub fn cut(sources: Vec<FileEntry>, destination: FileEntry) -> Self {
        Self::new(Operation::Cut, sources, destination)
    }

    /// Delete `sources`; `destination` is the directory being viewed.
    pub fn delete(sources: Vec<FileEntry>, destination: FileEntry) -> Self {
        Self::new(Operation::Delete, sources, destination)
    }

    /// Create an empty file or directory named `name` inside `destination`.
    pub fn create_entry(destination: FileEntry, name: impl Into<String>, is_directory: bool) -> Self {
        Self::new(
            Operation::CreateEntry {
                name: name.into(),
                is_directory,
            },
            Vec::new(),
            destination,
        )
    }

    /// Rename `source` to `new_name` within its parent directory.
    pub fn rename(source: FileEntry, new_name: impl Into<String>) -> Self {
        let parent = source
            .parent()
            .map(FileEntry::directory)
            .unwrap_or_else(|| source.clone());
        Self::new(
            Operation::Rename {
                new_name: new_name.into(),
            },
            vec![source],
            parent,
        )
    }

    /// Bundle `sources` into an archive inside `destination`.
    pub fn compress(
        sources: Vec<FileEntry>,
        destination: FileEntry,
        archive_name: Option<String>,
    ) -> Self {
        Self::new(Operation::Compress { archive_name }, sources, destination)
    }

    /// Unpack `archive` into `destination`.
    pub fn extract(archive: FileEntry, destination: FileEntry) -> Self {
        Self::new(Operation::Extract, vec![archive], destination)
    }

    /// The operation and its parameters.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// The payload-free kind.
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// Source entries, in processing order.
    pub fn sources(&self) -> &[FileEntry] {
        &self.sources
    }

    /// Destination directory.
    pub fn destination(&self) -> &FileEntry {
        &self.destination
    }

    /// Archive name supplied for a Compress request.
    pub fn archive_name(&self) -> Option<&str> {
        match &self.operation {
            Operation::Compress { archive_name } => archive_name.as_deref(),
            _ => None,
        }
    }

    /// Number of progress steps the request will report.
    pub fn total_steps(&self) -> usize {
        match self.operation {
            Operation::Copy | Operation::Cut | Operation::Delete => self.sources.len(),
            _ => 1,
        }
    }

    /// File name of the archive a Compress request will produce, before
    /// conflict resolution.
    ///
    /// A supplied name wins; otherwise a sole source lends its name (the stem
    /// for files, the full name for directories).
    pub fn archive_file_name(&self, format: ArchiveFormat) -> Option<String> {
        if let Some(name) = self.archive_name() {
            return Some(format.file_name(name));
        }
        match self.sources.as_slice() {
            [source] => {
                let base = if source.is_dir {
                    source.name.as_str()
                } else {
                    haul_core::split_name(&source.name, false).0
                };
                Some(format.file_name(base))
            }
            _ => None,
        }
    }

    /// Check everything that can be checked without touching the filesystem.
    ///
    /// Any error here rejects the whole request before a single mutation.
    pub fn validate(&self, config: &EngineConfig) -> Result<(), OperationError> {
        let destination = &self.destination.path;

        if !self.destination.is_dir {
            return Err(OperationError::invalid_request(
                destination,
                "Destination is not a directory",
            ));
        }

        for entry in std::iter::once(&self.destination).chain(&self.sources) {
            if !entry.path.is_absolute() {
                return Err(OperationError::invalid_request(
                    &entry.path,
                    "Paths must be absolute",
                ));
            }
            // The ancestor check below is lexical, so `..` segments must be gone.
            if entry.path != normalize_path(&entry.path) {
                return Err(OperationError::invalid_request(
                    &entry.path,
                    "Paths must be normalized",
                ));
            }
        }

        self.validate_cardinality()?;

        if let Some(source) = self.sources.iter().find(|s| s.contains(destination)) {
            return Err(OperationError::ancestor_conflict(&source.path, destination));
        }

        let check = |name: &str| -> Result<(), OperationError> {
            validate_name(name, config.strict_names)
                .map_err(|message| OperationError::invalid_name(destination.join(name), message))
        };

        match &self.operation {
            Operation::CreateEntry { name, .. } => check(name)?,
            Operation::Rename { new_name } => {
                check(new_name)?;
                let source = &self.sources[0];
                if source.parent() != Some(destination.as_path()) {
                    return Err(OperationError::invalid_request(
                        &source.path,
                        "Rename stays within the entry's parent directory",
                    ));
                }
            }
            Operation::Compress { archive_name } => match archive_name {
                Some(name) => check(name)?,
                None if self.sources.len() > 1 => {
                    return Err(OperationError::invalid_request(
                        destination,
                        "An archive name is required when compressing several entries",
                    ));
                }
                None => {}
            },
            Operation::Extract => {
                let source = &self.sources[0];
                if source.is_dir {
                    return Err(OperationError::archive(&source.path, "Not an archive"));
                }
            }
            Operation::Copy | Operation::Cut | Operation::Delete => {}
        }

        Ok(())
    }

    fn validate_cardinality(&self) -> Result<(), OperationError> {
        let count = self.sources.len();
        let expected = match self.operation {
            Operation::CreateEntry { .. } => count == 0,
            Operation::Rename { .. } | Operation::Extract => count == 1,
            _ => count > 0,
        };

        if expected {
            Ok(())
        } else {
            let message = match count {
                0 => "No entries selected".to_string(),
                n => format!("{} does not accept {n} entries", self.kind()),
            };
            Err(OperationError::invalid_request(&self.destination.path, message))
        }
    }

    /// Source paths, in order.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.sources.iter().map(|s| s.path.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_core::ErrorKind;

    fn dir(path: &str) -> FileEntry {
        FileEntry::directory(path)
    }

    fn file(path: &str) -> FileEntry {
        FileEntry::file(path)
    }

    fn kind_of(request: &OperationRequest) -> Option<ErrorKind> {
        request.validate(&EngineConfig::default()).err().map(|e| e.kind)
    }

    #[test]
    fn test_valid_copy() {
        let request = OperationRequest::copy(vec![file("/a/x.txt")], dir("/b"));
        assert_eq!(kind_of(&request), None);
        assert_eq!(request.total_steps(), 1);
    }

    #[test]
    fn test_destination_must_be_directory() {
        let request = OperationRequest::copy(vec![file("/a/x.txt")], file("/b/y.txt"));
        assert_eq!(kind_of(&request), Some(ErrorKind::InvalidRequest));
    }

    #[test]
    fn test_empty_sources_rejected() {
        let request = OperationRequest::delete(vec![], dir("/a"));
        assert_eq!(kind_of(&request), Some(ErrorKind::InvalidRequest));
    }

    #[test]
    fn test_ancestor_and_self_rejected() {
        let request = OperationRequest::copy(vec![dir("/a")], dir("/a/b/c"));
        assert_eq!(kind_of(&request), Some(ErrorKind::AncestorConflict));

        let request = OperationRequest::cut(vec![file("/x.txt"), dir("/a")], dir("/a"));
        assert_eq!(kind_of(&request), Some(ErrorKind::AncestorConflict));

        let request = OperationRequest::copy(vec![dir("/a")], dir("/ab"));
        assert_eq!(kind_of(&request), None);
    }

    #[test]
    fn test_create_entry_names() {
        let ok = OperationRequest::create_entry(dir("/a"), "notes.txt", false);
        assert_eq!(kind_of(&ok), None);
        assert_eq!(ok.total_steps(), 1);

        for bad in ["", "a/b", ".."] {
            let request = OperationRequest::create_entry(dir("/a"), bad, true);
            assert_eq!(kind_of(&request), Some(ErrorKind::InvalidName), "{bad:?}");
        }
    }

    #[test]
    fn test_rename_destination_is_parent() {
        let request = OperationRequest::rename(file("/a/x.txt"), "y.txt");
        assert_eq!(request.destination().path, PathBuf::from("/a"));
        assert_eq!(kind_of(&request), None);

        let request = OperationRequest::rename(file("/a/x.txt"), "sub/y.txt");
        assert_eq!(kind_of(&request), Some(ErrorKind::InvalidName));

        let moved = OperationRequest::new(
            Operation::Rename {
                new_name: "y.txt".into(),
            },
            vec![file("/a/x.txt")],
            dir("/b"),
        );
        assert_eq!(kind_of(&moved), Some(ErrorKind::InvalidRequest));
    }

    #[test]
    fn test_compress_archive_name_rules() {
        let many = OperationRequest::compress(vec![file("/a/x.txt"), file("/a/y.txt")], dir("/a"), None);
        assert_eq!(kind_of(&many), Some(ErrorKind::InvalidRequest));

        let named = OperationRequest::compress(
            vec![file("/a/x.txt"), file("/a/y.txt")],
            dir("/a"),
            Some("both".into()),
        );
        assert_eq!(kind_of(&named), None);
        assert_eq!(
            named.archive_file_name(ArchiveFormat::Zip).as_deref(),
            Some("both.zip")
        );

        let single = OperationRequest::compress(vec![file("/a/x.txt")], dir("/a"), None);
        assert_eq!(kind_of(&single), None);
        assert_eq!(
            single.archive_file_name(ArchiveFormat::Zip).as_deref(),
            Some("x.zip")
        );

        let folder = OperationRequest::compress(vec![dir("/a/site.v2")], dir("/a"), None);
        assert_eq!(
            folder.archive_file_name(ArchiveFormat::TarGz).as_deref(),
            Some("site.v2.tar.gz")
        );
    }

    #[test]
    fn test_extract_requires_single_file() {
        let request = OperationRequest::extract(dir("/a/folder"), dir("/a"));
        assert_eq!(kind_of(&request), Some(ErrorKind::ArchiveFormatError));

        let request = OperationRequest::new(
            Operation::Extract,
            vec![file("/a/x.zip"), file("/a/y.zip")],
            dir("/a"),
        );
        assert_eq!(kind_of(&request), Some(ErrorKind::InvalidRequest));
    }

    #[test]
    fn test_relative_paths_rejected() {
        let request = OperationRequest::copy(vec![file("x.txt")], dir("/b"));
        assert_eq!(kind_of(&request), Some(ErrorKind::InvalidRequest));
    }

    #[test]
    fn test_unnormalized_paths_rejected() {
        // `/a/b/..` is `/a`, an ancestor of the destination.
        let mut source = dir("/a");
        source.path = PathBuf::from("/a/b/..");
        let request = OperationRequest::copy(vec![source], dir("/a/c"));
        assert_eq!(kind_of(&request), Some(ErrorKind::InvalidRequest));

        let mut destination = dir("/b");
        destination.path = PathBuf::from("/b/../c");
        let request = OperationRequest::copy(vec![file("/a/x.txt")], destination);
        assert_eq!(kind_of(&request), Some(ErrorKind::InvalidRequest));

        let request = OperationRequest::copy(vec![file("/a/b/../x.txt")], dir("/b"));
        assert_eq!(request.sources()[0].path, PathBuf::from("/a/x.txt"));
        assert_eq!(kind_of(&request), None);
    }
}
