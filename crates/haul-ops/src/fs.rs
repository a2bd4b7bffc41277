//! The filesystem adapter contract.

use std::path::{Path, PathBuf};

use haul_core::{FileEntry, FsResult};

/// Raw filesystem primitives the engine drives.
///
/// Calls are synchronous; the executor runs each one on the blocking pool.
/// Every failure must already be translated into an [`OperationError`]
/// carrying an [`ErrorKind`].
///
/// Adapters never overwrite: `copy`, `move_entry`, `create_entry` and
/// `compress` fail with `AlreadyExists` when the target is taken, since
/// naming decisions belong to the engine. `compress` and `extract` remove
/// any partial output before returning an error.
///
/// Extraction convention: `extract` unpacks into `dest_dir` and returns the
/// newly created top-level paths. The engine always passes a fresh staging
/// directory and applies conflict renaming afterwards, so adapters need no
/// name-hint support.
///
/// [`OperationError`]: haul_core::OperationError
/// [`ErrorKind`]: haul_core::ErrorKind
pub trait FileSystem: Send + Sync + 'static {
    /// List the children of a directory.
    fn list(&self, dir: &Path) -> FsResult<Vec<FileEntry>>;

    /// Read the metadata of a single entry.
    fn metadata(&self, path: &Path) -> FsResult<FileEntry>;

    /// Copy `src` to `dest` (recursive for directories).
    fn copy(&self, src: &Path, dest: &Path) -> FsResult<()>;

    /// Move `src` to `dest`.
    fn move_entry(&self, src: &Path, dest: &Path) -> FsResult<()>;

    /// Delete an entry (recursive for directories).
    fn delete(&self, path: &Path) -> FsResult<()>;

    /// Create an empty file or directory named `name` inside `parent`.
    fn create_entry(&self, parent: &Path, name: &str, is_dir: bool) -> FsResult<()>;

    /// Bundle `sources` into a new archive at `archive`.
    fn compress(&self, sources: &[PathBuf], archive: &Path) -> FsResult<()>;

    /// Unpack `archive` into `dest_dir`, returning the new top-level paths.
    fn extract(&self, archive: &Path, dest_dir: &Path) -> FsResult<Vec<PathBuf>>;
}
