//! Local disk adapter built on `std::fs`.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use haul_core::{ArchiveFormat, FileEntry, FsResult, OperationError};
use serde::Serialize;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::fs::FileSystem;

/// Text statistics are only computed for files up to this size.
const TEXT_STATS_LIMIT: u64 = 1024 * 1024;

/// Adapter over the local disk.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
    /// Move deleted entries to the platform trash instead of unlinking them.
    pub use_trash: bool,
}

/// Metadata plus text statistics for a single entry.
#[derive(Debug, Clone, Serialize)]
pub struct Properties {
    pub entry: FileEntry,
    pub lines: Option<usize>,
    pub words: Option<usize>,
    pub chars: Option<usize>,
}

impl LocalFileSystem {
    /// Create an adapter that deletes permanently.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter that deletes to the trash.
    pub fn with_trash() -> Self {
        Self { use_trash: true }
    }

    /// Metadata plus line/word/character counts for small text files.
    pub fn properties(&self, path: &Path) -> FsResult<Properties> {
        let entry = self.metadata(path)?;

        let text = if !entry.is_dir && entry.size <= TEXT_STATS_LIMIT {
            fs::read_to_string(path).ok()
        } else {
            None
        };

        Ok(Properties {
            lines: text.as_ref().map(|t| t.lines().count()),
            words: text.as_ref().map(|t| t.split_whitespace().count()),
            chars: text.as_ref().map(|t| t.chars().count()),
            entry,
        })
    }
}

impl FileSystem for LocalFileSystem {
    fn list(&self, dir: &Path) -> FsResult<Vec<FileEntry>> {
        let metadata = fs::metadata(dir).map_err(|e| OperationError::io(dir, &e))?;
        if !metadata.is_dir() {
            return Err(OperationError::not_found(dir));
        }

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(dir).map_err(|e| OperationError::io(dir, &e))? {
            let dir_entry = dir_entry.map_err(|e| OperationError::io(dir, &e))?;
            let path = dir_entry.path();
            // Entries that vanish mid-listing are skipped.
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            entries.push(FileEntry::from_metadata(&path, &metadata));
        }

        Ok(entries)
    }

    fn metadata(&self, path: &Path) -> FsResult<FileEntry> {
        let metadata = fs::metadata(path).map_err(|e| OperationError::io(path, &e))?;
        Ok(FileEntry::from_metadata(path, &metadata))
    }

    fn copy(&self, src: &Path, dest: &Path) -> FsResult<()> {
        let file_type = fs::symlink_metadata(src)
            .map_err(|e| OperationError::io(src, &e))?
            .file_type();
        ensure_vacant(dest)?;

        copy_any(src, dest, file_type)
    }

    fn move_entry(&self, src: &Path, dest: &Path) -> FsResult<()> {
        let file_type = fs::symlink_metadata(src)
            .map_err(|e| OperationError::io(src, &e))?
            .file_type();
        ensure_vacant(dest)?;

        match fs::rename(src, dest) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(src = %src.display(), dest = %dest.display(), "Moving across devices");
                move_by_copy(src, dest, file_type)
            }
            Err(e) => Err(OperationError::io(src, &e)),
        }
    }

    fn delete(&self, path: &Path) -> FsResult<()> {
        let metadata = fs::symlink_metadata(path).map_err(|e| OperationError::io(path, &e))?;

        if self.use_trash {
            return trash::delete(path).map_err(|e| OperationError::other(path, e.to_string()));
        }

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| OperationError::io(path, &e))
    }

    fn create_entry(&self, parent: &Path, name: &str, is_dir: bool) -> FsResult<()> {
        let path = parent.join(name);
        let result = if is_dir {
            fs::create_dir(&path)
        } else {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .map(|_| ())
        };
        result.map_err(|e| OperationError::io(&path, &e))
    }

    fn compress(&self, sources: &[PathBuf], archive: &Path) -> FsResult<()> {
        let format = ArchiveFormat::detect(&archive.to_string_lossy()).ok_or_else(|| {
            OperationError::archive(archive, "Unknown archive extension")
        })?;

        let file = File::create_new(archive).map_err(|e| OperationError::io(archive, &e))?;

        let result = match format {
            ArchiveFormat::Zip => write_zip(file, sources, archive),
            ArchiveFormat::TarGz => write_tar_gz(file, sources, archive),
        };

        if result.is_err() {
            if let Err(e) = fs::remove_file(archive) {
                tracing::warn!(path = %archive.display(), error = %e, "Failed to remove partial archive");
            }
        }
        result
    }

    fn extract(&self, archive: &Path, dest_dir: &Path) -> FsResult<Vec<PathBuf>> {
        let format = ArchiveFormat::detect(&archive.to_string_lossy()).ok_or_else(|| {
            OperationError::archive(archive, "Unknown archive extension")
        })?;

        let before = child_names(dest_dir)?;

        let result = match format {
            ArchiveFormat::Zip => read_zip(archive, dest_dir),
            ArchiveFormat::TarGz => read_tar_gz(archive, dest_dir),
        };

        let after = child_names(dest_dir)?;
        let mut created: Vec<PathBuf> = after
            .difference(&before)
            .map(|name| dest_dir.join(name))
            .collect();
        created.sort();

        match result {
            Ok(()) => Ok(created),
            Err(e) => {
                for path in &created {
                    if let Err(cleanup) = self.delete(path) {
                        tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial extraction");
                    }
                }
                Err(e)
            }
        }
    }
}

/// Fail with `AlreadyExists` when something is at `path`.
fn ensure_vacant(path: &Path) -> FsResult<()> {
    if fs::symlink_metadata(path).is_ok() {
        return Err(OperationError::already_exists(path));
    }
    Ok(())
}

/// Copy `src` to the vacant `dest`. Leaves nothing at `dest` on failure.
///
/// Symlinks are recreated, never followed.
fn copy_any(src: &Path, dest: &Path, file_type: fs::FileType) -> FsResult<()> {
    let result = if file_type.is_symlink() {
        copy_symlink(src, dest)
    } else if file_type.is_dir() {
        fs::create_dir(dest).map_err(|e| OperationError::io(dest, &e))?;
        copy_dir_contents(src, dest)
    } else {
        copy_file(src, dest)
    };

    if result.is_err() {
        remove_partial(dest);
    }
    result
}

fn copy_dir_contents(src: &Path, dest: &Path) -> FsResult<()> {
    for entry in fs::read_dir(src).map_err(|e| OperationError::io(src, &e))? {
        let entry = entry.map_err(|e| OperationError::io(src, &e))?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| OperationError::io(&path, &e))?;

        if file_type.is_symlink() {
            copy_symlink(&path, &dest_path)?;
        } else if file_type.is_dir() {
            fs::create_dir(&dest_path).map_err(|e| OperationError::io(&dest_path, &e))?;
            copy_dir_contents(&path, &dest_path)?;
        } else {
            copy_file(&path, &dest_path)?;
        }
    }

    Ok(())
}

fn copy_file(src: &Path, dest: &Path) -> FsResult<()> {
    fs::copy(src, dest)
        .map(|_| ())
        .map_err(|e| OperationError::io(src, &e))
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> FsResult<()> {
    let target = fs::read_link(src).map_err(|e| OperationError::io(src, &e))?;
    std::os::unix::fs::symlink(&target, dest).map_err(|e| OperationError::io(dest, &e))
}

#[cfg(windows)]
fn copy_symlink(src: &Path, dest: &Path) -> FsResult<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    let target = fs::read_link(src).map_err(|e| OperationError::io(src, &e))?;
    let points_to_dir = fs::metadata(src).map(|m| m.is_dir()).unwrap_or(false);
    let result = if points_to_dir {
        symlink_dir(&target, dest)
    } else {
        symlink_file(&target, dest)
    };
    result.map_err(|e| OperationError::io(dest, &e))
}

/// Copy then delete, for moves that `rename` cannot do.
///
/// When a file source cannot be removed the copy is undone. A directory
/// source may be partly removed by then, so its copy is kept and named in
/// the error instead.
fn move_by_copy(src: &Path, dest: &Path, file_type: fs::FileType) -> FsResult<()> {
    copy_any(src, dest, file_type)?;

    if file_type.is_dir() {
        fs::remove_dir_all(src).map_err(|e| {
            let mut error = OperationError::io(src, &e);
            error.message = format!("{}; copy kept at {}", error.message, dest.display());
            error
        })
    } else {
        fs::remove_file(src).map_err(|e| {
            remove_partial(dest);
            OperationError::io(src, &e)
        })
    }
}

/// Best-effort removal of something this adapter just wrote.
fn remove_partial(path: &Path) {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial copy");
    }
}

fn child_names(dir: &Path) -> FsResult<HashSet<OsString>> {
    let mut names = HashSet::new();
    for entry in fs::read_dir(dir).map_err(|e| OperationError::io(dir, &e))? {
        let entry = entry.map_err(|e| OperationError::io(dir, &e))?;
        names.insert(entry.file_name());
    }
    Ok(names)
}

fn entry_name(path: &Path) -> FsResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| OperationError::invalid_name(path, "Path has no final segment"))
}

fn zip_error(path: &Path, err: ZipError) -> OperationError {
    match err {
        ZipError::Io(e) => OperationError::io(path, &e),
        other => OperationError::archive(path, other.to_string()),
    }
}

/// Corrupt or truncated streams surface as I/O errors from the decoders.
fn archive_io_error(path: &Path, err: &io::Error) -> OperationError {
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            OperationError::archive(path, err.to_string())
        }
        _ => OperationError::io(path, err),
    }
}

fn write_zip(file: File, sources: &[PathBuf], archive: &Path) -> FsResult<()> {
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for source in sources {
        let name = entry_name(source)?;
        add_to_zip(&mut writer, source, &name, options, archive)?;
    }

    writer.finish().map_err(|e| zip_error(archive, e))?;
    Ok(())
}

fn add_to_zip(
    writer: &mut ZipWriter<File>,
    path: &Path,
    name: &str,
    options: SimpleFileOptions,
    archive: &Path,
) -> FsResult<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| OperationError::io(path, &e))?;

    // Linked files are stored by content; linked directories could loop.
    let is_dir = if metadata.is_symlink() {
        let target = fs::metadata(path).map_err(|e| OperationError::io(path, &e))?;
        if target.is_dir() {
            tracing::warn!(path = %path.display(), "Skipping directory symlink");
            return Ok(());
        }
        false
    } else {
        metadata.is_dir()
    };

    if is_dir {
        writer
            .add_directory(format!("{name}/"), options)
            .map_err(|e| zip_error(archive, e))?;

        for entry in fs::read_dir(path).map_err(|e| OperationError::io(path, &e))? {
            let entry = entry.map_err(|e| OperationError::io(path, &e))?;
            let child = format!("{name}/{}", entry.file_name().to_string_lossy());
            add_to_zip(writer, &entry.path(), &child, options, archive)?;
        }
    } else {
        writer
            .start_file(name, options)
            .map_err(|e| zip_error(archive, e))?;
        let mut src = File::open(path).map_err(|e| OperationError::io(path, &e))?;
        io::copy(&mut src, writer).map_err(|e| OperationError::io(path, &e))?;
    }

    Ok(())
}

fn read_zip(archive: &Path, dest_dir: &Path) -> FsResult<()> {
    let file = File::open(archive).map_err(|e| OperationError::io(archive, &e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| zip_error(archive, e))?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| zip_error(archive, e))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(OperationError::archive(
                archive,
                format!("Entry escapes the destination: {}", entry.name()),
            ));
        };
        let out = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| OperationError::io(&out, &e))?;
            continue;
        }

        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| OperationError::io(parent, &e))?;
        }
        let mut target = File::create(&out).map_err(|e| OperationError::io(&out, &e))?;
        io::copy(&mut entry, &mut target).map_err(|e| archive_io_error(archive, &e))?;
    }

    Ok(())
}

fn write_tar_gz(file: File, sources: &[PathBuf], archive: &Path) -> FsResult<()> {
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    for source in sources {
        let name = entry_name(source)?;
        let result = if source.is_dir() {
            builder.append_dir_all(&name, source)
        } else {
            builder.append_path_with_name(source, &name)
        };
        result.map_err(|e| OperationError::io(source, &e))?;
    }

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| OperationError::io(archive, &e))?;
    Ok(())
}

fn read_tar_gz(archive: &Path, dest_dir: &Path) -> FsResult<()> {
    let file = File::open(archive).map_err(|e| OperationError::io(archive, &e))?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));

    for entry in tarball.entries().map_err(|e| archive_io_error(archive, &e))? {
        let mut entry = entry.map_err(|e| archive_io_error(archive, &e))?;
        let unpacked = entry
            .unpack_in(dest_dir)
            .map_err(|e| archive_io_error(archive, &e))?;
        if !unpacked {
            return Err(OperationError::archive(
                archive,
                "Entry escapes the destination",
            ));
        }
    }

    Ok(())
}
