//! End-to-end requests against the local disk.

use std::fs;
use std::path::Path;

use haul_core::{ArchiveFormat, EngineConfig, ErrorKind, FileEntry};
use haul_ops::{Engine, LocalFileSystem, OperationRequest, OperationResult};
use tempfile::TempDir;

fn local_engine(format: ArchiveFormat) -> Engine {
    let config = EngineConfig::builder()
        .archive_format(format)
        .build()
        .unwrap();
    Engine::new(std::sync::Arc::new(LocalFileSystem::new()), config)
}

fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_copy_with_conflicts_on_disk() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(src.join("photos")).unwrap();
    fs::write(src.join("photos/one.jpg"), "jpg").unwrap();
    fs::write(src.join("notes.txt"), "new").unwrap();
    fs::create_dir(&dst).unwrap();
    fs::write(dst.join("notes.txt"), "old").unwrap();

    let result = local_engine(ArchiveFormat::Zip)
        .submit(OperationRequest::copy(
            vec![
                FileEntry::file(src.join("notes.txt")),
                FileEntry::directory(src.join("photos")),
            ],
            FileEntry::directory(&dst),
        ))
        .wait()
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(names(&dst), vec!["notes (1).txt", "notes.txt", "photos"]);
    assert_eq!(fs::read_to_string(dst.join("notes.txt")).unwrap(), "old");
    assert_eq!(fs::read_to_string(dst.join("photos/one.jpg")).unwrap(), "jpg");
    assert!(src.join("notes.txt").exists());
}

#[tokio::test]
async fn test_compress_then_extract_beside_original() {
    for format in [ArchiveFormat::Zip, ArchiveFormat::TarGz] {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        fs::create_dir_all(root.join("site/css")).unwrap();
        fs::write(root.join("site/index.html"), "<html>").unwrap();
        fs::write(root.join("site/css/main.css"), "body {}").unwrap();

        let engine = local_engine(format);
        let compressed = engine
            .submit(OperationRequest::compress(
                vec![FileEntry::directory(root.join("site"))],
                FileEntry::directory(&root),
                None,
            ))
            .wait()
            .await;
        let archive = root.join(format.file_name("site"));
        assert_eq!(
            compressed,
            OperationResult::Success {
                affected: vec![archive.clone()],
            }
        );

        let extracted = engine
            .submit(OperationRequest::extract(
                FileEntry::file(&archive),
                FileEntry::directory(&root),
            ))
            .wait()
            .await;
        assert_eq!(
            extracted,
            OperationResult::Success {
                affected: vec![root.join("site (1)")],
            }
        );
        assert_eq!(
            fs::read_to_string(root.join("site (1)/css/main.css")).unwrap(),
            "body {}"
        );
        assert_eq!(
            names(&root),
            vec!["site".to_string(), "site (1)".to_string(), format.file_name("site")]
        );
    }
}

#[tokio::test]
async fn test_delete_and_rename_on_disk() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();
    fs::write(root.join("draft.md"), "draft").unwrap();
    fs::create_dir_all(root.join("old/nested")).unwrap();

    let engine = local_engine(ArchiveFormat::Zip);
    let renamed = engine
        .submit(OperationRequest::rename(
            FileEntry::file(root.join("draft.md")),
            "final.md",
        ))
        .wait()
        .await;
    assert!(renamed.is_success());

    let deleted = engine
        .submit(OperationRequest::delete(
            vec![FileEntry::directory(root.join("old"))],
            FileEntry::directory(&root),
        ))
        .wait()
        .await;
    assert!(deleted.is_success());
    assert_eq!(names(&root), vec!["final.md"]);
}

#[tokio::test]
async fn test_unnormalized_source_is_rejected() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("a");
    fs::create_dir_all(root.join("b")).unwrap();
    fs::create_dir_all(root.join("c")).unwrap();

    let mut source = FileEntry::directory(&root);
    source.path = root.join("b").join("..");

    let result = local_engine(ArchiveFormat::Zip)
        .submit(OperationRequest::copy(
            vec![source],
            FileEntry::directory(root.join("c")),
        ))
        .wait()
        .await;

    match result {
        OperationResult::Rejected { error } => assert_eq!(error.kind, ErrorKind::InvalidRequest),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(names(&root.join("c")).is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_copy_keeps_symlinks_as_links() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir(&dst).unwrap();
    fs::write(src.join("a.txt"), "a").unwrap();
    std::os::unix::fs::symlink(&src, src.join("loop")).unwrap();

    let result = local_engine(ArchiveFormat::Zip)
        .submit(OperationRequest::copy(
            vec![FileEntry::directory(&src)],
            FileEntry::directory(&dst),
        ))
        .wait()
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(names(&dst.join("src")), vec!["a.txt", "loop"]);
    assert_eq!(fs::read_link(dst.join("src/loop")).unwrap(), src);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_directory_copy_leaves_nothing() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(src.join("nested")).unwrap();
    fs::create_dir(&dst).unwrap();
    fs::write(src.join("nested/a.txt"), "a").unwrap();
    let _socket = std::os::unix::net::UnixListener::bind(src.join("nested/sock")).unwrap();

    let result = local_engine(ArchiveFormat::Zip)
        .submit(OperationRequest::copy(
            vec![FileEntry::directory(&src)],
            FileEntry::directory(&dst),
        ))
        .wait()
        .await;

    match result {
        OperationResult::PartialFailure { succeeded, failed } => {
            assert!(succeeded.is_empty());
            assert_eq!(failed.len(), 1);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(names(&dst).is_empty());
    assert!(src.join("nested/a.txt").exists());
}

#[tokio::test]
async fn test_cut_on_disk_moves_tree() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(src.join("docs")).unwrap();
    fs::write(src.join("docs/readme.md"), "read me").unwrap();
    fs::create_dir_all(dst.join("docs")).unwrap();

    let result = local_engine(ArchiveFormat::Zip)
        .submit(OperationRequest::cut(
            vec![FileEntry::directory(src.join("docs"))],
            FileEntry::directory(&dst),
        ))
        .wait()
        .await;

    assert_eq!(
        result,
        OperationResult::Success {
            affected: vec![dst.join("docs (1)")],
        }
    );
    assert!(names(&src).is_empty());
    assert_eq!(
        fs::read_to_string(dst.join("docs (1)/readme.md")).unwrap(),
        "read me"
    );
}
