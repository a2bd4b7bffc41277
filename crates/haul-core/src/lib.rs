//! Core types and rules for haul.
//!
//! This crate provides the plain data shared by the operation engine and its
//! front ends: file entries, the error taxonomy, name validation, archive
//! format detection and engine configuration.

mod archive;
mod config;
mod entry;
mod error;
mod name;

pub use archive::ArchiveFormat;
pub use config::{EngineConfig, EngineConfigBuilder};
pub use entry::{normalize_path, FileEntry, Permissions};
pub use error::{ErrorKind, FsResult, OperationError};
pub use name::{split_name, validate_name};
