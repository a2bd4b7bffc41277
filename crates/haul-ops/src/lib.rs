//! File operations engine for haul.
//!
//! Requests (copy, cut, delete, create, rename, compress, extract) are
//! validated, then executed in the background against a [`FileSystem`]
//! adapter. Progress and the terminal result arrive over a channel held by
//! the returned [`OperationHandle`].

mod archive;
mod clipboard;
mod conflict;
mod copy;
mod create;
mod delete;
mod engine;
mod executor;
mod fs;
mod local;
mod lock;
mod memory;
mod move_op;
mod operation;
mod progress;
mod rename;
mod selection;
mod state;

pub use clipboard::{Clipboard, ClipboardMode, ClipboardState};
pub use conflict::{resolve, ConflictResolver};
pub use engine::{Engine, OperationHandle};
pub use executor::OperationExecutor;
pub use fs::FileSystem;
pub use local::{LocalFileSystem, Properties};
pub use lock::DirectoryLocks;
pub use memory::{FsCall, MemoryFileSystem};
pub use operation::{Operation, OperationKind, OperationRequest, RequestId};
pub use progress::{FailedEntry, OperationProgress, OperationResult, OperationUpdate};
pub use selection::SelectionModel;
pub use state::OperationState;
