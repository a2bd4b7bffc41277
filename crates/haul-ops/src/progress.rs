//! Progress updates and terminal results.

use std::path::PathBuf;

use compact_str::CompactString;
use haul_core::{ErrorKind, FileEntry, OperationError};
use serde::{Deserialize, Serialize};

use crate::operation::{OperationKind, RequestId};
use crate::state::OperationState;

/// Incremental progress of a running request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationProgress {
    pub request: RequestId,
    pub kind: OperationKind,
    pub processed: usize,
    pub total: usize,
    /// Name of the entry just finished, if any.
    pub current_entry: Option<CompactString>,
}

impl OperationProgress {
    /// Progress before any entry is processed.
    pub fn start(request: RequestId, kind: OperationKind, total: usize) -> Self {
        Self {
            request,
            kind,
            processed: 0,
            total,
            current_entry: None,
        }
    }

    /// Completion percentage in `0.0..=100.0`.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }
}

/// A message from a running request.
#[derive(Debug, Clone)]
pub enum OperationUpdate {
    Progress(OperationProgress),
    Complete(OperationResult),
}

/// A source that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub entry: FileEntry,
    pub error: OperationError,
}

impl FailedEntry {
    pub fn new(entry: FileEntry, error: OperationError) -> Self {
        Self { entry, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind
    }
}

/// Terminal outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationResult {
    /// Every source succeeded. Holds the paths created or removed.
    Success { affected: Vec<PathBuf> },
    /// At least one source failed. `succeeded` may be empty.
    PartialFailure {
        succeeded: Vec<PathBuf>,
        failed: Vec<FailedEntry>,
    },
    /// Stopped before every source was attempted.
    Cancelled {
        succeeded: Vec<PathBuf>,
        failed: Vec<FailedEntry>,
    },
    /// Refused before any mutation.
    Rejected { error: OperationError },
}

impl OperationResult {
    pub fn rejected(error: OperationError) -> Self {
        Self::Rejected { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Paths that exist (or were removed) as a result of the request.
    pub fn succeeded(&self) -> &[PathBuf] {
        match self {
            Self::Success { affected } => affected,
            Self::PartialFailure { succeeded, .. } | Self::Cancelled { succeeded, .. } => {
                succeeded
            }
            Self::Rejected { .. } => &[],
        }
    }

    /// Entries that failed.
    pub fn failed(&self) -> &[FailedEntry] {
        match self {
            Self::PartialFailure { failed, .. } | Self::Cancelled { failed, .. } => failed,
            _ => &[],
        }
    }

    /// The state machine's final state for this outcome.
    pub fn terminal_state(&self) -> OperationState {
        match self {
            Self::Success { .. } => OperationState::Completed,
            Self::PartialFailure { .. } => OperationState::PartiallyFailed,
            Self::Cancelled { .. } => OperationState::Cancelled,
            Self::Rejected { .. } => OperationState::Rejected,
        }
    }

    /// One-line human summary.
    pub fn summary(&self, kind: OperationKind) -> String {
        let verb = match kind {
            OperationKind::Copy => "Copied",
            OperationKind::Cut => "Moved",
            OperationKind::Delete => "Deleted",
            OperationKind::CreateEntry => "Created",
            OperationKind::Rename => "Renamed",
            OperationKind::Compress => "Compressed",
            OperationKind::Extract => "Extracted",
        };
        let items = |n: usize| if n == 1 { "item" } else { "items" };

        match self {
            Self::Success { affected } => {
                format!("{verb} {} {}", affected.len(), items(affected.len()))
            }
            Self::PartialFailure { succeeded, failed } => format!(
                "{verb} {} {}, {} failed",
                succeeded.len(),
                items(succeeded.len()),
                failed.len()
            ),
            Self::Cancelled { succeeded, .. } => format!(
                "Cancelled after {} {}",
                succeeded.len(),
                items(succeeded.len())
            ),
            Self::Rejected { error } => format!("{kind} rejected: {error}"),
        }
    }
}
