//! The engine facade: submission, cancellation and the clipboard.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use haul_core::{EngineConfig, FileEntry, OperationError};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::clipboard::{Clipboard, ClipboardMode, ClipboardState};
use crate::executor::OperationExecutor;
use crate::fs::FileSystem;
use crate::lock::DirectoryLocks;
use crate::operation::{OperationKind, OperationRequest, RequestId};
use crate::progress::{OperationResult, OperationUpdate};
use crate::state::{self, OperationState};

/// An explicitly owned engine instance.
///
/// Cloning is cheap and every clone shares the same clipboard, locks and
/// active requests. Requests run as tokio tasks, so [`Engine::submit`] must
/// be called from within a runtime.
#[derive(Debug, Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

#[derive(Debug)]
struct EngineInner {
    executor: OperationExecutor,
    clipboard: Clipboard,
    locks: DirectoryLocks,
    active: DashMap<RequestId, CancellationToken>,
    next_id: AtomicU64,
}

impl Engine {
    pub fn new(fs: Arc<dyn FileSystem>, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                executor: OperationExecutor::new(fs, config),
                clipboard: Clipboard::new(),
                locks: DirectoryLocks::new(),
                active: DashMap::new(),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Engine over `fs` with the default configuration.
    pub fn with_file_system(fs: impl FileSystem) -> Self {
        Self::new(Arc::new(fs), EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        self.inner.executor.config()
    }

    /// Start executing `request` in the background.
    ///
    /// The request first waits for its destination directory to be free.
    /// Updates must be drained (see [`OperationHandle::wait`]) or the task
    /// stalls once the channel is full.
    pub fn submit(&self, request: OperationRequest) -> OperationHandle {
        self.spawn(request, None)
    }

    /// Cancel a running or queued request. Returns false if it is unknown
    /// or already finished.
    pub fn cancel(&self, id: RequestId) -> bool {
        match self.inner.active.get(&id) {
            Some(token) => {
                tracing::debug!(request = %id, "Cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of requests running or queued.
    pub fn active_count(&self) -> usize {
        self.inner.active.len()
    }

    /// Stage entries for a later paste, replacing any earlier staging.
    pub fn stage(&self, entries: Vec<FileEntry>, mode: ClipboardMode) -> u64 {
        self.inner.clipboard.stage(entries, mode)
    }

    pub fn clear_stage(&self) {
        self.inner.clipboard.clear();
    }

    pub fn peek_stage(&self) -> Option<ClipboardState> {
        self.inner.clipboard.current()
    }

    /// Watch the staging; `Some` means a paste is possible.
    pub fn subscribe_stage(&self) -> watch::Receiver<Option<ClipboardState>> {
        self.inner.clipboard.subscribe()
    }

    /// Copy or move the staged entries into `destination`.
    ///
    /// Returns `None` when nothing is staged. The staging is cleared once the
    /// paste succeeds, unless something newer was staged in the meantime.
    pub fn paste(&self, destination: FileEntry) -> Option<OperationHandle> {
        let staged = self.inner.clipboard.current()?;
        let request = OperationRequest::new(staged.mode.operation(), staged.entries, destination);
        Some(self.spawn(request, Some(staged.generation)))
    }

    fn spawn(&self, request: OperationRequest, paste: Option<u64>) -> OperationHandle {
        let inner = Arc::clone(&self.inner);
        let id = RequestId(inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let kind = request.kind();
        let destination = request.destination().path.clone();

        let (updates_tx, updates_rx) = mpsc::channel(inner.executor.config().channel_size);
        let (state_tx, state_rx) = watch::channel(OperationState::Idle);
        let cancel = CancellationToken::new();
        inner.active.insert(id, cancel.clone());

        tracing::debug!(request = %id, %kind, destination = %destination.display(), "Submitted request");

        let token = cancel.clone();
        tokio::spawn(async move {
            let dir = request.destination().path.clone();
            let guard = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                guard = inner.locks.acquire(&dir) => Some(guard),
            };

            let result = match guard {
                Some(_guard) => {
                    // A compress consumes the staging once it is sure to run.
                    let clear_stage = || {
                        if kind == OperationKind::Compress {
                            inner.clipboard.clear();
                        }
                    };
                    inner
                        .executor
                        .execute(id, &request, &updates_tx, &state_tx, &token, clear_stage)
                        .await
                }
                None => {
                    tracing::debug!(request = %id, "Cancelled while queued");
                    let result = OperationResult::Cancelled {
                        succeeded: Vec::new(),
                        failed: Vec::new(),
                    };
                    state::advance(&state_tx, OperationState::Cancelled);
                    let _ = updates_tx.send(OperationUpdate::Complete(result.clone())).await;
                    result
                }
            };

            if let Some(generation) = paste.filter(|_| result.is_success()) {
                inner.clipboard.clear_if(generation);
            }
            inner.active.remove(&id);
        });

        OperationHandle {
            id,
            kind,
            destination,
            updates: updates_rx,
            state: state_rx,
            cancel,
        }
    }
}

/// Caller's side of a submitted request.
#[derive(Debug)]
pub struct OperationHandle {
    id: RequestId,
    kind: OperationKind,
    destination: PathBuf,
    updates: mpsc::Receiver<OperationUpdate>,
    state: watch::Receiver<OperationState>,
    cancel: CancellationToken,
}

impl OperationHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Current state of the request's state machine.
    pub fn state(&self) -> OperationState {
        *self.state.borrow()
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this request when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next update, or `None` once the request has finished.
    pub async fn recv(&mut self) -> Option<OperationUpdate> {
        self.updates.recv().await
    }

    /// Drain updates and return the terminal result.
    pub async fn wait(mut self) -> OperationResult {
        while let Some(update) = self.updates.recv().await {
            if let OperationUpdate::Complete(result) = update {
                return result;
            }
        }
        OperationResult::rejected(OperationError::other(
            &self.destination,
            "Operation task terminated unexpectedly",
        ))
    }
}
