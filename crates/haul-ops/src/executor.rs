//! Operation executor: validation, dispatch and result reporting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use haul_core::{EngineConfig, FileEntry, FsResult, OperationError};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::conflict::ConflictResolver;
use crate::fs::FileSystem;
use crate::operation::{Operation, OperationRequest, RequestId};
use crate::progress::{FailedEntry, OperationProgress, OperationResult, OperationUpdate};
use crate::state::{self, OperationState};
use crate::{archive, copy, create, delete, move_op, rename};

/// Runs requests against a [`FileSystem`] adapter.
///
/// One `execute` call drives one request through its whole state machine.
/// The executor holds no per-request state, so it can be shared freely.
#[derive(Clone)]
pub struct OperationExecutor {
    fs: Arc<dyn FileSystem>,
    config: EngineConfig,
}

impl std::fmt::Debug for OperationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OperationExecutor {
    pub fn new(fs: Arc<dyn FileSystem>, config: EngineConfig) -> Self {
        Self { fs, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute `request` to completion, rejection or cancellation.
    ///
    /// Progress goes to `updates`, followed by exactly one
    /// [`OperationUpdate::Complete`]. The same result is returned.
    /// `on_executing` runs once the request has passed validation, right
    /// before the first mutation; it never runs for rejected requests.
    pub async fn execute(
        &self,
        id: RequestId,
        request: &OperationRequest,
        updates: &mpsc::Sender<OperationUpdate>,
        state: &watch::Sender<OperationState>,
        cancel: &CancellationToken,
        on_executing: impl FnOnce(),
    ) -> OperationResult {
        let kind = request.kind();
        tracing::debug!(request = %id, %kind, sources = request.sources().len(), "Validating request");
        state::advance(state, OperationState::Validating);

        let result = match self.prepare(request).await {
            Err(error) => {
                tracing::info!(request = %id, %kind, %error, "Request rejected");
                OperationResult::rejected(error)
            }
            Ok(_) if cancel.is_cancelled() => {
                tracing::debug!(request = %id, %kind, "Cancelled before execution");
                Tally::cancelled().into_result()
            }
            Ok(mut resolver) => {
                state::advance(state, OperationState::Executing);
                tracing::debug!(request = %id, %kind, "Executing request");
                on_executing();

                let mut run = Run {
                    id,
                    request,
                    fs: &self.fs,
                    config: &self.config,
                    updates,
                    cancel,
                    processed: 0,
                };
                run.report(None).await;

                let tally = match request.operation() {
                    Operation::Copy => copy::run(&mut run, &mut resolver).await,
                    Operation::Cut => move_op::run(&mut run, &mut resolver).await,
                    Operation::Delete => delete::run(&mut run).await,
                    Operation::CreateEntry { name, is_directory } => {
                        create::run(&mut run, name, *is_directory).await
                    }
                    Operation::Rename { new_name } => rename::run(&mut run, new_name).await,
                    Operation::Compress { .. } => archive::compress(&mut run, &mut resolver).await,
                    Operation::Extract => archive::extract(&mut run, &mut resolver).await,
                };
                let result = tally.into_result();
                tracing::info!(request = %id, summary = %result.summary(kind), "Request finished");
                result
            }
        };

        state::advance(state, result.terminal_state());
        let _ = updates.send(OperationUpdate::Complete(result.clone())).await;
        result
    }

    /// Checks that run before anything is mutated. Returns the destination
    /// listing as a resolver for the strategies that place new names.
    async fn prepare(&self, request: &OperationRequest) -> Result<ConflictResolver, OperationError> {
        request.validate(&self.config)?;

        if matches!(request.operation(), Operation::Delete) {
            return Ok(ConflictResolver::default());
        }

        let destination = request.destination().path.clone();
        let dir = destination.clone();
        let listing = blocking(&self.fs, &destination, move |fs| fs.list(&dir)).await?;
        let resolver = ConflictResolver::from_listing(&listing);

        match request.operation() {
            Operation::CreateEntry { name, .. } if resolver.contains(name) => {
                Err(OperationError::already_exists(destination.join(name)))
            }
            Operation::Rename { new_name } => {
                let source = &request.sources()[0];
                if source.name != new_name.as_str() && resolver.contains(new_name) {
                    Err(OperationError::already_exists(destination.join(new_name)))
                } else {
                    Ok(resolver)
                }
            }
            _ => Ok(resolver),
        }
    }
}

/// Run one adapter call on the blocking pool.
async fn blocking<T, F>(fs: &Arc<dyn FileSystem>, path: &Path, f: F) -> FsResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn FileSystem) -> FsResult<T> + Send + 'static,
{
    let fs = Arc::clone(fs);
    tokio::task::spawn_blocking(move || f(fs.as_ref()))
        .await
        .unwrap_or_else(|e| Err(OperationError::other(path, format!("Task failed: {e}"))))
}

/// Per-request context handed to the strategies.
pub(crate) struct Run<'a> {
    pub id: RequestId,
    pub request: &'a OperationRequest,
    pub config: &'a EngineConfig,
    fs: &'a Arc<dyn FileSystem>,
    updates: &'a mpsc::Sender<OperationUpdate>,
    cancel: &'a CancellationToken,
    processed: usize,
}

impl Run<'_> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn destination(&self) -> &Path {
        &self.request.destination().path
    }

    /// Call the adapter off the async runtime. `path` labels join failures.
    pub async fn call<T, F>(&self, path: &Path, f: F) -> FsResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FileSystem) -> FsResult<T> + Send + 'static,
    {
        blocking(self.fs, path, f).await
    }

    /// Mark one step done and emit progress.
    pub async fn advance(&mut self, name: &str) {
        self.processed += 1;
        self.report(Some(name)).await;
    }

    async fn report(&self, name: Option<&str>) {
        let progress = OperationProgress {
            request: self.id,
            kind: self.request.kind(),
            processed: self.processed,
            total: self.request.total_steps(),
            current_entry: name.map(Into::into),
        };
        let _ = self.updates.send(OperationUpdate::Progress(progress)).await;
    }
}

/// Outcome accumulated by a strategy.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    succeeded: Vec<PathBuf>,
    failed: Vec<FailedEntry>,
    cancelled: bool,
}

impl Tally {
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }

    pub fn succeed(&mut self, path: PathBuf) {
        self.succeeded.push(path);
    }

    pub fn fail(&mut self, entry: &FileEntry, error: OperationError) {
        tracing::warn!(path = %entry.path.display(), %error, "Entry failed");
        self.failed.push(FailedEntry::new(entry.clone(), error));
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn into_result(self) -> OperationResult {
        let Self {
            succeeded,
            failed,
            cancelled,
        } = self;

        if cancelled {
            OperationResult::Cancelled { succeeded, failed }
        } else if failed.is_empty() {
            OperationResult::Success {
                affected: succeeded,
            }
        } else {
            OperationResult::PartialFailure { succeeded, failed }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_core::ErrorKind;

    #[test]
    fn test_all_failed_is_partial_failure() {
        let mut tally = Tally::default();
        tally.fail(&FileEntry::file("/a"), OperationError::not_found("/a"));
        match tally.into_result() {
            OperationResult::PartialFailure { succeeded, failed } => {
                assert!(succeeded.is_empty());
                assert_eq!(failed[0].kind(), ErrorKind::NotFound);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_cancel_keeps_succeeded() {
        let mut tally = Tally::default();
        tally.succeed(PathBuf::from("/a"));
        tally.cancel();
        assert_eq!(
            tally.into_result(),
            OperationResult::Cancelled {
                succeeded: vec![PathBuf::from("/a")],
                failed: vec![],
            }
        );
    }

    #[test]
    fn test_empty_tally_is_success() {
        assert!(Tally::default().into_result().is_success());
    }
}
