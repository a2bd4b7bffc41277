//! Compress and extract strategies.
//!
//! Both run as a single progress step and fail as a unit.

use std::path::{Path, PathBuf};

use haul_core::OperationError;

use crate::conflict::ConflictResolver;
use crate::executor::{Run, Tally};

/// Bundle every source into one archive in the destination.
pub(crate) async fn compress(run: &mut Run<'_>, resolver: &mut ConflictResolver) -> Tally {
    let mut tally = Tally::default();
    let request = run.request;

    let Some(file_name) = request.archive_file_name(run.config.archive_format) else {
        let error = OperationError::invalid_request(run.destination(), "No archive name");
        for source in request.sources() {
            tally.fail(source, error.clone());
        }
        return tally;
    };

    let name = resolver.claim(&file_name, false);
    let archive = run.destination().join(&name);
    let sources = request.source_paths();
    let target = archive.clone();

    match run
        .call(&archive, move |fs| fs.compress(&sources, &target))
        .await
    {
        Ok(()) => tally.succeed(archive),
        Err(error) => {
            for source in request.sources() {
                tally.fail(source, error.clone());
            }
        }
    }
    run.advance(&name).await;

    tally
}

/// Unpack the source archive into the destination.
///
/// The adapter extracts into a hidden staging directory; each top-level
/// result is then moved into place under a conflict-free name. Any failure
/// removes the staging directory and everything already placed.
pub(crate) async fn extract(run: &mut Run<'_>, resolver: &mut ConflictResolver) -> Tally {
    let mut tally = Tally::default();
    let request = run.request;
    let Some(archive) = request.sources().first() else {
        return tally;
    };

    match unpack(run, resolver, &archive.path).await {
        Ok(placed) => placed.into_iter().for_each(|path| tally.succeed(path)),
        Err(error) => tally.fail(archive, error),
    }
    run.advance(&archive.name).await;

    tally
}

async fn unpack(
    run: &Run<'_>,
    resolver: &mut ConflictResolver,
    archive: &Path,
) -> Result<Vec<PathBuf>, OperationError> {
    let destination = run.destination().to_path_buf();
    let staging_name = resolver.claim(&format!("{}-{}", run.config.staging_prefix, run.id.0), true);
    let staging = destination.join(&staging_name);

    let (parent, name) = (destination.clone(), staging_name.clone());
    run.call(&staging, move |fs| fs.create_entry(&parent, &name, true))
        .await?;

    let (src, dir) = (archive.to_path_buf(), staging.clone());
    let outcome = match run.call(archive, move |fs| fs.extract(&src, &dir)).await {
        Ok(staged) => place(run, resolver, &destination, staged).await,
        Err(error) => Err(error),
    };

    remove(run, &staging).await;
    resolver.release(&staging_name);
    outcome
}

/// Move staged entries into the destination, undoing everything on failure.
async fn place(
    run: &Run<'_>,
    resolver: &mut ConflictResolver,
    destination: &Path,
    staged: Vec<PathBuf>,
) -> Result<Vec<PathBuf>, OperationError> {
    let mut placed = Vec::with_capacity(staged.len());

    for path in staged {
        let step = async {
            let probe = path.clone();
            let entry = run.call(&path, move |fs| fs.metadata(&probe)).await?;
            let name = resolver.claim(&entry.name, entry.is_dir);
            let target = destination.join(&name);
            let (src, dest) = (path.clone(), target.clone());
            run.call(&path, move |fs| fs.move_entry(&src, &dest)).await?;
            Ok::<_, OperationError>(target)
        };

        match step.await {
            Ok(target) => placed.push(target),
            Err(error) => {
                for target in &placed {
                    remove(run, target).await;
                }
                return Err(error);
            }
        }
    }

    Ok(placed)
}

/// Best-effort removal used for cleanup.
async fn remove(run: &Run<'_>, path: &Path) {
    let target = path.to_path_buf();
    if let Err(error) = run.call(path, move |fs| fs.delete(&target)).await {
        tracing::warn!(path = %path.display(), %error, "Failed to clean up after extraction");
    }
}
