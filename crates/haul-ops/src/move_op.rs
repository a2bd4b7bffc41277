//! Cut (move) strategy.

use crate::conflict::ConflictResolver;
use crate::executor::{Run, Tally};

/// Move each source into the destination under a conflict-free name.
///
/// A source already living in the destination is left alone and counted as
/// succeeded.
pub(crate) async fn run(run: &mut Run<'_>, resolver: &mut ConflictResolver) -> Tally {
    let mut tally = Tally::default();

    let request = run.request;
    for source in request.sources() {
        if run.is_cancelled() {
            tally.cancel();
            break;
        }

        if source.parent() == Some(run.destination()) {
            tracing::debug!(request = %run.id, path = %source.path.display(), "Already in destination");
            tally.succeed(source.path.clone());
            run.advance(&source.name).await;
            continue;
        }

        let name = resolver.claim(&source.name, source.is_dir);
        let target = run.destination().join(&name);

        let (src, dest) = (source.path.clone(), target.clone());
        match run.call(&source.path, move |fs| fs.move_entry(&src, &dest)).await {
            Ok(()) => tally.succeed(target),
            Err(error) => tally.fail(source, error),
        }
        run.advance(&source.name).await;
    }

    tally
}
