//! Copy strategy.

use crate::conflict::ConflictResolver;
use crate::executor::{Run, Tally};

/// Copy each source into the destination under a conflict-free name.
///
/// Failures are recorded per entry and never stop the batch. Succeeded
/// entries are reported by their new path.
pub(crate) async fn run(run: &mut Run<'_>, resolver: &mut ConflictResolver) -> Tally {
    let mut tally = Tally::default();

    let request = run.request;
    for source in request.sources() {
        if run.is_cancelled() {
            tally.cancel();
            break;
        }

        let name = resolver.claim(&source.name, source.is_dir);
        let target = run.destination().join(&name);
        if name != source.name.as_str() {
            tracing::debug!(request = %run.id, from = %source.name, to = %name, "Resolved name conflict");
        }

        let (src, dest) = (source.path.clone(), target.clone());
        match run.call(&source.path, move |fs| fs.copy(&src, &dest)).await {
            Ok(()) => tally.succeed(target),
            Err(error) => {
                // A failed copy leaves nothing behind, so the name is free again.
                resolver.release(&name);
                tally.fail(source, error);
            }
        }
        run.advance(&source.name).await;
    }

    tally
}
