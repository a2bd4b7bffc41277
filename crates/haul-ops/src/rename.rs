//! Rename strategy.

use crate::executor::{Run, Tally};

/// Rename the single source within its parent.
///
/// Sibling collisions were already rejected before execution. Renaming to
/// the current name succeeds without touching the filesystem.
pub(crate) async fn run(run: &mut Run<'_>, new_name: &str) -> Tally {
    let mut tally = Tally::default();
    let request = run.request;
    let Some(source) = request.sources().first() else {
        return tally;
    };

    if source.name == new_name {
        tally.succeed(source.path.clone());
    } else {
        let target = run.destination().join(new_name);
        let (src, dest) = (source.path.clone(), target.clone());
        match run.call(&source.path, move |fs| fs.move_entry(&src, &dest)).await {
            Ok(()) => tally.succeed(target),
            Err(error) => tally.fail(source, error),
        }
    }
    run.advance(&source.name).await;

    tally
}
