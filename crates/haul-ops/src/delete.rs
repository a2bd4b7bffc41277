//! Delete strategy.

use crate::executor::{Run, Tally};

/// Delete each source. Succeeded entries are reported by their old path.
pub(crate) async fn run(run: &mut Run<'_>) -> Tally {
    let mut tally = Tally::default();

    let request = run.request;
    for source in request.sources() {
        if run.is_cancelled() {
            tally.cancel();
            break;
        }

        let path = source.path.clone();
        match run.call(&source.path, move |fs| fs.delete(&path)).await {
            Ok(()) => tally.succeed(source.path.clone()),
            Err(error) => tally.fail(source, error),
        }
        run.advance(&source.name).await;
    }

    tally
}
