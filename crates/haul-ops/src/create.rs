//! Create strategy: one empty file or directory, never auto-renamed.

use haul_core::FileEntry;

use crate::executor::{Run, Tally};

pub(crate) async fn run(run: &mut Run<'_>, name: &str, is_directory: bool) -> Tally {
    let mut tally = Tally::default();
    let parent = run.destination().to_path_buf();
    let target = parent.join(name);

    let owned = name.to_string();
    match run
        .call(&target, move |fs| fs.create_entry(&parent, &owned, is_directory))
        .await
    {
        Ok(()) => tally.succeed(target),
        Err(error) => {
            let entry = if is_directory {
                FileEntry::directory(&target)
            } else {
                FileEntry::file(&target)
            };
            tally.fail(&entry, error);
        }
    }
    run.advance(name).await;

    tally
}
