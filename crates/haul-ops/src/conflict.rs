//! Name conflict resolution for incoming entries.

use std::collections::HashSet;

use haul_core::{split_name, FileEntry};

/// Pick a final name for `incoming` that is not in `existing`.
///
/// Returns `incoming` unchanged when it is free. Otherwise appends a
/// parenthesized counter before the extension ("file (1).txt", "file (2).txt",
/// ...) and returns the first free candidate. The counter has no upper bound.
pub fn resolve(existing: &HashSet<String>, incoming: &str, is_dir: bool) -> String {
    if !existing.contains(incoming) {
        return incoming.to_string();
    }

    let (base, ext) = split_name(incoming, is_dir);
    (1u64..)
        .map(|n| format!("{base} ({n}){ext}"))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_default()
}

/// Destination listing that grows as entries are placed.
///
/// Each claimed name is added to the listing, so successive resolutions in
/// one batch never hand out the same name twice.
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    taken: HashSet<String>,
}

impl ConflictResolver {
    /// Start from the names already present in the destination.
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: existing.into_iter().map(Into::into).collect(),
        }
    }

    /// Start from a destination listing.
    pub fn from_listing(listing: &[FileEntry]) -> Self {
        Self::new(listing.iter().map(|entry| entry.name.to_string()))
    }

    /// Whether `name` is currently taken.
    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Resolve `incoming` against the listing without reserving it.
    pub fn peek(&self, incoming: &str, is_dir: bool) -> String {
        resolve(&self.taken, incoming, is_dir)
    }

    /// Resolve `incoming` and reserve the result.
    pub fn claim(&mut self, incoming: &str, is_dir: bool) -> String {
        let name = resolve(&self.taken, incoming, is_dir);
        self.taken.insert(name.clone());
        name
    }

    /// Give a reserved name back (the entry was never placed).
    pub fn release(&mut self, name: &str) {
        self.taken.remove(name);
    }
}
