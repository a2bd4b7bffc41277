//! Staged entries awaiting a paste.

use std::sync::atomic::{AtomicU64, Ordering};

use haul_core::FileEntry;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::operation::Operation;

/// What a paste of the staged entries will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ClipboardMode {
    Copy,
    Cut,
}

impl ClipboardMode {
    /// The operation a paste performs.
    pub fn operation(self) -> Operation {
        match self {
            Self::Copy => Operation::Copy,
            Self::Cut => Operation::Cut,
        }
    }
}

/// A staged set of entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardState {
    pub entries: Vec<FileEntry>,
    pub mode: ClipboardMode,
    /// Incremented on every stage; identifies this staging.
    pub generation: u64,
}

/// The engine-owned clipboard.
///
/// There is at most one staged set; staging again replaces it outright.
/// Readers get snapshots or subscribe for changes.
#[derive(Debug)]
pub struct Clipboard {
    state: watch::Sender<Option<ClipboardState>>,
    generation: AtomicU64,
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the staged set. Staging nothing clears the clipboard.
    ///
    /// Returns the generation of the new staging.
    pub fn stage(&self, entries: Vec<FileEntry>, mode: ClipboardMode) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if entries.is_empty() {
            self.clear();
        } else {
            tracing::debug!(%mode, count = entries.len(), generation, "Staged entries");
            self.state.send_replace(Some(ClipboardState {
                entries,
                mode,
                generation,
            }));
        }
        generation
    }

    pub fn clear(&self) {
        self.state.send_if_modified(|state| state.take().is_some());
    }

    /// Clear only if `generation` is still the staged one.
    pub fn clear_if(&self, generation: u64) -> bool {
        self.state.send_if_modified(|state| {
            if state.as_ref().is_some_and(|s| s.generation == generation) {
                *state = None;
                true
            } else {
                false
            }
        })
    }

    /// Snapshot of the staged set.
    pub fn current(&self) -> Option<ClipboardState> {
        self.state.borrow().clone()
    }

    /// Whether anything is staged.
    pub fn has_entries(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ClipboardState>> {
        self.state.subscribe()
    }
}
