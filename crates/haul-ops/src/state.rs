//! Lifecycle of a single submitted request.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// State of one request. Every submission starts a fresh instance at `Idle`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum OperationState {
    #[default]
    Idle,
    Validating,
    Executing,
    Completed,
    PartiallyFailed,
    Cancelled,
    Rejected,
}

impl OperationState {
    /// Terminal states are final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyFailed | Self::Cancelled | Self::Rejected
        )
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use OperationState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Idle, Cancelled)
                | (Validating, Executing)
                | (Validating, Rejected)
                | (Validating, Cancelled)
                | (Executing, Completed)
                | (Executing, PartiallyFailed)
                | (Executing, Cancelled)
        )
    }
}

/// Move `state` to `next`, refusing illegal transitions.
pub(crate) fn advance(state: &watch::Sender<OperationState>, next: OperationState) -> bool {
    state.send_if_modified(|current| {
        if current.can_transition_to(next) {
            *current = next;
            true
        } else {
            tracing::error!(from = %current, to = %next, "Illegal operation state transition");
            false
        }
    })
}
