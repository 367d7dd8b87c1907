//! Presence diffing between snapshots
//!
//! Records are compared by full value, so a port whose serial number (or any
//! other field) changes between polls is reported as one disappearance and
//! one appearance, never as an update.

use std::time::SystemTime;

use baud_detect::{PortRecord, Snapshot};

use crate::events::TransitionEvent;

/// Records that appeared and disappeared between two snapshots
///
/// Both lists are sorted so that output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceDiff {
    /// Present in the current snapshot only
    pub appeared: Vec<PortRecord>,
    /// Present in the previous snapshot only
    pub disappeared: Vec<PortRecord>,
}

impl PresenceDiff {
    /// Compare two snapshots
    pub fn between(previous: &Snapshot, current: &Snapshot) -> Self {
        let mut appeared: Vec<_> = current.difference(previous).cloned().collect();
        let mut disappeared: Vec<_> = previous.difference(current).cloned().collect();
        appeared.sort();
        disappeared.sort();

        Self {
            appeared,
            disappeared,
        }
    }

    /// Check if nothing changed
    pub fn is_empty(&self) -> bool {
        self.appeared.is_empty() && self.disappeared.is_empty()
    }

    /// Total number of transitions
    pub fn len(&self) -> usize {
        self.appeared.len() + self.disappeared.len()
    }

    /// Convert to transition events: all disappearances, then all appearances
    pub fn into_events(self, observed_at: SystemTime) -> Vec<TransitionEvent> {
        self.disappeared
            .into_iter()
            .map(|r| TransitionEvent::disappeared(r, observed_at))
            .chain(
                self.appeared
                    .into_iter()
                    .map(|r| TransitionEvent::appeared(r, observed_at)),
            )
            .collect()
    }
}

/// Compute the ordered transition events from `previous` to `current`
pub fn diff(previous: &Snapshot, current: &Snapshot, observed_at: SystemTime) -> Vec<TransitionEvent> {
    PresenceDiff::between(previous, current).into_events(observed_at)
}
