//! Event stream for watch sessions
//!
//! Everything a watch session reports (its starting snapshot, per-tick
//! render requests, port transitions and failures) is emitted through a
//! single channel so presentation sees one consistently ordered stream.

use std::fmt;
use std::time::{Duration, SystemTime};

use baud_detect::{PortRecord, Snapshot};
use serde::{Deserialize, Serialize};

/// Direction of a presence change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// The record was not in the previous snapshot
    Appeared,
    /// The record is no longer in the current snapshot
    Disappeared,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKind::Appeared => write!(f, "appeared"),
            TransitionKind::Disappeared => write!(f, "disappeared"),
        }
    }
}

/// A single port appearing or disappearing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Appeared or disappeared
    pub kind: TransitionKind,
    /// The record as it was observed
    pub record: PortRecord,
    /// When the tick that produced this event was diffed
    pub observed_at: SystemTime,
}

impl TransitionEvent {
    /// Create an appeared event
    pub fn appeared(record: PortRecord, observed_at: SystemTime) -> Self {
        Self {
            kind: TransitionKind::Appeared,
            record,
            observed_at,
        }
    }

    /// Create a disappeared event
    pub fn disappeared(record: PortRecord, observed_at: SystemTime) -> Self {
        Self {
            kind: TransitionKind::Disappeared,
            record,
            observed_at,
        }
    }
}

/// Events emitted by a watch session, in order
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// The seed snapshot was taken and polling has begun
    Started {
        /// Ports present when the session started
        seed: Snapshot,
    },

    /// A poll tick is starting
    Tick {
        /// Time left before the session expires (None if unbounded)
        remaining: Option<Duration>,
    },

    /// A port appeared or disappeared
    Transition(TransitionEvent),

    /// Enumeration failed mid-session; the session ends after this event
    EnumerationFailed {
        /// Error message
        message: String,
    },
}

impl WatchEvent {
    /// Check if this is a port transition
    pub fn is_transition(&self) -> bool {
        matches!(self, WatchEvent::Transition(_))
    }

    /// Get the transition if this event carries one
    pub fn transition(&self) -> Option<&TransitionEvent> {
        match self {
            WatchEvent::Transition(event) => Some(event),
            _ => None,
        }
    }
}
