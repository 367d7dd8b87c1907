//! Watch scheduler
//!
//! A [`PortWatcher`] takes a seed snapshot, then polls the port list on a
//! fixed interval and emits a [`WatchEvent`] for every change until the
//! session expires, is cancelled or enumeration fails.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Running -> Expired | Cancelled | Failed -> Stopped
//! ```
//!
//! A watcher runs at most once. Polling is strictly sequential; the loop
//! waits on the tick timer, the optional expiry timer and the cancellation
//! token, and handles whichever fires first to completion.
//!
//! Enumeration failure ends the session: an [`WatchEvent::EnumerationFailed`]
//! is emitted and [`WatchError::Enumeration`] returned, rather than carrying
//! on with a stale snapshot. Cancellation observed after a tick's enumeration
//! abandons that tick without emitting its transitions. Event sends also race
//! the cancellation token, so a sink that stops reading cannot hold a
//! cancelled session open.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use baud_detect::{PortEnumerator, PortScanner, Snapshot};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::diff::diff;
use crate::error::WatchError;
use crate::events::WatchEvent;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shortest interval the scheduler will poll at
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Watch session parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// How long to watch; zero means until cancelled
    pub duration: Duration,
    /// Time between polls
    pub interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            duration: Duration::ZERO,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WatchConfig {
    /// Watch for a number of seconds (0 = unbounded) at the default interval
    pub fn from_secs(secs: u64) -> Self {
        Self {
            duration: Duration::from_secs(secs),
            ..Default::default()
        }
    }

    /// Set the polling interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Session length, or None if unbounded
    pub fn expiry(&self) -> Option<Duration> {
        (!self.duration.is_zero()).then_some(self.duration)
    }

    fn poll_interval(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }
}

/// Watcher lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Not started
    Idle,
    /// Seeding or polling
    Running,
    /// The configured duration elapsed
    Expired,
    /// Cancelled by the caller
    Cancelled,
    /// Enumeration failed
    Failed,
    /// Finished and released
    Stopped,
}

impl WatchState {
    /// Check if the session has ended
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WatchState::Expired | WatchState::Cancelled | WatchState::Failed | WatchState::Stopped
        )
    }
}

/// How a session that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The configured duration elapsed
    Expired,
    /// The caller cancelled, or nobody is listening for events any more
    Cancelled,
}

/// Create a linked cancellation handle and token
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

/// Requests cancellation of a watch session
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by a watch session to detect cancellation
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    /// Check whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until cancellation is requested
    ///
    /// If every handle is dropped without cancelling, this never completes.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Send an event unless cancellation is requested first
///
/// Returns false if the session should stop: the token was cancelled or the
/// receiver has gone away.
async fn emit(
    events: &mpsc::Sender<WatchEvent>,
    cancel: &mut CancelToken,
    event: WatchEvent,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}

/// Polls a port scanner and reports presence changes
pub struct PortWatcher<E> {
    scanner: PortScanner<E>,
    config: WatchConfig,
    state: WatchState,
    previous: Snapshot,
    ticks: u64,
}

impl<E: PortEnumerator> PortWatcher<E> {
    /// Create an idle watcher
    pub fn new(scanner: PortScanner<E>, config: WatchConfig) -> Self {
        Self {
            scanner,
            config,
            state: WatchState::Idle,
            previous: Snapshot::new(),
            ticks: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Number of poll ticks handled so far (the seed is not a tick)
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Session parameters
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// The most recently accepted snapshot
    pub fn last_snapshot(&self) -> &Snapshot {
        &self.previous
    }

    /// Release the watcher, returning the last accepted snapshot
    pub fn stop(&mut self) -> Snapshot {
        self.set_state(WatchState::Stopped);
        std::mem::take(&mut self.previous)
    }

    fn set_state(&mut self, state: WatchState) {
        if self.state != state {
            debug!("Watch state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Run the watch session to completion
    ///
    /// Events are sent on `events` in order. Returns the outcome on normal
    /// completion; enumeration failures are returned as errors. Dropping the
    /// event receiver ends the session as [`WatchOutcome::Cancelled`].
    pub async fn run(
        &mut self,
        events: mpsc::Sender<WatchEvent>,
        mut cancel: CancelToken,
    ) -> Result<WatchOutcome, WatchError> {
        if self.state != WatchState::Idle {
            return Err(WatchError::AlreadyStarted);
        }

        let result = self.run_session(&events, &mut cancel).await;

        match &result {
            Ok(WatchOutcome::Expired) => {
                info!("Watch session expired after {} tick(s)", self.ticks);
                self.set_state(WatchState::Expired);
            }
            Ok(WatchOutcome::Cancelled) => {
                info!("Watch session cancelled after {} tick(s)", self.ticks);
                self.set_state(WatchState::Cancelled);
            }
            Err(e) => {
                warn!("Watch session failed: {}", e);
                self.set_state(WatchState::Failed);
            }
        }

        result
    }

    async fn run_session(
        &mut self,
        events: &mpsc::Sender<WatchEvent>,
        cancel: &mut CancelToken,
    ) -> Result<WatchOutcome, WatchError> {
        if cancel.is_cancelled() {
            return Ok(WatchOutcome::Cancelled);
        }

        self.set_state(WatchState::Running);

        let seed = self.scanner.snapshot().map_err(WatchError::SeedFailed)?;
        if cancel.is_cancelled() {
            return Ok(WatchOutcome::Cancelled);
        }

        info!("Watching {} serial port(s)", seed.len());
        self.previous = seed.clone();
        if !emit(events, cancel, WatchEvent::Started { seed }).await {
            return Ok(WatchOutcome::Cancelled);
        }

        let start = Instant::now();
        let period = self.config.poll_interval();
        let deadline = self.config.expiry().map(|d| start + d);

        let mut ticker = interval_at(start + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let expired = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(WatchOutcome::Cancelled),
                _ = &mut expired => return Ok(WatchOutcome::Expired),
                _ = ticker.tick() => {}
            }

            self.ticks += 1;
            let remaining = deadline.map(|at| at.saturating_duration_since(Instant::now()));
            if !emit(events, cancel, WatchEvent::Tick { remaining }).await {
                return Ok(WatchOutcome::Cancelled);
            }

            let current = match self.scanner.snapshot() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    let failed = WatchEvent::EnumerationFailed {
                        message: e.to_string(),
                    };
                    emit(events, cancel, failed).await;
                    return Err(WatchError::Enumeration(e));
                }
            };

            if cancel.is_cancelled() {
                debug!("Abandoning tick {} after cancellation", self.ticks);
                return Ok(WatchOutcome::Cancelled);
            }

            let transitions = diff(&self.previous, &current, SystemTime::now());
            if !transitions.is_empty() {
                debug!("Tick {}: {} transition(s)", self.ticks, transitions.len());
            }
            for transition in transitions {
                if !emit(events, cancel, WatchEvent::Transition(transition)).await {
                    return Ok(WatchOutcome::Cancelled);
                }
            }

            self.previous = current;
        }
    }
}
