//! Debounced UIN availability checks for report entry clients.
//!
//! Every keystroke calls [`DebouncedUinChecker::submit`]. Only the last input
//! of a burst is looked up once the window elapses, and a response is applied
//! only if no newer input arrived meanwhile. Lookup failures fail open: the
//! state becomes [`UinAvailability::Unverified`], which still allows
//! submission but carries a warning.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::ports::UinLookup;

/// Debounce window applied when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Visible availability state for the current input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UinAvailability {
    /// No input yet, or the input is blank.
    Idle,
    /// A lookup for `uin` is pending.
    Checking { uin: String },
    /// No stored report carries `uin`.
    Available { uin: String },
    /// A stored report already carries `uin`.
    Taken { uin: String },
    /// The lookup failed; `uin` is treated as available.
    Unverified { uin: String, warning: String },
}

impl UinAvailability {
    /// Whether a report form may be submitted in this state.
    pub fn allows_submission(&self) -> bool {
        matches!(self, Self::Available { .. } | Self::Unverified { .. })
    }

    /// Input this state refers to.
    pub fn uin(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Checking { uin }
            | Self::Available { uin }
            | Self::Taken { uin }
            | Self::Unverified { uin, .. } => Some(uin),
        }
    }
}

struct Shared {
    lookup: Arc<dyn UinLookup>,
    window: Duration,
    latest: AtomicU64,
    state: watch::Sender<UinAvailability>,
}

impl Shared {
    fn is_latest(&self, sequence: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == sequence
    }

    /// Publish `next` unless a newer submission superseded `sequence`.
    fn publish(&self, sequence: u64, next: UinAvailability) {
        self.state.send_if_modified(|current| {
            if !self.is_latest(sequence) || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// Client-side uniqueness checker with debounce and stale-response guard.
#[derive(Clone)]
pub struct DebouncedUinChecker {
    shared: Arc<Shared>,
}

impl DebouncedUinChecker {
    pub fn new(lookup: Arc<dyn UinLookup>, window: Duration) -> Self {
        let (state, _) = watch::channel(UinAvailability::Idle);
        Self {
            shared: Arc::new(Shared {
                lookup,
                window,
                latest: AtomicU64::new(0),
                state,
            }),
        }
    }

    /// Current visible state.
    pub fn state(&self) -> UinAvailability {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every visible state change.
    pub fn subscribe(&self) -> watch::Receiver<UinAvailability> {
        self.shared.state.subscribe()
    }

    /// Record a new input value. Must be called inside a Tokio runtime.
    ///
    /// In-flight lookups are not cancelled; their results are dropped when
    /// they arrive after a newer submission.
    pub fn submit(&self, input: &str) {
        let sequence = self.shared.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let uin = input.trim().to_owned();
        if uin.is_empty() {
            self.shared.publish(sequence, UinAvailability::Idle);
            return;
        }
        self.shared
            .publish(sequence, UinAvailability::Checking { uin: uin.clone() });

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(shared.window).await;
            if !shared.is_latest(sequence) {
                debug!(uin = %uin, sequence, "debounced input superseded");
                return;
            }
            let next = match shared.lookup.exists(&uin).await {
                Ok(true) => UinAvailability::Taken { uin },
                Ok(false) => UinAvailability::Available { uin },
                Err(error) => {
                    warn!(uin = %uin, error = %error, "uin lookup failed; allowing submission");
                    UinAvailability::Unverified {
                        uin,
                        warning: "Could not verify UIN uniqueness; it may already exist."
                            .to_owned(),
                    }
                }
            };
            if !shared.is_latest(sequence) {
                debug!(sequence, "dropping stale uin lookup response");
            }
            shared.publish(sequence, next);
        });
    }
}

#[cfg(test)]
#[path = "uin_availability_tests.rs"]
mod tests;
