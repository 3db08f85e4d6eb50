//! Debounced, single-flight validation of the live graph.
//!
//! The host publishes a [`GraphChange`] on a `watch` channel after every
//! mutation. The pipeline waits for a quiet period, then sends the latest
//! snapshot to a [`GraphValidator`]. At most one call is in flight; a timer
//! that fires during a call is dropped, not queued. Every call is tagged with
//! the generation it was issued against and its result is discarded when the
//! graph has moved on since, after which one fresh debounce window is armed so
//! the newer state is still evaluated.
//!
//! [`DebounceCore`] holds the decisions and does no I/O;
//! [`spawn_validation_pipeline`] drives it with tokio timers.

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use canvas::diag::ValidationReport;
use canvas::doc::{DocStore, GraphSnapshot};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::{ApiError, ErrorCode};

// =============================================================================
// VALIDATOR SEAM
// =============================================================================

#[async_trait]
pub trait GraphValidator: Send + Sync {
    async fn validate(&self, graph: &GraphSnapshot) -> Result<ValidationReport, ApiError>;
}

#[async_trait]
impl GraphValidator for ApiClient {
    async fn validate(&self, graph: &GraphSnapshot) -> Result<ValidationReport, ApiError> {
        ApiClient::validate(self, graph).await
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// A graph state published by the host.
#[derive(Debug, Clone, Default)]
pub struct GraphChange {
    pub generation: u64,
    pub snapshot: Arc<GraphSnapshot>,
}

impl GraphChange {
    /// Capture the current state of a store.
    #[must_use]
    pub fn capture(doc: &DocStore) -> Self {
        Self { generation: doc.generation(), snapshot: Arc::new(doc.export_snapshot()) }
    }
}

/// What the pipeline reports back to the host.
#[derive(Debug)]
pub enum PipelineUpdate {
    /// The graph became empty; diagnostics should be cleared now.
    Cleared { generation: u64 },
    /// Fresh diagnostics that replace the previous ones.
    Validated { generation: u64, report: ValidationReport },
    /// The call failed; the host may offer a retry.
    Failed { generation: u64, error: ApiError },
}

// =============================================================================
// DEBOUNCE CORE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// A debounce window was (re)started.
    Scheduled,
    /// The graph is empty; nothing is scheduled.
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Send the latest snapshot, tagged with this generation.
    Dispatch(u64),
    /// A call is already in flight; this firing is dropped.
    Skipped,
    /// Nothing to validate.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result matches the current graph and should be applied.
    Accepted,
    /// The graph changed while the call ran; a new window was armed.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct DebounceCore {
    latest: u64,
    latest_empty: bool,
    in_flight: Option<u64>,
    armed: bool,
}

impl DebounceCore {
    #[must_use]
    pub fn new() -> Self {
        Self { latest_empty: true, ..Self::default() }
    }

    pub fn on_change(&mut self, generation: u64, empty: bool) -> ChangeOutcome {
        self.latest = generation;
        self.latest_empty = empty;
        self.armed = !empty;
        if empty { ChangeOutcome::Cleared } else { ChangeOutcome::Scheduled }
    }

    /// The debounce timer elapsed.
    pub fn fire(&mut self) -> FireOutcome {
        if !std::mem::take(&mut self.armed) || self.latest_empty {
            return FireOutcome::Idle;
        }
        if self.in_flight.is_some() {
            return FireOutcome::Skipped;
        }
        self.in_flight = Some(self.latest);
        FireOutcome::Dispatch(self.latest)
    }

    /// The in-flight call issued against `generation` returned.
    pub fn complete(&mut self, generation: u64) -> Completion {
        self.in_flight = None;
        if generation == self.latest {
            Completion::Accepted
        } else {
            self.armed = !self.latest_empty;
            Completion::Stale
        }
    }

    /// Whether a timer should be running.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }
}

// =============================================================================
// PIPELINE TASK
// =============================================================================

/// Spawn the pipeline. It runs until the change sender is dropped or the
/// update receiver is closed.
pub fn spawn_validation_pipeline<V>(
    validator: Arc<V>,
    debounce: Duration,
    changes: watch::Receiver<GraphChange>,
) -> (mpsc::UnboundedReceiver<PipelineUpdate>, JoinHandle<()>)
where
    V: GraphValidator + ?Sized + 'static,
{
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_pipeline(validator, debounce, changes, updates_tx));
    (updates_rx, handle)
}

async fn run_pipeline<V>(
    validator: Arc<V>,
    debounce: Duration,
    mut changes: watch::Receiver<GraphChange>,
    updates: mpsc::UnboundedSender<PipelineUpdate>,
) where
    V: GraphValidator + ?Sized + 'static,
{
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(u64, Result<ValidationReport, ApiError>)>();
    let mut core = DebounceCore::new();
    let mut latest = GraphChange::default();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    debug!("graph change sender dropped; validation pipeline stopping");
                    break;
                }
                latest = changes.borrow_and_update().clone();
                match core.on_change(latest.generation, latest.snapshot.is_empty()) {
                    ChangeOutcome::Scheduled => {
                        debug!(generation = latest.generation, "validation scheduled");
                        deadline = Some(Instant::now() + debounce);
                    }
                    ChangeOutcome::Cleared => {
                        deadline = None;
                        if updates.send(PipelineUpdate::Cleared { generation: latest.generation }).is_err() {
                            break;
                        }
                    }
                }
            }
            () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                match core.fire() {
                    FireOutcome::Dispatch(generation) => {
                        debug!(generation, "validation dispatched");
                        let validator = Arc::clone(&validator);
                        let snapshot = Arc::clone(&latest.snapshot);
                        let done = done_tx.clone();
                        tokio::spawn(async move {
                            let result = validator.validate(&snapshot).await;
                            if done.send((generation, result)).is_err() {
                                debug!(generation, "validation finished after pipeline stopped");
                            }
                        });
                    }
                    FireOutcome::Skipped => {
                        debug!(in_flight = ?core.in_flight(), "validation skipped; call in flight");
                    }
                    FireOutcome::Idle => {}
                }
            }
            Some((generation, result)) = done_rx.recv() => {
                match core.complete(generation) {
                    Completion::Stale => {
                        debug!(generation, current = latest.generation, "stale validation result discarded");
                        if core.is_armed() {
                            deadline = Some(Instant::now() + debounce);
                        }
                    }
                    Completion::Accepted => {
                        let update = match result {
                            Ok(report) => {
                                info!(generation, has_errors = report.has_errors(), "validation applied");
                                PipelineUpdate::Validated { generation, report }
                            }
                            Err(error) => {
                                warn!(generation, error = %error, code = error.error_code(), "validation failed");
                                PipelineUpdate::Failed { generation, error }
                            }
                        };
                        if updates.send(update).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}
