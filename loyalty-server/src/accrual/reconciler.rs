//! Accrual reconciliation loop
//!
//! Every tick selects a batch of unresolved orders (oldest first) and walks
//! them one by one: poll the accrual service, wait and poll again while the
//! answer is not final, then credit the ledger. A failure on one order is
//! logged and the batch moves on.
//!
//! Every poll and every wait races the shutdown token, so
//! [`ReconcilerHandle::stop`] returns promptly even mid-backoff. A credit that
//! has already started is allowed to commit.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use shared::OrderStatus;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{AccrualError, AccrualSource, AccrualStatus, PollOutcome};
use crate::ledger::{CreditOutcome, Ledger, LedgerError, PendingOrder};

/// Reconciler timing and batch limits
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Tick period between cycles
    pub interval: Duration,
    /// Orders selected per cycle
    pub batch_size: u32,
    /// Wait after a REGISTERED/PROCESSING answer
    pub retry_interval: Duration,
    /// Wait after a 429 without `Retry-After`
    pub rate_limit_backoff: Duration,
    /// Polls per order per cycle before deferring it; 0 means unbounded
    pub max_attempts: u32,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            batch_size: 50,
            retry_interval: Duration::from_secs(1),
            rate_limit_backoff: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// What happened during one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub selected: usize,
    /// Credited (or found already resolved)
    pub resolved: usize,
    /// Left for a later cycle
    pub deferred: usize,
    pub failed: usize,
    /// Shutdown was requested before the batch was finished
    pub interrupted: bool,
}

enum OrderOutcome {
    Resolved,
    Deferred,
    Interrupted,
}

#[derive(Debug, Error)]
enum OrderFailure {
    #[error(transparent)]
    Accrual(#[from] AccrualError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Background worker applying accrual verdicts to the ledger
pub struct AccrualReconciler {
    ledger: Ledger,
    source: Arc<dyn AccrualSource>,
    settings: ReconcilerSettings,
    shutdown: CancellationToken,
}

impl AccrualReconciler {
    pub fn new(
        ledger: Ledger,
        source: Arc<dyn AccrualSource>,
        settings: ReconcilerSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ledger,
            source,
            settings,
            shutdown,
        }
    }

    /// Spawn [`run`](Self::run) on the runtime
    ///
    /// A panic inside the loop is caught and logged; the handle still stops
    /// cleanly afterwards.
    pub fn start(self) -> ReconcilerHandle {
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(async move {
            if let Err(panic_info) = AssertUnwindSafe(self.run()).catch_unwind().await {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                tracing::error!(panic = %panic_msg, "Accrual reconciler panicked");
            }
        });
        ReconcilerHandle { shutdown, task }
    }

    /// Main loop: one cycle per tick until shutdown
    pub async fn run(self) {
        tracing::info!(
            interval_ms = self.settings.interval.as_millis() as u64,
            batch_size = self.settings.batch_size,
            "Accrual reconciler started"
        );

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.run_cycle().await {
                Ok(report) => {
                    if report.selected > 0 {
                        tracing::debug!(
                            selected = report.selected,
                            resolved = report.resolved,
                            deferred = report.deferred,
                            failed = report.failed,
                            "Reconciliation cycle finished"
                        );
                    }
                    if report.interrupted {
                        break;
                    }
                }
                // Retried on the next tick
                Err(e) => tracing::error!(error = %e, "Failed to select pending orders"),
            }
        }

        tracing::info!("Accrual reconciler stopped");
    }

    /// One pass over a batch of unresolved orders
    ///
    /// Only batch selection can fail the cycle; per-order problems are
    /// counted in the report.
    pub async fn run_cycle(&self) -> Result<CycleReport, LedgerError> {
        let batch = self
            .ledger
            .pending_orders(i64::from(self.settings.batch_size))
            .await?;

        let mut report = CycleReport {
            selected: batch.len(),
            ..Default::default()
        };

        for order in &batch {
            if self.shutdown.is_cancelled() {
                report.interrupted = true;
                break;
            }

            match self.reconcile_order(order).await {
                Ok(OrderOutcome::Resolved) => report.resolved += 1,
                Ok(OrderOutcome::Deferred) => report.deferred += 1,
                Ok(OrderOutcome::Interrupted) => {
                    report.interrupted = true;
                    break;
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        order = %order.number,
                        owner = %order.owner,
                        error = %e,
                        "Order reconciliation failed, continuing with next order"
                    );
                }
            }
        }

        Ok(report)
    }

    async fn reconcile_order(&self, order: &PendingOrder) -> Result<OrderOutcome, OrderFailure> {
        let number = order.number.as_str();
        let mut marked = order.status == OrderStatus::Processing;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(OrderOutcome::Interrupted),
                result = self.source.poll(number) => result?,
            };

            let pause = match outcome {
                PollOutcome::Resolved(verdict) => {
                    let credited = self
                        .ledger
                        .credit(number, verdict.status(), verdict.amount())
                        .await?;
                    if credited == CreditOutcome::AlreadyResolved {
                        tracing::debug!(order = %number, "Order already resolved elsewhere");
                    }
                    return Ok(OrderOutcome::Resolved);
                }
                PollOutcome::Pending(status) => {
                    if status == AccrualStatus::Processing && !marked {
                        self.ledger.mark_processing(number).await?;
                        marked = true;
                    }
                    self.settings.retry_interval
                }
                PollOutcome::RateLimited(retry_after) => {
                    let pause = retry_after
                        .unwrap_or(self.settings.rate_limit_backoff)
                        .max(self.settings.retry_interval);
                    tracing::info!(order = %number, wait_ms = pause.as_millis() as u64, "Accrual service rate limited");
                    pause
                }
                PollOutcome::Unknown => {
                    tracing::debug!(order = %number, "Order not known to accrual service yet");
                    return Ok(OrderOutcome::Deferred);
                }
            };

            if self.settings.max_attempts > 0 && attempts >= self.settings.max_attempts {
                tracing::debug!(order = %number, attempts, "Attempt budget spent, deferring");
                return Ok(OrderOutcome::Deferred);
            }

            if !self.wait(pause).await {
                return Ok(OrderOutcome::Interrupted);
            }
        }
    }

    /// Sleep unless shutdown comes first; false when interrupted
    async fn wait(&self, pause: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(pause) => true,
        }
    }
}

/// Running reconciler
pub struct ReconcilerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Cancel the loop and wait until it has exited
    pub async fn stop(self) {
        self.shutdown.cancel();
        match self.task.await {
            Ok(()) => tracing::debug!("Accrual reconciler joined"),
            Err(e) if e.is_cancelled() => tracing::debug!("Accrual reconciler task cancelled"),
            Err(e) => tracing::error!(error = ?e, "Accrual reconciler task failed"),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
