//! Scaling actuator (C6): single-flight execution, duplicate suppression,
//! and task-status polling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

use crate::decision::{compute_target, needs_scaling, ScalingPercentages};
use crate::error::{Error, Result};
use crate::provider::models::UpdateOutcome;
use crate::provider::ProviderClient;
use crate::registry::ScalingStatusTable;
use crate::types::{Database, DatabaseId, Envelope, MetricsWindow, PartialShape, ScalingStatus, SubscriptionId, TaskId, Thresholds};

/// Deduplication window for identical scaling actions on the same
/// database.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(300);
/// Pause between issuing a 202 and probing the task's status once
///.
pub const TASK_PROBE_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone)]
struct RecentAction {
    values: PartialShape,
    at: Instant,
}

/// Per-subscription mutex (tryLock semantics) plus a dedup ledger.
/// Neither field is ever exposed outside this module — callers only ever
/// see `autoscale`'s boolean/error outcome.
#[derive(Default)]
pub struct Actuator {
    locks: DashMap<SubscriptionId, Arc<AsyncMutex<()>>>,
    ledger: DashMap<DatabaseId, RecentAction>,
}

impl Actuator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, subscription_id: &SubscriptionId) -> Arc<AsyncMutex<()>> {
        self.locks
            .entry(subscription_id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Runs the full scale-check-then-act contract for one database: claim
    /// the per-subscription lock, check cooldown/need/envelope, send the
    /// update, and record the result. Returns `Ok(true)` only when an update
    /// was actually sent to the provider; `Ok(false)` for every
    /// non-exceptional precondition/contention/no-op path.
    #[instrument(skip_all, fields(database_id = %database.id, subscription_id = %database.subscription_id))]
    pub async fn autoscale<P: ProviderClient>(
        &self,
        provider: &P,
        status_table: &ScalingStatusTable,
        database: &Database,
        autoscale_window: &MetricsWindow,
        thresholds: &Thresholds,
        envelope: &Envelope,
        pct: &ScalingPercentages,
        all_databases: &[Database],
    ) -> Result<bool> {
        let quiescent = all_databases
            .iter()
            .filter(|d| d.subscription_id == database.subscription_id)
            .all(|d| d.is_active());
        if !quiescent {
            return Ok(false);
        }
        if !database.is_active() {
            return Ok(false);
        }

        let lock = self.lock_for(&database.subscription_id);
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => return Ok(false),
        };

        let need = needs_scaling(autoscale_window, thresholds, envelope);
        if !need.any() {
            return Ok(false);
        }

        status_table.set(database.id.clone(), ScalingStatus::InProgress);

        let target = compute_target(&database.shape, autoscale_window, envelope, pct);
        if target.is_empty() {
            return Ok(false);
        }

        if let Some(recent) = self.ledger.get(&database.id) {
            if recent.values == target && recent.at.elapsed() < DEDUP_WINDOW {
                info!("duplicate scaling action suppressed within dedup window");
                return Ok(false);
            }
        }

        let outcome = provider
            .update_database(&database.subscription_id, &database.id, &target)
            .await?;

        let Some(outcome) = outcome else {
            return Ok(false);
        };

        self.ledger.insert(
            database.id.clone(),
            RecentAction {
                values: target,
                at: Instant::now(),
            },
        );

        match outcome {
            UpdateOutcome::Immediate => {
                status_table.set(database.id.clone(), ScalingStatus::Done);
            }
            UpdateOutcome::Task { task_id } => {
                tokio::time::sleep(TASK_PROBE_DELAY).await;
                let status = provider.task_status(&TaskId::from(task_id.clone())).await?;
                if status.is_success() {
                    status_table.set(database.id.clone(), ScalingStatus::Done);
                } else if status.is_failure() {
                    return Err(Error::TaskFailed {
                        task_id,
                        status: format!("{status:?}"),
                    });
                } else {
                    // Neither terminal nor success: leave `in_progress` and
                    // let the next metrics tick reconcile.
                    warn!(task_id = %task_id, "task still pending after probe; deferring to next cycle");
                }
            }
        }

        Ok(true)
    }
}
