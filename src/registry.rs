//! Opt-in registry & status table (C7).
//!
//! Both collaborators are process-local and fine-grained-locked:
//! `DashSet`/`DashMap` give O(1) operations without a single coarse
//! lock. Identifiers are compared as plain strings — [`crate::types`]'s
//! `SubscriptionId`/`DatabaseId` already normalize numeric provider ids to
//! strings on construction, so equality here is just string equality.

use dashmap::{DashMap, DashSet};

use crate::types::{DatabaseId, ScalingStatus, SubscriptionId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DbKey {
    subscription_id: SubscriptionId,
    database_id: DatabaseId,
}

/// Operator consent for a specific database to be actuated. Databases not
/// in this set are only ever observed, never scaled.
#[derive(Default)]
pub struct OptInRegistry {
    enabled: DashSet<DbKey>,
}

impl OptInRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: enabling an already-enabled pair is a no-op.
    pub fn enable(&self, subscription_id: SubscriptionId, database_id: DatabaseId) {
        self.enabled.insert(DbKey {
            subscription_id,
            database_id,
        });
    }

    pub fn disable(&self, subscription_id: &SubscriptionId, database_id: &DatabaseId) {
        self.enabled.remove(&DbKey {
            subscription_id: subscription_id.clone(),
            database_id: database_id.clone(),
        });
    }

    pub fn is_enabled(&self, subscription_id: &SubscriptionId, database_id: &DatabaseId) -> bool {
        self.enabled.contains(&DbKey {
            subscription_id: subscription_id.clone(),
            database_id: database_id.clone(),
        })
    }

    pub fn list(&self) -> Vec<(SubscriptionId, DatabaseId)> {
        self.enabled
            .iter()
            .map(|k| (k.subscription_id.clone(), k.database_id.clone()))
            .collect()
    }

    /// Used by the inventory cache (C3) to pick a TTL; passed in as an
    /// explicit bool rather than imported, so the cache stays ignorant of
    /// this registry's existence.
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

/// Per-database lifecycle state for an in-flight or completed scaling
/// action. Mutated only by the actuator (C6); readers treat an absent key
/// as `idle`.
#[derive(Default)]
pub struct ScalingStatusTable {
    statuses: DashMap<DatabaseId, ScalingStatus>,
}

impl ScalingStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, database_id: DatabaseId, status: ScalingStatus) {
        self.statuses.insert(database_id, status);
    }

    pub fn get(&self, database_id: &DatabaseId) -> ScalingStatus {
        self.statuses.get(database_id).map(|v| *v).unwrap_or(ScalingStatus::Idle)
    }

    /// Only non-idle entries — the `/api/autoscaling-status` response shape
    /// is `{db_id: "in_progress"|"done"}`.
    pub fn non_idle(&self) -> std::collections::HashMap<DatabaseId, ScalingStatus> {
        self.statuses
            .iter()
            .filter(|e| *e.value() != ScalingStatus::Idle)
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_then_disable_clears_membership() {
        let registry = OptInRegistry::new();
        let sub = SubscriptionId::from("1");
        let db = DatabaseId::from("2");

        registry.enable(sub.clone(), db.clone());
        assert!(registry.is_enabled(&sub, &db));

        registry.disable(&sub, &db);
        assert!(!registry.is_enabled(&sub, &db));
    }

    #[test]
    fn enable_is_idempotent() {
        let registry = OptInRegistry::new();
        let sub = SubscriptionId::from("1");
        let db = DatabaseId::from("2");

        registry.enable(sub.clone(), db.clone());
        registry.enable(sub.clone(), db.clone());
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn is_empty_reflects_membership() {
        let registry = OptInRegistry::new();
        assert!(registry.is_empty());
        registry.enable(SubscriptionId::from("1"), DatabaseId::from("2"));
        assert!(!registry.is_empty());
    }

    #[test]
    fn status_table_defaults_to_idle() {
        let statuses = ScalingStatusTable::new();
        assert_eq!(statuses.get(&DatabaseId::from("1")), ScalingStatus::Idle);
    }

    #[test]
    fn status_table_non_idle_excludes_idle_entries() {
        let statuses = ScalingStatusTable::new();
        statuses.set(DatabaseId::from("1"), ScalingStatus::InProgress);
        statuses.set(DatabaseId::from("2"), ScalingStatus::Idle);
        let snapshot = statuses.non_idle();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&DatabaseId::from("1")));
    }
}
