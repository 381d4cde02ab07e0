//! Process-wide rule cache with a single-flight refresh discipline.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::errors::ApplicationError;
use crate::mining::{
    AssociationRule, ItemsetMiner, MiningParams, MiningStatus, RuleGenerator,
    TransactionExtractor, TransactionStats,
};
use crate::sources::OrderSource;

/// Immutable outcome of one mining pass. Snapshots are shared via `Arc` and
/// replaced wholesale; nothing ever mutates a published snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleSetSnapshot {
    pub rules: Vec<AssociationRule>,
    pub status: MiningStatus,
    pub stats: TransactionStats,
    pub computed_at: DateTime<Utc>,
}

impl RuleSetSnapshot {
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.computed_at
    }
}

/// Owner of the current rule set.
///
/// Concurrency contract: readers share the current snapshot without
/// blocking each other; at most one mining pass runs at a time; a caller
/// arriving while a pass is in flight waits for and reuses that pass's
/// result instead of starting its own; a failed pass leaves the previous
/// snapshot untouched.
pub struct RuleCache<S> {
    source: S,
    params: MiningParams,
    ttl: Duration,
    min_transactions: usize,
    current: RwLock<Option<Arc<RuleSetSnapshot>>>,
    refresh_gate: Mutex<()>,
}

impl<S: OrderSource> RuleCache<S> {
    pub fn new(source: S, params: MiningParams, ttl: Duration, min_transactions: usize) -> Self {
        Self {
            source,
            params,
            ttl,
            min_transactions,
            current: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn params(&self) -> MiningParams {
        self.params
    }

    /// Current snapshot without triggering a refresh, stale or not.
    pub async fn peek(&self) -> Option<Arc<RuleSetSnapshot>> {
        self.current.read().await.clone()
    }

    /// Snapshot for query paths: a fresh entry is returned as-is, anything
    /// else goes through the single-flight refresh. When the refresh fails
    /// and a previous snapshot exists, the stale snapshot keeps serving;
    /// the error only surfaces when there is nothing to fall back to.
    pub async fn snapshot(&self) -> Result<Arc<RuleSetSnapshot>, ApplicationError> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            return Ok(snapshot);
        }

        match self.refresh(false).await {
            Ok(snapshot) => Ok(snapshot),
            Err(refresh_error) => match self.peek().await {
                Some(previous) => {
                    warn!(
                        event_name = "mining.cache.serving_stale",
                        error = %refresh_error,
                        computed_at = %previous.computed_at,
                        "mining pass failed; serving last-known-good rules"
                    );
                    Ok(previous)
                }
                None => Err(refresh_error),
            },
        }
    }

    /// Recompute the rule set unless a usable snapshot already exists.
    ///
    /// `force` bypasses the TTL check, but a pass that completed while this
    /// caller waited on the gate is still reused — that pass *is* the
    /// refresh the caller asked for.
    pub async fn refresh(&self, force: bool) -> Result<Arc<RuleSetSnapshot>, ApplicationError> {
        let waiting_since = Utc::now();
        let _gate = self.refresh_gate.lock().await;

        if let Some(snapshot) = self.peek().await {
            let completed_while_waiting = snapshot.computed_at >= waiting_since;
            let fresh = !self.is_stale(&snapshot, Utc::now());
            if completed_while_waiting || (!force && fresh) {
                return Ok(snapshot);
            }
        }

        let snapshot = Arc::new(self.mine().await?);
        *self.current.write().await = Some(Arc::clone(&snapshot));

        info!(
            event_name = "mining.cache.refreshed",
            rule_count = snapshot.rule_count(),
            transaction_count = snapshot.stats.transaction_count,
            status = %snapshot.status.message(),
            "association rule set recomputed"
        );

        Ok(snapshot)
    }

    async fn fresh_snapshot(&self) -> Option<Arc<RuleSetSnapshot>> {
        let snapshot = self.peek().await?;
        (!self.is_stale(&snapshot, Utc::now())).then_some(snapshot)
    }

    fn is_stale(&self, snapshot: &RuleSetSnapshot, now: DateTime<Utc>) -> bool {
        snapshot.age(now) > self.ttl
    }

    /// One full pipeline pass: extract, mine, generate. Returns a snapshot
    /// even when the data is too thin to mine — that outcome is a status,
    /// not an error.
    async fn mine(&self) -> Result<RuleSetSnapshot, ApplicationError> {
        let orders = self.source.load_eligible_orders().await?;
        let (transactions, stats) = TransactionExtractor.extract_with_stats(&orders);

        if transactions.len() < self.min_transactions {
            info!(
                event_name = "mining.insufficient_data",
                transaction_count = transactions.len(),
                required = self.min_transactions,
                "skipping mining pass"
            );
            return Ok(RuleSetSnapshot {
                rules: Vec::new(),
                status: MiningStatus::InsufficientTransactions {
                    found: transactions.len(),
                    required: self.min_transactions,
                },
                stats,
                computed_at: Utc::now(),
            });
        }

        let itemsets = ItemsetMiner::new(self.params).mine(&transactions);
        if itemsets.is_empty() {
            info!(
                event_name = "mining.no_frequent_itemsets",
                transaction_count = transactions.len(),
                "no itemset met the support threshold"
            );
            return Ok(RuleSetSnapshot {
                rules: Vec::new(),
                status: MiningStatus::NoFrequentItemsets,
                stats,
                computed_at: Utc::now(),
            });
        }

        let rules = RuleGenerator::new(self.params).generate(&itemsets, &transactions);
        let status = if rules.is_empty() { MiningStatus::NoRules } else { MiningStatus::Ok };

        Ok(RuleSetSnapshot { rules, status, stats, computed_at: Utc::now() })
    }
}
