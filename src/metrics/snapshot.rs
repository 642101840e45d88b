//! Metric snapshot and the per-key merge rule.
//!
//! Every key remembers the ordering of the update that last wrote it. An
//! update for a key is applied when it is not older than that ordering and
//! discarded otherwise, so updates delivered out of order by independent
//! feeds never regress a value.

use crate::metrics::types::{FeedKind, FeedOrdering, FeedUpdate};
use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Latest value per metric key, merged across feeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsSnapshot {
    values: BTreeMap<String, Value>,
}

impl MetricsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    fn insert(&mut self, key: String, value: Value) -> bool {
        match self.values.get(&key) {
            Some(existing) if *existing == value => false,
            _ => {
                self.values.insert(key, value);
                true
            }
        }
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

/// Effective ordering of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOrder {
    /// Sequence or timestamp reported by the feed.
    pub provided: Option<FeedOrdering>,
    /// Position in the aggregator's ingestion order.
    pub arrival: u64,
}

impl UpdateOrder {
    /// Feed-provided values are compared when both sides have one of the
    /// same kind; otherwise arrival order decides.
    pub fn is_older_than(&self, other: &UpdateOrder) -> bool {
        match self
            .provided
            .zip(other.provided)
            .and_then(|(a, b)| a.compare(&b))
        {
            Some(ord) => ord == Ordering::Less,
            None => self.arrival < other.arrival,
        }
    }
}

/// Result of merging one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub applied: usize,
    pub discarded: usize,
    /// Whether any snapshot value actually changed.
    pub changed: bool,
}

#[derive(Debug, Clone, Copy)]
struct LastWrite {
    feed: FeedKind,
    order: UpdateOrder,
}

/// Snapshot plus the ordering ledger that guards it.
#[derive(Debug, Default)]
pub struct MetricsMerger {
    snapshot: MetricsSnapshot,
    ledger: HashMap<String, LastWrite>,
    arrivals: u64,
}

impl MetricsMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &MetricsSnapshot {
        &self.snapshot
    }

    /// Merges `update` from `feed`, key by key.
    pub fn merge(&mut self, feed: FeedKind, update: FeedUpdate) -> MergeOutcome {
        self.arrivals += 1;
        let order = UpdateOrder {
            provided: update.ordering(),
            arrival: self.arrivals,
        };

        let mut outcome = MergeOutcome::default();
        for (key, value) in update.metrics {
            let stale = self
                .ledger
                .get(&key)
                .is_some_and(|last| order.is_older_than(&last.order));
            if stale {
                outcome.discarded += 1;
                continue;
            }

            self.ledger.insert(key.clone(), LastWrite { feed, order });
            outcome.changed |= self.snapshot.insert(key, value);
            outcome.applied += 1;
        }
        outcome
    }

    /// Drops ordering state owned by `feed`. Values stay in the snapshot.
    pub fn release_feed(&mut self, feed: FeedKind) {
        self.ledger.retain(|_, last| last.feed != feed);
    }

    /// Empties the snapshot and all ordering state.
    pub fn reset(&mut self) {
        self.snapshot.clear();
        self.ledger.clear();
        self.arrivals = 0;
    }
}
