use hashbrown::HashMap;

use crate::models::MetricType;

/// Reference-counted skill-window subscriptions keyed by (player uid, metric).
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    counts: HashMap<(i64, MetricType), u32>,
    generation: u64,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the subscriber count after subscribing.
    pub fn subscribe(&mut self, uid: i64, metric: MetricType) -> u32 {
        let count = self.counts.entry((uid, metric)).or_default();
        *count += 1;
        self.generation += 1;

        *count
    }

    /// Returns false when there was nothing to unsubscribe.
    pub fn unsubscribe(&mut self, uid: i64, metric: MetricType) -> bool {
        let Some(count) = self.counts.get_mut(&(uid, metric)) else {
            return false;
        };

        *count -= 1;
        if *count == 0 {
            self.counts.remove(&(uid, metric));
        }
        self.generation += 1;

        true
    }

    pub fn is_subscribed(&self, uid: i64, metric: MetricType) -> bool {
        self.counts.contains_key(&(uid, metric))
    }

    /// Subscribed pairs in a stable order.
    pub fn active(&self) -> Vec<(i64, MetricType)> {
        let mut active: Vec<(i64, MetricType)> = self.counts.keys().copied().collect();
        active.sort_by_key(|(uid, metric)| (*uid, *metric as u8));
        active
    }

    /// Bumped on every change so the publisher can tell when to recompute.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
