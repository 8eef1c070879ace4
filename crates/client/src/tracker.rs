//! Correlation of outgoing commands with their acknowledgements

use embedctl_core::menu::MenuItem;
use embedctl_core::protocol::CorrelationId;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Pending {
    item: Option<MenuItem>,
    sent_at: Instant,
}

/// Issues correlation ids and remembers what each one was for
///
/// Ids are never zero and never collide with an outstanding id. An entry
/// resolves at most once; resolving it again yields nothing.
#[derive(Debug)]
pub struct CorrelationTracker {
    timeout: Duration,
    counter: u32,
    pending: HashMap<CorrelationId, Pending>,
}

impl CorrelationTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            counter: rand::rng().random(),
            pending: HashMap::new(),
        }
    }

    /// Fresh id, unique among the outstanding ones
    pub fn next_id(&mut self) -> CorrelationId {
        loop {
            self.counter = self.counter.wrapping_add(1);
            let id = CorrelationId(self.counter);
            if !id.is_none() && !self.pending.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn register(&mut self, id: CorrelationId, item: Option<MenuItem>) {
        self.register_at(id, item, Instant::now());
    }

    pub fn register_at(&mut self, id: CorrelationId, item: Option<MenuItem>, sent_at: Instant) {
        self.pending.insert(id, Pending { item, sent_at });
    }

    /// Take the entry for an acknowledged id
    ///
    /// `None` for ids that were never issued, already resolved or expired.
    /// The inner option is the item the command was about, if any.
    pub fn resolve(&mut self, id: CorrelationId) -> Option<Option<MenuItem>> {
        self.pending.remove(&id).map(|pending| pending.item)
    }

    /// Drop entries older than the timeout and return them
    pub fn purge_expired(&mut self, now: Instant) -> Vec<(CorrelationId, Option<MenuItem>)> {
        let timeout = self.timeout;
        let expired: Vec<CorrelationId> = self
            .pending
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.sent_at) >= timeout)
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| {
                let pending = self.pending.remove(&id)?;
                debug!(
                    "No acknowledgement for {} after {:?}, forgetting it",
                    id, self.timeout
                );
                Some((id, pending.item))
            })
            .collect()
    }

    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedctl_core::menu::{AnalogInfo, MenuItemBuilder};
    use std::collections::HashSet;

    fn item() -> MenuItem {
        MenuItemBuilder::analog(5, "Volume", AnalogInfo::default()).build()
    }

    #[test]
    fn test_ids_are_unique_and_never_zero() {
        let mut tracker = CorrelationTracker::new(Duration::from_secs(5));
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let id = tracker.next_id();
            assert!(!id.is_none());
            assert!(seen.insert(id));
            tracker.register(id, None);
        }
        assert_eq!(tracker.outstanding(), 1000);
    }

    #[test]
    fn test_counter_skips_zero_and_outstanding_ids() {
        let mut tracker = CorrelationTracker::new(Duration::from_secs(5));
        tracker.counter = u32::MAX - 1;
        tracker.register(CorrelationId(u32::MAX), None);
        tracker.register(CorrelationId(1), None);

        assert_eq!(tracker.next_id(), CorrelationId(2));
    }

    #[test]
    fn test_resolve_is_at_most_once() {
        let mut tracker = CorrelationTracker::new(Duration::from_secs(5));
        let id = tracker.next_id();
        tracker.register(id, Some(item()));

        assert_eq!(tracker.resolve(id), Some(Some(item())));
        assert_eq!(tracker.resolve(id), None);
        assert_eq!(tracker.resolve(CorrelationId(12345)), None);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let mut tracker = CorrelationTracker::new(Duration::from_secs(5));
        let start = Instant::now();
        let old = tracker.next_id();
        let fresh = tracker.next_id();
        tracker.register_at(old, Some(item()), start);
        tracker.register_at(fresh, None, start + Duration::from_secs(4));

        let expired = tracker.purge_expired(start + Duration::from_secs(6));
        assert_eq!(expired, vec![(old, Some(item()))]);
        assert_eq!(tracker.outstanding(), 1);
        assert_eq!(tracker.resolve(old), None);
        assert!(tracker.resolve(fresh).is_some());
    }
}
