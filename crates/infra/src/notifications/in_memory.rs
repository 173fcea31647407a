use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value as JsonValue;

use haulboard_core::{SharedClock, UserId};

use super::r#trait::{Notification, NotificationStore, NotificationStoreError};

type OwnerLog = Arc<Mutex<Vec<Notification>>>;

/// In-memory notification store.
///
/// One mutex-guarded log per owner; the map itself is only touched to find
/// or create that log, so appends for different owners never wait on each
/// other. Intended for tests/dev.
#[derive(Debug)]
pub struct InMemoryNotificationStore {
    clock: SharedClock,
    logs: DashMap<UserId, OwnerLog>,
}

impl InMemoryNotificationStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            logs: DashMap::new(),
        }
    }

    fn existing_log(&self, owner_id: UserId) -> Option<OwnerLog> {
        self.logs.get(&owner_id).map(|entry| Arc::clone(entry.value()))
    }
}

fn poisoned() -> NotificationStoreError {
    NotificationStoreError::Storage("lock poisoned".to_string())
}

fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

/// Smallest `f64` strictly greater than `x` (for finite `x`).
fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn append(
        &self,
        owner_id: UserId,
        name: &str,
        payload: JsonValue,
    ) -> Result<Notification, NotificationStoreError> {
        let log = Arc::clone(self.logs.entry(owner_id).or_default().value());
        let mut entries = log.lock().map_err(|_| poisoned())?;

        // The clock is read under the owner lock so append order and
        // timestamp order cannot diverge.
        let now = epoch_seconds(self.clock.now());
        let timestamp = match entries.last() {
            Some(last) if now <= last.timestamp => next_up(last.timestamp),
            _ => now,
        };

        let notification = Notification {
            owner_id,
            name: name.to_string(),
            timestamp,
            payload,
        };
        entries.push(notification.clone());
        Ok(notification)
    }

    fn since(&self, owner_id: UserId, watermark: f64) -> Result<Vec<Notification>, NotificationStoreError> {
        let Some(log) = self.existing_log(owner_id) else {
            return Ok(Vec::new());
        };
        let entries = log.lock().map_err(|_| poisoned())?;
        let start = entries.partition_point(|n| n.timestamp <= watermark);
        Ok(entries[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use haulboard_core::ManualClock;
    use proptest::prelude::*;
    use serde_json::json;

    fn frozen_store() -> (Arc<ManualClock>, InMemoryNotificationStore) {
        let clock = Arc::new(ManualClock::fixed());
        let store = InMemoryNotificationStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn timestamps_increase_even_when_the_clock_is_frozen() {
        let (_clock, store) = frozen_store();
        let owner = UserId::new();

        let stamps: Vec<f64> = (0..5)
            .map(|i| store.append(owner, "task_progress", json!(i)).unwrap().timestamp)
            .collect();

        for pair in stamps.windows(2) {
            assert!(pair[1] > pair[0], "{} !> {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn clock_going_backwards_still_yields_increasing_timestamps() {
        let (clock, store) = frozen_store();
        let owner = UserId::new();

        let first = store.append(owner, "a", json!(null)).unwrap();
        clock.advance(Duration::seconds(-30));
        let second = store.append(owner, "b", json!(null)).unwrap();

        assert!(second.timestamp > first.timestamp);
    }

    #[test]
    fn since_is_exclusive_and_ascending() {
        let (clock, store) = frozen_store();
        let owner = UserId::new();

        let n1 = store.append(owner, "unread_message_count", json!(1)).unwrap();
        clock.advance(Duration::seconds(1));
        let n2 = store.append(owner, "unread_message_count", json!(2)).unwrap();
        clock.advance(Duration::seconds(1));
        let n3 = store.append(owner, "task_progress", json!({"progress": 0.5})).unwrap();

        let all = store.since(owner, 0.0).unwrap();
        assert_eq!(all, vec![n1.clone(), n2.clone(), n3.clone()]);

        let after_first = store.since(owner, n1.timestamp).unwrap();
        assert_eq!(after_first, vec![n2, n3.clone()]);

        // Polling with the highest watermark seen returns nothing new.
        assert!(store.since(owner, n3.timestamp).unwrap().is_empty());
    }

    #[test]
    fn owners_are_isolated() {
        let (_clock, store) = frozen_store();
        let alice = UserId::new();
        let bob = UserId::new();

        store.append(alice, "x", json!(1)).unwrap();

        assert!(store.since(bob, 0.0).unwrap().is_empty());
        assert_eq!(store.since(alice, 0.0).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_appends_for_one_owner_stay_totally_ordered() {
        let (_clock, store) = frozen_store();
        let owner = UserId::new();

        std::thread::scope(|s| {
            for t in 0..8 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..50 {
                        store.append(owner, "n", json!([t, i])).unwrap();
                    }
                });
            }
        });

        let all = store.since(owner, 0.0).unwrap();
        assert_eq!(all.len(), 400);
        for pair in all.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
    }

    #[test]
    fn next_up_handles_zero_and_negatives() {
        assert!(next_up(0.0) > 0.0);
        assert!(next_up(-0.0) > 0.0);
        assert!(next_up(-1.0) > -1.0);
        assert!(next_up(1.0) > 1.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: whatever the clock does between appends, timestamps strictly increase.
        #[test]
        fn timestamps_strictly_increase(
            steps in prop::collection::vec(-2_000i64..2_000i64, 2..40)
        ) {
            let (clock, store) = frozen_store();
            let owner = UserId::new();
            let mut previous: Option<f64> = None;

            for step in steps {
                clock.advance(Duration::microseconds(step));
                let n = store.append(owner, "p", json!(step)).unwrap();
                if let Some(prev) = previous {
                    prop_assert!(n.timestamp > prev);
                }
                previous = Some(n.timestamp);
            }
        }
    }
}
