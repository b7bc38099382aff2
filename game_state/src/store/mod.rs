//! State store - the ledger of named integer counters.
//!
//! The store is the only shared mutable world state. It is mutated through
//! [`StateStore::add`] and [`StateStore::add_batch`] and read through
//! [`StateStore::get`] and [`StateStore::check_conditions`]. Every notifying
//! mutation publishes a [`StateChanged`] event on [`StateStore::changed`].
//!
//! Methods take `&self` so a change handler can read or mutate the store
//! while a fan-out is running. A handler that calls `add` triggers a nested
//! notification that completes before the outer fan-out continues; use
//! `add_batch` when observers must not see a partially applied transaction.

mod condition;

pub use condition::*;

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

use crate::signal::Signal;

/// A counter entry in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCounter {
    pub id: String,
    pub amount: i32,
}

impl NamedCounter {
    /// Create a new counter entry.
    pub fn new(id: impl Into<String>, amount: i32) -> Self {
        Self {
            id: id.into(),
            amount,
        }
    }
}

/// Payload of the store's change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanged;

/// What an `add` call did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new counter was created with the given amount.
    Created,
    /// An existing counter was incremented.
    Updated { previous: i32, current: i32 },
    /// The call was rejected and the ledger is unchanged.
    Ignored(IgnoreReason),
}

impl AddOutcome {
    /// Check whether the ledger changed.
    pub fn is_applied(&self) -> bool {
        !matches!(self, AddOutcome::Ignored(_))
    }
}

/// Why an `add` call was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The id was empty or whitespace.
    EmptyId,
    /// Adding zero would not change anything.
    ZeroAmount,
}

/// The counter ledger with change notification.
#[derive(Debug, Default)]
pub struct StateStore {
    counters: RefCell<HashMap<String, i32>>,
    changed: Signal<StateChanged>,
}

impl StateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with counters. No notification is published.
    ///
    /// Entries sharing an id accumulate the same way repeated `add` calls do.
    pub fn with_counters(counters: impl IntoIterator<Item = NamedCounter>) -> Self {
        let store = Self::new();
        for counter in counters {
            store.add_silently(&counter.id, counter.amount);
        }
        store
    }

    /// Look up a counter.
    pub fn get(&self, id: &str) -> Option<NamedCounter> {
        self.counters
            .borrow()
            .get(id)
            .map(|amount| NamedCounter::new(id, *amount))
    }

    /// Current amount of a counter, treating absent counters as 0.
    pub fn amount(&self, id: &str) -> i32 {
        self.counters.borrow().get(id).copied().unwrap_or(0)
    }

    /// Add `amount` to counter `id` and notify observers.
    pub fn add(&self, id: &str, amount: i32) -> AddOutcome {
        self.add_with_notify(id, amount, true)
    }

    /// Add `amount` to counter `id` without notifying observers.
    pub fn add_silently(&self, id: &str, amount: i32) -> AddOutcome {
        self.add_with_notify(id, amount, false)
    }

    /// Add `amount` to counter `id`, creating it on first use.
    ///
    /// Empty ids and zero amounts are ignored with a warning and never notify.
    pub fn add_with_notify(&self, id: &str, amount: i32, notify: bool) -> AddOutcome {
        if id.trim().is_empty() {
            tracing::warn!(amount, "State id is empty. Give each state an id.");
            return AddOutcome::Ignored(IgnoreReason::EmptyId);
        }

        if amount == 0 {
            tracing::warn!(id = %id, "Adding 0 to state; this will not change it");
            return AddOutcome::Ignored(IgnoreReason::ZeroAmount);
        }

        let outcome = {
            let mut counters = self.counters.borrow_mut();
            match counters.get_mut(id) {
                Some(current) => {
                    let previous = *current;
                    // Counters wrap at the i32 bounds.
                    *current = current.wrapping_add(amount);
                    AddOutcome::Updated {
                        previous,
                        current: *current,
                    }
                }
                None => {
                    counters.insert(id.to_string(), amount);
                    AddOutcome::Created
                }
            }
        };

        tracing::debug!(id = %id, amount, ?outcome, "State updated");

        if notify {
            self.changed.emit(&StateChanged);
        }

        outcome
    }

    /// Apply several additions and publish exactly one notification.
    ///
    /// An empty batch publishes nothing. A non-empty batch notifies once even
    /// if every entry was ignored.
    pub fn add_batch(&self, entries: impl IntoIterator<Item = NamedCounter>) -> Vec<AddOutcome> {
        let outcomes: Vec<_> = entries
            .into_iter()
            .map(|entry| self.add_silently(&entry.id, entry.amount))
            .collect();

        if !outcomes.is_empty() {
            self.changed.emit(&StateChanged);
        }

        outcomes
    }

    /// Check that every condition is met. Absent counters count as 0.
    pub fn check_conditions(&self, conditions: &ConditionSet) -> bool {
        let counters = self.counters.borrow();
        conditions
            .iter()
            .all(|condition| counters.get(&condition.id).copied().unwrap_or(0) >= condition.amount)
    }

    /// The change notification signal.
    pub fn changed(&self) -> &Signal<StateChanged> {
        &self.changed
    }

    /// Snapshot of all counters, sorted by id.
    pub fn counters(&self) -> Vec<NamedCounter> {
        let mut all: Vec<_> = self
            .counters
            .borrow()
            .iter()
            .map(|(id, amount)| NamedCounter::new(id.clone(), *amount))
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Number of counters in the ledger.
    pub fn len(&self) -> usize {
        self.counters.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn count_notifications(store: &StateStore) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        store
            .changed()
            .subscribe(move |_| count_clone.set(count_clone.get() + 1));
        count
    }

    #[test]
    fn test_add_accumulates() {
        let store = StateStore::new();

        assert_eq!(store.add("coins", 3), AddOutcome::Created);
        assert_eq!(
            store.add("coins", 4),
            AddOutcome::Updated {
                previous: 3,
                current: 7
            }
        );
        store.add("coins", -10);

        assert_eq!(store.get("coins"), Some(NamedCounter::new("coins", -3)));
    }

    #[test]
    fn test_get_missing() {
        let store = StateStore::new();
        assert!(store.get("nothing").is_none());
        assert_eq!(store.amount("nothing"), 0);
    }

    #[test]
    fn test_add_zero_is_ignored() {
        let store = StateStore::new();
        let notifications = count_notifications(&store);

        assert_eq!(
            store.add("coins", 0),
            AddOutcome::Ignored(IgnoreReason::ZeroAmount)
        );
        assert!(store.get("coins").is_none());

        store.add("coins", 2);
        store.add("coins", 0);
        assert_eq!(store.amount("coins"), 2);
        assert_eq!(notifications.get(), 1);
    }

    #[test]
    fn test_add_empty_id_is_ignored() {
        let store = StateStore::new();
        let notifications = count_notifications(&store);

        assert_eq!(store.add("", 1), AddOutcome::Ignored(IgnoreReason::EmptyId));
        assert_eq!(
            store.add("   ", 1),
            AddOutcome::Ignored(IgnoreReason::EmptyId)
        );
        assert!(store.is_empty());
        assert_eq!(notifications.get(), 0);
    }

    #[test]
    fn test_add_notifies_once_per_call() {
        let store = StateStore::new();
        let notifications = count_notifications(&store);

        store.add("a", 1);
        store.add("a", 1);
        store.add_silently("a", 1);

        assert_eq!(notifications.get(), 2);
        assert_eq!(store.amount("a"), 3);
    }

    #[test]
    fn test_add_batch_notifies_once() {
        let store = StateStore::new();
        let notifications = count_notifications(&store);

        let outcomes = store.add_batch(vec![
            NamedCounter::new("a", 1),
            NamedCounter::new("b", 2),
            NamedCounter::new("a", 5),
        ]);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(notifications.get(), 1);
        assert_eq!(store.amount("a"), 6);
        assert_eq!(store.amount("b"), 2);
    }

    #[test]
    fn test_empty_batch_does_not_notify() {
        let store = StateStore::new();
        let notifications = count_notifications(&store);

        store.add_batch(Vec::new());
        assert_eq!(notifications.get(), 0);
    }

    #[test]
    fn test_batch_observers_see_final_state() {
        let store = Rc::new(StateStore::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let store_clone = Rc::clone(&store);
        let seen_clone = Rc::clone(&seen);
        store.changed().subscribe(move |_| {
            seen_clone
                .borrow_mut()
                .push((store_clone.amount("a"), store_clone.amount("b")));
        });

        store.add_batch(vec![NamedCounter::new("a", 1), NamedCounter::new("b", 1)]);

        assert_eq!(*seen.borrow(), vec![(1, 1)]);
    }

    #[test]
    fn test_check_conditions() {
        let store = StateStore::new();
        store.add("key", 1);
        store.add("coins", 5);

        assert!(store.check_conditions(&ConditionSet::new()));
        assert!(store.check_conditions(&ConditionSet::new().with("key", 1)));
        assert!(store.check_conditions(&ConditionSet::new().with("key", 1).with("coins", 5)));
        assert!(!store.check_conditions(&ConditionSet::new().with("coins", 6)));
        assert!(!store.check_conditions(&ConditionSet::new().with("missing", 1)));
        assert!(store.check_conditions(&ConditionSet::new().with("missing", 0)));
        assert!(store.check_conditions(&ConditionSet::new().with("missing", -1)));
    }

    #[test]
    fn test_reentrant_add_from_handler() {
        let store = Rc::new(StateStore::new());
        let notifications = count_notifications(&store);

        let store_clone = Rc::clone(&store);
        store.changed().subscribe(move |_| {
            if store_clone.amount("trigger") == 1 && store_clone.get("reward").is_none() {
                store_clone.add("reward", 1);
            }
        });

        store.add("trigger", 1);

        assert_eq!(store.amount("reward"), 1);
        assert_eq!(notifications.get(), 2);
    }

    #[test]
    fn test_with_counters_seeds_silently() {
        let store = StateStore::with_counters(vec![
            NamedCounter::new("met_guard", 1),
            NamedCounter::new("coins", 3),
            NamedCounter::new("coins", 2),
        ]);

        assert_eq!(store.amount("coins"), 5);
        assert_eq!(
            store.counters(),
            vec![NamedCounter::new("coins", 5), NamedCounter::new("met_guard", 1)]
        );
    }

    #[test]
    fn test_add_wraps_at_bounds() {
        let store = StateStore::new();
        store.add("big", i32::MAX);

        assert_eq!(
            store.add("big", 1),
            AddOutcome::Updated {
                previous: i32::MAX,
                current: i32::MIN,
            }
        );
        assert_eq!(store.amount("big"), i32::MIN);
    }
}
