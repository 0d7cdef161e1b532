//! In-memory delayed set keyed by scheduled instant.

use std::collections::BTreeMap;

use parking_lot::Mutex;

/// Items waiting for their scheduled instant (ms since the Unix epoch).
///
/// Several items may share an instant; they are kept in insertion order and
/// promoted together. The map is ordered so that taking every due item is a
/// single split of the tree.
pub struct DelayedSet<T> {
    entries: Mutex<BTreeMap<u128, Vec<T>>>,
}

impl<T> Default for DelayedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DelayedSet<T> {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Park `item` until `at_ms`.
    pub fn insert(&self, at_ms: u128, item: T) {
        self.entries.lock().entry(at_ms).or_default().push(item);
    }

    /// Remove and return every item whose instant is at or before `now_ms`,
    /// earliest instant first.
    pub fn take_due(&self, now_ms: u128) -> Vec<T> {
        let mut entries = self.entries.lock();
        let later = match now_ms.checked_add(1) {
            Some(bound) => entries.split_off(&bound),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut *entries, later);
        drop(entries);
        due.into_values().flatten().collect()
    }

    /// Number of parked items.
    pub fn len(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    /// Whether nothing is parked.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Distinct scheduled instants, ascending.
    pub fn instants(&self) -> Vec<u128> {
        self.entries.lock().keys().copied().collect()
    }

    /// Earliest scheduled instant, if any.
    pub fn next_due(&self) -> Option<u128> {
        self.entries.lock().keys().next().copied()
    }
}
