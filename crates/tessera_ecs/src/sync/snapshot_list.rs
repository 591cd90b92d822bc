//! # Snapshot List
//!
//! A list that can be iterated over a frozen copy while the live store keeps
//! accepting mutations.
//!
//! ## Protocol
//!
//! ```text
//!   begin() ──> Snapshot ──┬── commit()   keep the live store as it is now
//!                          ├── discard()  roll the live store back to the
//!                          │              frozen copy if it was modified
//!                          └── drop       commit
//! ```
//!
//! - Mutators (`add`, `insert`, `remove`, `remove_at`, `set`, `clear`) always
//!   apply to the live store immediately and notify observers immediately.
//!   They are never deferred, and a discard never un-sends a notification.
//! - `begin()` copies the live store into a reusable scratch buffer. The
//!   buffer grows by doubling and shrinks when it is more than twice as large
//!   as needed.
//! - One iteration at a time per list. Use a second list for nested walks.
//!
//! ## Thread Safety
//!
//! State lives behind a `parking_lot::Mutex`, so a list can be shared through
//! an `Arc`. The lock is never held while a snapshot is being walked.

use std::fmt;
use std::ops::Deref;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::error::{EcsError, EcsResult};
use crate::events::Observers;

/// Smallest scratch capacity ever allocated.
const MIN_SCRATCH: usize = 16;

/// Membership change reported by a [`SnapshotList`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListEvent<T> {
    /// An item entered the live store.
    Added(T),
    /// An item left the live store.
    Removed(T),
}

struct ListState<T> {
    items: Vec<T>,
    scratch: Vec<T>,
    iterating: bool,
    modified: bool,
}

impl<T> ListState<T> {
    #[inline]
    fn touch(&mut self) {
        if self.iterating {
            self.modified = true;
        }
    }
}

/// Collection with snapshot-stable iteration and Commit/Discard.
pub struct SnapshotList<T> {
    state: Mutex<ListState<T>>,
    observers: Mutex<Observers<ListEvent<T>>>,
}

impl<T> Default for SnapshotList<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(ListState {
                items: Vec::new(),
                scratch: Vec::new(),
                iterating: false,
                modified: false,
            }),
            observers: Mutex::new(Observers::default()),
        }
    }
}

impl<T: Clone + PartialEq> SnapshotList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list holding `items`. No notifications are sent.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        let list = Self::default();
        list.state.lock().items = items;
        list
    }

    /// Registers an observer for add/remove notifications.
    pub fn subscribe(&self) -> Receiver<ListEvent<T>> {
        self.observers.lock().subscribe()
    }

    fn notify(&self, event: ListEvent<T>) {
        let mut observers = self.observers.lock();
        if !observers.is_empty() {
            observers.emit(&event);
        }
    }

    // =========================================================================
    // Live store mutation
    // =========================================================================

    /// Appends `item`.
    pub fn add(&self, item: T) {
        {
            let mut state = self.state.lock();
            state.items.push(item.clone());
            state.touch();
        }
        self.notify(ListEvent::Added(item));
    }

    /// Inserts `item` at `index`, shifting later items.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfBounds`] if `index > len`.
    pub fn insert(&self, index: usize, item: T) -> EcsResult<()> {
        {
            let mut state = self.state.lock();
            let len = state.items.len();
            if index > len {
                return Err(EcsError::IndexOutOfBounds { index, len });
            }
            state.items.insert(index, item.clone());
            state.touch();
        }
        self.notify(ListEvent::Added(item));
        Ok(())
    }

    /// Removes the first occurrence of `item`, preserving order.
    ///
    /// Returns `true` if the item was present.
    pub fn remove(&self, item: &T) -> bool {
        let removed = {
            let mut state = self.state.lock();
            let Some(index) = state.items.iter().position(|x| x == item) else {
                return false;
            };
            let removed = state.items.remove(index);
            state.touch();
            removed
        };
        self.notify(ListEvent::Removed(removed));
        true
    }

    /// Removes and returns the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfBounds`] if `index >= len`.
    pub fn remove_at(&self, index: usize) -> EcsResult<T> {
        let removed = {
            let mut state = self.state.lock();
            let len = state.items.len();
            if index >= len {
                return Err(EcsError::IndexOutOfBounds { index, len });
            }
            let removed = state.items.remove(index);
            state.touch();
            removed
        };
        self.notify(ListEvent::Removed(removed.clone()));
        Ok(removed)
    }

    /// Replaces the item at `index`, returning the old one.
    ///
    /// Observers see the old item removed and the new one added.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfBounds`] if `index >= len`.
    pub fn set(&self, index: usize, item: T) -> EcsResult<T> {
        let old = {
            let mut state = self.state.lock();
            let len = state.items.len();
            let Some(slot) = state.items.get_mut(index) else {
                return Err(EcsError::IndexOutOfBounds { index, len });
            };
            let old = std::mem::replace(slot, item.clone());
            state.touch();
            old
        };
        self.notify(ListEvent::Removed(old.clone()));
        self.notify(ListEvent::Added(item));
        Ok(old)
    }

    /// Removes every item, notifying once per item.
    pub fn clear(&self) {
        let drained: Vec<T> = {
            let mut state = self.state.lock();
            if state.items.is_empty() {
                return;
            }
            state.touch();
            state.items.drain(..).collect()
        };
        for item in drained {
            self.notify(ListEvent::Removed(item));
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of items in the live store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns `true` if the live store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Checks the live store for `item`.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.state.lock().items.contains(item)
    }

    /// Returns a copy of the item at `index` in the live store.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.state.lock().items.get(index).cloned()
    }

    /// Copies the live store.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.state.lock().items.clone()
    }

    /// Replaces the contents of `out` with the live store.
    ///
    /// `out` is sized the same way as the internal scratch buffer. This does
    /// not start an iteration, so it works while one is outstanding.
    pub fn copy_into(&self, out: &mut Vec<T>) {
        let state = self.state.lock();
        fit_scratch(out, state.items.len());
        out.extend_from_slice(&state.items);
    }

    /// Returns `true` while a [`Snapshot`] is outstanding.
    #[must_use]
    pub fn is_iterating(&self) -> bool {
        self.state.lock().iterating
    }

    /// Current scratch buffer capacity (zero while a snapshot holds it).
    #[must_use]
    pub fn scratch_capacity(&self) -> usize {
        self.state.lock().scratch.capacity()
    }

    // =========================================================================
    // Iteration protocol
    // =========================================================================

    /// Freezes the live store and starts an iteration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ReentrantIteration`] if this list is already
    /// iterating.
    pub fn begin(&self) -> EcsResult<Snapshot<'_, T>> {
        let mut state = self.state.lock();
        if state.iterating {
            return Err(EcsError::ReentrantIteration);
        }

        let mut buffer = std::mem::take(&mut state.scratch);
        fit_scratch(&mut buffer, state.items.len());
        buffer.extend_from_slice(&state.items);
        state.iterating = true;
        state.modified = false;

        Ok(Snapshot {
            list: self,
            buffer,
            finished: false,
        })
    }

    /// Ends the current iteration, rolling back if `discard` is set.
    fn end(&self, mut buffer: Vec<T>, discard: bool) -> EcsResult<()> {
        let mut state = self.state.lock();
        if !state.iterating {
            return Err(EcsError::NotIterating);
        }
        if discard && state.modified {
            // The frozen copy becomes the store; the old store becomes scratch.
            std::mem::swap(&mut state.items, &mut buffer);
        }
        buffer.clear();
        state.scratch = buffer;
        state.iterating = false;
        state.modified = false;
        Ok(())
    }
}

/// Sizes an empty scratch buffer for `needed` items.
fn fit_scratch<T>(buffer: &mut Vec<T>, needed: usize) {
    buffer.clear();
    let capacity = buffer.capacity();
    if capacity < needed {
        let mut target = capacity.max(MIN_SCRATCH);
        while target < needed {
            target *= 2;
        }
        buffer.reserve_exact(target);
    } else if capacity > MIN_SCRATCH && capacity > needed.saturating_mul(2) {
        buffer.shrink_to(needed.next_power_of_two().max(MIN_SCRATCH));
    }
}

impl<T> fmt::Debug for SnapshotList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SnapshotList")
            .field("len", &state.items.len())
            .field("iterating", &state.iterating)
            .field("modified", &state.modified)
            .finish_non_exhaustive()
    }
}

/// Frozen view of a [`SnapshotList`] for the duration of one iteration.
///
/// Derefs to the frozen items. Ends the iteration exactly once: through
/// [`Snapshot::commit`], [`Snapshot::discard`], or a commit on drop.
///
/// ## Usage
///
/// ```rust,ignore
/// let snapshot = list.begin()?;
/// for item in snapshot.iter() {
///     list.add(spawn_from(item)); // lands in the live store
/// }
/// snapshot.discard()?; // preview pass: undo the spawns
/// ```
#[must_use = "dropping a snapshot commits immediately"]
pub struct Snapshot<'a, T: Clone + PartialEq> {
    list: &'a SnapshotList<T>,
    buffer: Vec<T>,
    finished: bool,
}

impl<T: Clone + PartialEq> Snapshot<'_, T> {
    /// Ends the iteration, keeping every mutation made during it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NotIterating`] if the list is not iterating.
    pub fn commit(mut self) -> EcsResult<()> {
        self.finish(false)
    }

    /// Ends the iteration, restoring the live store to the frozen items if it
    /// was modified. Observers are not notified of the rollback.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NotIterating`] if the list is not iterating.
    pub fn discard(mut self) -> EcsResult<()> {
        self.finish(true)
    }

    fn finish(&mut self, discard: bool) -> EcsResult<()> {
        self.finished = true;
        let buffer = std::mem::take(&mut self.buffer);
        self.list.end(buffer, discard)
    }
}

impl<T: Clone + PartialEq> Deref for Snapshot<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.buffer
    }
}

impl<'s, T: Clone + PartialEq> IntoIterator for &'s Snapshot<'_, T> {
    type Item = &'s T;
    type IntoIter = std::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffer.iter()
    }
}

impl<T: Clone + PartialEq> Drop for Snapshot<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.finish(false) {
                tracing::error!(error = %err, "snapshot failed to commit on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn abc() -> SnapshotList<char> {
        SnapshotList::from_vec(vec!['A', 'B', 'C'])
    }

    #[test]
    fn test_discard_restores_frozen_items() {
        let list = abc();
        let snapshot = list.begin().unwrap();
        list.add('D');
        assert_eq!(list.to_vec(), vec!['A', 'B', 'C', 'D']);
        snapshot.discard().unwrap();

        assert_eq!(list.to_vec(), vec!['A', 'B', 'C']);
        assert!(!list.is_iterating());
    }

    #[test]
    fn test_commit_keeps_live_items() {
        let list = abc();
        let snapshot = list.begin().unwrap();
        list.add('D');
        snapshot.commit().unwrap();

        assert_eq!(list.to_vec(), vec!['A', 'B', 'C', 'D']);
    }

    #[test]
    fn test_snapshot_is_frozen_while_store_changes() {
        let list = abc();
        let snapshot = list.begin().unwrap();
        assert!(list.remove(&'A'));
        list.add('E');

        assert_eq!(&*snapshot, &['A', 'B', 'C']);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(list.get(0), Some('B'));
        snapshot.commit().unwrap();
    }

    #[test]
    fn test_discard_without_modification_is_noop() {
        let list = abc();
        let snapshot = list.begin().unwrap();
        snapshot.discard().unwrap();
        assert_eq!(list.to_vec(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn test_discard_undoes_removals_and_clear() {
        let list = abc();
        let snapshot = list.begin().unwrap();
        list.remove_at(1).unwrap();
        list.clear();
        snapshot.discard().unwrap();
        assert_eq!(list.to_vec(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn test_begin_is_not_reentrant() {
        let list = abc();
        let snapshot = list.begin().unwrap();
        assert!(matches!(list.begin(), Err(EcsError::ReentrantIteration)));
        snapshot.commit().unwrap();
        assert!(list.begin().is_ok());
    }

    #[test]
    fn test_drop_commits_once() {
        let list = abc();
        {
            let _snapshot = list.begin().unwrap();
            list.add('D');
            assert!(list.is_iterating());
        }
        assert!(!list.is_iterating());
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_early_return_ends_iteration() {
        fn walk(list: &SnapshotList<char>) -> EcsResult<()> {
            let snapshot = list.begin()?;
            for &c in &snapshot {
                if c == 'B' {
                    return Err(EcsError::InvalidEntity);
                }
            }
            snapshot.commit()
        }

        let list = abc();
        assert!(walk(&list).is_err());
        assert!(!list.is_iterating());
    }

    #[test]
    fn test_notifications_survive_discard() {
        let list = abc();
        let events = list.subscribe();

        let snapshot = list.begin().unwrap();
        list.add('D');
        list.remove(&'A');
        snapshot.discard().unwrap();

        let received: Vec<ListEvent<char>> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![ListEvent::Added('D'), ListEvent::Removed('A')]
        );
    }

    #[test]
    fn test_set_notifies_both_sides() {
        let list = abc();
        let events = list.subscribe();
        assert_eq!(list.set(1, 'X').unwrap(), 'B');

        let received: Vec<ListEvent<char>> = events.try_iter().collect();
        assert_eq!(received, vec![ListEvent::Removed('B'), ListEvent::Added('X')]);
        assert!(matches!(
            list.set(9, 'Y'),
            Err(EcsError::IndexOutOfBounds { index: 9, len: 3 })
        ));
    }

    #[test]
    fn test_insert_bounds() {
        let list = abc();
        list.insert(3, 'D').unwrap();
        list.insert(0, 'Z').unwrap();
        assert_eq!(list.to_vec(), vec!['Z', 'A', 'B', 'C', 'D']);
        assert!(list.insert(9, 'Q').is_err());
        assert!(list.remove_at(5).is_err());
        assert!(!list.remove(&'Q'));
    }

    #[test]
    fn test_scratch_grows_by_doubling_and_shrinks() {
        let list = SnapshotList::from_vec((0..40).collect::<Vec<u32>>());
        list.begin().unwrap().commit().unwrap();
        assert_eq!(list.scratch_capacity(), 64);

        for i in 0..36 {
            list.remove(&i);
        }
        list.begin().unwrap().commit().unwrap();
        assert_eq!(list.scratch_capacity(), 16);
    }

    #[test]
    fn test_shared_across_threads() {
        let list = Arc::new(abc());
        let writer = Arc::clone(&list);
        let snapshot = list.begin().unwrap();

        std::thread::spawn(move || writer.add('D')).join().unwrap();

        assert_eq!(snapshot.len(), 3);
        snapshot.commit().unwrap();
        assert_eq!(list.len(), 4);
    }
}
