//! Double-buffered state storage
//!
//! Client requests mutate the `pending` copy of a state. A commit snapshots
//! the pending copy into a *generation* queued behind the `current` copy;
//! how many generations pile up depends on the synchronization of the
//! surface: desynchronized surfaces drain the queue immediately, while a
//! synchronized sub-surface keeps queueing until an ancestor commit drains
//! it, oldest first, as one atomic batch.

use std::collections::VecDeque;

/// Trait representing a value that can be used in double-buffered storage
///
/// [`Cacheable::commit`] produces the next generation from the pending
/// state; [`Cacheable::merge_into`] folds a generation into the current
/// state. In simple cases the latter is plain replacement, but state with
/// accumulating semantics (damage, callbacks, attach deltas) needs to fold
/// rather than overwrite, so that draining several queued generations at
/// once is equivalent to having applied each in turn.
pub trait Cacheable: Default {
    /// Produce a new generation to be cached from the pending state
    fn commit(&mut self) -> Self;
    /// Merge a generation into the current state
    fn merge_into(self, into: &mut Self);
}

/// Double-buffered storage for one state type
#[derive(Debug)]
pub struct CachedState<T: Cacheable> {
    /// State being mutated by client requests
    pub pending: T,
    cache: VecDeque<T>,
    /// State the compositor acts upon
    pub current: T,
}

impl<T: Cacheable> Default for CachedState<T> {
    fn default() -> Self {
        CachedState {
            pending: T::default(),
            cache: VecDeque::new(),
            current: T::default(),
        }
    }
}

impl<T: Cacheable> CachedState<T> {
    /// Snapshot the pending state as a new queued generation
    pub fn enqueue(&mut self) {
        let generation = self.pending.commit();
        self.cache.push_back(generation);
    }

    /// Fold all queued generations into the current state, oldest first
    ///
    /// Returns the number of generations applied.
    pub fn apply_queued(&mut self) -> usize {
        let applied = self.cache.len();
        for generation in self.cache.drain(..) {
            generation.merge_into(&mut self.current);
        }
        applied
    }

    /// Whether any generation is waiting to be applied
    pub fn has_queued(&self) -> bool {
        !self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        value: u32,
        history: Vec<u32>,
    }

    impl Cacheable for Log {
        fn commit(&mut self) -> Self {
            Log {
                value: self.value,
                history: Vec::new(),
            }
        }

        fn merge_into(self, into: &mut Self) {
            into.value = self.value;
            into.history.push(self.value);
        }
    }

    #[test]
    fn generations_apply_in_commit_order() {
        let mut state = CachedState::<Log>::default();
        state.pending.value = 1;
        state.enqueue();
        state.pending.value = 2;
        state.enqueue();
        assert!(state.has_queued());

        assert_eq!(state.apply_queued(), 2);
        assert_eq!(state.current.value, 2);
        assert_eq!(state.current.history, vec![1, 2]);
        assert!(!state.has_queued());
    }
}
