// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::Arc;

use parking_lot::Mutex;

/// The fixed pool of concurrent playback slots. The lock guards only the
/// O(1) acquire and release operations, never a playback.
pub struct SlotPool {
    /// true = occupied. Linear scans are fine at this size.
    slots: Mutex<Vec<bool>>,
}

/// An occupied slot. Dropping it frees the slot, so a worker returns its
/// slot on every exit path without any bookkeeping of its own.
pub struct Slot {
    pool: Arc<SlotPool>,
    index: usize,
}

impl SlotPool {
    /// Creates a pool with the given capacity, all slots free.
    pub fn new(capacity: usize) -> Arc<SlotPool> {
        Arc::new(SlotPool {
            slots: Mutex::new(vec![false; capacity]),
        })
    }

    /// Claims the first free slot, or None when the pool is exhausted. Never
    /// blocks beyond the scan itself.
    pub fn acquire(pool: &Arc<SlotPool>) -> Option<Slot> {
        let mut slots = pool.slots.lock();
        let index = slots.iter().position(|occupied| !occupied)?;
        slots[index] = true;
        Some(Slot {
            pool: pool.clone(),
            index,
        })
    }

    /// The number of occupied slots.
    pub fn active(&self) -> usize {
        self.slots.lock().iter().filter(|occupied| **occupied).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }

    /// Forcibly marks every slot free. Shutdown reclaim for workers that
    /// outlive the grace period; their guards release again harmlessly.
    pub fn clear(&self) {
        self.slots.lock().fill(false);
    }

    fn release(&self, index: usize) {
        self.slots.lock()[index] = false;
    }
}

impl Slot {
    /// The slot's position in the pool, used to name worker threads.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.pool.release(self.index);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_capacity_is_never_exceeded() {
        let pool = SlotPool::new(3);

        let slots: Vec<Slot> = (0..3)
            .map(|_| SlotPool::acquire(&pool).expect("expected a slot"))
            .collect();
        assert_eq!(pool.active(), 3);

        // The pool is full: further acquires fail without blocking.
        assert!(SlotPool::acquire(&pool).is_none());
        assert!(SlotPool::acquire(&pool).is_none());
        assert_eq!(pool.active(), 3);
        drop(slots);
    }

    #[test]
    fn test_release_on_drop() {
        let pool = SlotPool::new(2);

        let first = SlotPool::acquire(&pool).expect("expected a slot");
        let second = SlotPool::acquire(&pool).expect("expected a slot");
        assert_eq!((first.index(), second.index()), (0, 1));

        drop(first);
        assert_eq!(pool.active(), 1);

        // The freed slot is reused.
        let third = SlotPool::acquire(&pool).expect("expected a slot");
        assert_eq!(third.index(), 0);
        drop(second);
        drop(third);
        assert_eq!(pool.active(), 0);
    }

    #[test]
    fn test_clear_reclaims_everything() {
        let pool = SlotPool::new(4);
        let slots: Vec<Slot> = (0..4)
            .map(|_| SlotPool::acquire(&pool).expect("expected a slot"))
            .collect();

        pool.clear();
        assert_eq!(pool.active(), 0);
        assert!(SlotPool::acquire(&pool).is_some());

        // Late guard drops on reclaimed slots are harmless.
        drop(slots);
    }
}
