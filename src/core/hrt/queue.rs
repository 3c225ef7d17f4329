//! Deadline-ordered callout queue
//!
//! Holds the indices of queued slots in ascending deadline order. Insert,
//! remove and peek are all O(queue length) and must run with the critical
//! section held — the queue is shared between task-context schedule/cancel
//! calls and interrupt-context dispatch.

use heapless::Vec;

use super::callout::{CalloutSlot, MAX_CALLOUTS};

/// Pending callouts, earliest deadline first
///
/// Ties break by insertion order: of two callouts with equal deadlines the
/// one scheduled first fires first, keeping dispatch deterministic.
#[derive(Debug)]
pub(crate) struct CalloutQueue {
    order: Vec<u8, MAX_CALLOUTS>,
}

impl CalloutQueue {
    pub const fn new() -> Self {
        Self { order: Vec::new() }
    }

    /// Insert a slot index in deadline order
    ///
    /// Returns true if the new entry became the queue head, i.e. the caller
    /// changed the next deadline and must reprogram the compare unit.
    pub fn insert(&mut self, index: u8, slots: &[CalloutSlot; MAX_CALLOUTS]) -> bool {
        debug_assert!(!self.contains(index));

        let deadline = slots[usize::from(index)].deadline;
        let position = self
            .order
            .iter()
            .position(|&queued| slots[usize::from(queued)].deadline > deadline)
            .unwrap_or(self.order.len());

        // Capacity equals the slot pool and entries are unique, so the
        // insert cannot overflow.
        let _ = self.order.insert(position, index);

        position == 0
    }

    /// Remove a slot index from the queue
    ///
    /// Idempotent: removing an index that is not queued is a no-op.
    pub fn remove(&mut self, index: u8) {
        if let Some(position) = self.order.iter().position(|&queued| queued == index) {
            self.order.remove(position);
        }
    }

    /// Earliest-deadline entry without removing it
    pub fn peek(&self) -> Option<u8> {
        self.order.first().copied()
    }

    /// Remove and return the earliest-deadline entry
    pub fn pop(&mut self) -> Option<u8> {
        if self.order.is_empty() {
            None
        } else {
            Some(self.order.remove(0))
        }
    }

    pub fn contains(&self, index: u8) -> bool {
        self.order.iter().any(|&queued| queued == index)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots_with_deadlines(deadlines: &[u64]) -> [CalloutSlot; MAX_CALLOUTS] {
        let mut slots = [CalloutSlot::idle(); MAX_CALLOUTS];
        for (slot, &deadline) in slots.iter_mut().zip(deadlines) {
            slot.deadline = deadline;
            slot.in_use = true;
        }
        slots
    }

    #[test]
    fn test_insert_orders_by_deadline() {
        let slots = slots_with_deadlines(&[1000, 500, 200]);
        let mut queue = CalloutQueue::new();

        assert!(queue.insert(0, &slots)); // 1000, becomes head
        assert!(queue.insert(1, &slots)); // 500, new head
        assert!(queue.insert(2, &slots)); // 200, new head

        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(0));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_insert_behind_head_does_not_report_head_change() {
        let slots = slots_with_deadlines(&[100, 900]);
        let mut queue = CalloutQueue::new();

        assert!(queue.insert(0, &slots));
        assert!(!queue.insert(1, &slots));
        assert_eq!(queue.peek(), Some(0));
    }

    #[test]
    fn test_equal_deadlines_fire_in_insertion_order() {
        let slots = slots_with_deadlines(&[700, 700, 700]);
        let mut queue = CalloutQueue::new();

        queue.insert(1, &slots);
        queue.insert(0, &slots);
        queue.insert(2, &slots);

        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(0));
        assert_eq!(queue.pop(), Some(2));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let slots = slots_with_deadlines(&[100, 200]);
        let mut queue = CalloutQueue::new();

        queue.insert(0, &slots);
        queue.insert(1, &slots);

        queue.remove(0);
        assert_eq!(queue.len(), 1);

        // Second removal of the same index is a no-op
        queue.remove(0);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek(), Some(1));

        // Removing an index that was never queued is also a no-op
        queue.remove(7);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let slots = slots_with_deadlines(&[42]);
        let mut queue = CalloutQueue::new();
        queue.insert(0, &slots);

        assert_eq!(queue.peek(), Some(0));
        assert_eq!(queue.peek(), Some(0));
        assert!(!queue.is_empty());
    }
}
