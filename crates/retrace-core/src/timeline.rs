#![forbid(unsafe_code)]

//! Pointer-over-array history with optional capacity.
//!
//! A [`Timeline`] keeps every retained value in one ordered buffer, oldest
//! first, and a pointer to the current value. Undo and redo only move the
//! pointer; writing a new value discards everything after the pointer.
//!
//! ```text
//! set(a) set(b) set(c)          undo()                set(d)
//! ┌───┬───┬───┬───┐             ┌───┬───┬───┬───┐     ┌───┬───┬───┬───┐
//! │ 0 │ a │ b │ c │             │ 0 │ a │ b │ c │     │ 0 │ a │ b │ d │
//! └───┴───┴───┴─▲─┘             └───┴───┴─▲─┴───┘     └───┴───┴───┴─▲─┘
//!            pointer                   pointer                   pointer
//! ```
//!
//! # Invariants
//!
//! 1. The buffer is never empty.
//! 2. `pointer < depth()` after every operation.
//! 3. `depth() <= capacity` after every operation when a capacity is set.
//! 4. A committed `set` leaves the pointer on the last entry (nothing to redo).
//!
//! # Capacity
//!
//! When a write pushes the buffer past its capacity the oldest entries are
//! drained from the front and the pointer is shifted left by the number of
//! entries dropped (saturating at 0). Eviction is O(n) in the retained depth,
//! which keeps the history addressable as a contiguous slice.

use crate::capacity::Capacity;
use crate::step::{Step, StepKind};

/// Linear, bounded history of a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline<T> {
    entries: Vec<T>,
    pointer: usize,
    capacity: Option<Capacity>,
}

impl<T> Timeline<T> {
    /// Create an unbounded timeline holding only `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::with_capacity(initial, None)
    }

    /// Create a timeline holding only `initial`, bounded by `capacity`.
    #[must_use]
    pub fn with_capacity(initial: T, capacity: Option<Capacity>) -> Self {
        Self {
            entries: vec![initial],
            pointer: 0,
            capacity,
        }
    }

    // ====================================================================
    // Query
    // ====================================================================

    /// The value at the pointer.
    #[must_use]
    pub fn current(&self) -> &T {
        &self.entries[self.pointer]
    }

    /// Every retained value, oldest first.
    #[must_use]
    pub fn history(&self) -> &[T] {
        &self.entries
    }

    /// Index of the current value in [`history`](Self::history).
    #[must_use]
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Number of retained values (always at least 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Configured capacity, if bounded.
    #[must_use]
    pub fn capacity(&self) -> Option<Capacity> {
        self.capacity
    }

    /// Value at `index`, if retained.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Check if there is an older value to move back to.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    /// Check if there is a newer value to move forward to.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.entries.len()
    }

    /// Consume the timeline, returning the retained values.
    #[must_use]
    pub fn into_history(self) -> Vec<T> {
        self.entries
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Write a new current value.
    ///
    /// Returns `None` without touching anything if `value` equals the
    /// current value. Otherwise discards the redo tail, appends, enforces the
    /// capacity, and reports the step.
    pub fn set(&mut self, value: T) -> Option<Step>
    where
        T: PartialEq,
    {
        if *self.current() == value {
            return None;
        }
        let from = self.pointer;
        self.entries.truncate(from + 1);
        self.entries.push(value);
        self.pointer = self.entries.len() - 1;
        let evicted = self.enforce_capacity();
        Some(Step {
            kind: StepKind::Set,
            from,
            to: self.pointer,
            evicted,
        })
    }

    /// Write a value derived from the current one.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) -> Option<Step>
    where
        T: PartialEq,
    {
        let next = f(self.current());
        self.set(next)
    }

    /// Move the pointer one entry back. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<Step> {
        if !self.can_undo() {
            return None;
        }
        let from = self.pointer;
        self.pointer -= 1;
        Some(Step::moved(StepKind::Undo, from, self.pointer))
    }

    /// Move the pointer one entry forward. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<Step> {
        if !self.can_redo() {
            return None;
        }
        let from = self.pointer;
        self.pointer += 1;
        Some(Step::moved(StepKind::Redo, from, self.pointer))
    }

    /// Jump to `index`. `None` if out of range or already there.
    pub fn goto(&mut self, index: usize) -> Option<Step> {
        if index >= self.entries.len() || index == self.pointer {
            return None;
        }
        let from = self.pointer;
        self.pointer = index;
        Some(Step::moved(StepKind::Goto, from, index))
    }

    // ====================================================================
    // Maintenance
    // ====================================================================

    /// Drain the oldest entries beyond the capacity, returning how many went.
    fn enforce_capacity(&mut self) -> usize {
        let Some(capacity) = self.capacity else {
            return 0;
        };
        let excess = capacity.excess(self.entries.len());
        if excess > 0 {
            self.entries.drain(..excess);
            self.pointer = self.pointer.saturating_sub(excess);
        }
        excess
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(initial: i32, limit: usize) -> Timeline<i32> {
        Timeline::with_capacity(initial, Some(Capacity::new(limit).unwrap()))
    }

    #[test]
    fn new_timeline_holds_initial_value() {
        let timeline = Timeline::new("draft");
        assert_eq!(timeline.history(), &["draft"]);
        assert_eq!(timeline.pointer(), 0);
        assert_eq!(*timeline.current(), "draft");
        assert!(!timeline.can_undo());
        assert!(!timeline.can_redo());
        assert!(timeline.capacity().is_none());
    }

    #[test]
    fn set_appends_and_advances() {
        let mut timeline = Timeline::new(0);
        let step = timeline.set(1).unwrap();
        assert_eq!(step.kind, StepKind::Set);
        assert_eq!((step.from, step.to, step.evicted), (0, 1, 0));
        assert_eq!(timeline.history(), &[0, 1]);
        assert!(timeline.can_undo());
        assert!(!timeline.can_redo());
    }

    #[test]
    fn identical_set_is_a_no_op() {
        let mut timeline = Timeline::new(5);
        assert!(timeline.set(5).is_none());
        assert_eq!(timeline.history(), &[5]);

        timeline.set(6);
        timeline.undo();
        // Equal to the value at the pointer, not the last entry.
        assert!(timeline.set(5).is_none());
        assert_eq!(timeline.history(), &[5, 6]);
        assert!(timeline.can_redo());
    }

    #[test]
    fn update_derives_from_current() {
        let mut timeline = Timeline::new(10);
        timeline.update(|v| v + 5);
        assert_eq!(*timeline.current(), 15);
        assert!(timeline.update(|v| *v).is_none());
    }

    #[test]
    fn undo_and_redo_move_the_pointer() {
        let mut timeline = Timeline::new('a');
        timeline.set('b');
        timeline.set('c');

        let step = timeline.undo().unwrap();
        assert_eq!((step.kind, step.from, step.to), (StepKind::Undo, 2, 1));
        assert_eq!(*timeline.current(), 'b');

        let step = timeline.redo().unwrap();
        assert_eq!((step.kind, step.from, step.to), (StepKind::Redo, 1, 2));
        assert_eq!(*timeline.current(), 'c');
    }

    #[test]
    fn undo_at_oldest_is_a_no_op() {
        let mut timeline = Timeline::new(1);
        assert!(timeline.undo().is_none());
        assert_eq!(timeline.pointer(), 0);
    }

    #[test]
    fn redo_at_newest_is_a_no_op() {
        let mut timeline = Timeline::new(1);
        timeline.set(2);
        assert!(timeline.redo().is_none());
        assert_eq!(timeline.pointer(), 1);
    }

    #[test]
    fn set_after_undo_discards_redo_tail() {
        let mut timeline = Timeline::new(0);
        timeline.set(1);
        timeline.set(2);
        timeline.set(3);
        timeline.undo();
        timeline.undo();

        let step = timeline.set(7).unwrap();
        assert_eq!((step.from, step.to), (1, 2));
        assert_eq!(timeline.history(), &[0, 1, 7]);
        assert!(!timeline.can_redo());
    }

    #[test]
    fn goto_jumps_within_range() {
        let mut timeline = Timeline::new(0);
        for v in 1..=4 {
            timeline.set(v);
        }
        let step = timeline.goto(1).unwrap();
        assert_eq!((step.kind, step.from, step.to), (StepKind::Goto, 4, 1));
        assert_eq!(*timeline.current(), 1);
        assert!(timeline.can_undo());
        assert!(timeline.can_redo());
    }

    #[test]
    fn goto_out_of_range_or_same_index_is_a_no_op() {
        let mut timeline = Timeline::new(0);
        timeline.set(1);
        assert!(timeline.goto(2).is_none());
        assert!(timeline.goto(usize::MAX).is_none());
        assert!(timeline.goto(1).is_none());
        assert_eq!(timeline.pointer(), 1);
    }

    #[test]
    fn capacity_drops_oldest_entries() {
        let mut timeline = bounded(0, 3);
        timeline.set(1);
        timeline.set(2);
        let step = timeline.set(3).unwrap();
        assert_eq!(step.evicted, 1);
        assert_eq!(timeline.history(), &[1, 2, 3]);
        assert_eq!(timeline.pointer(), 2);
    }

    #[test]
    fn capacity_of_one_keeps_only_current() {
        let mut timeline = bounded(0, 1);
        timeline.set(1);
        timeline.set(2);
        assert_eq!(timeline.history(), &[2]);
        assert_eq!(timeline.pointer(), 0);
        assert!(!timeline.can_undo());
    }

    #[test]
    fn truncation_happens_before_capacity_check() {
        let mut timeline = bounded(0, 3);
        for v in 1..=3 {
            timeline.set(v);
        }
        timeline.undo();
        let step = timeline.set(9).unwrap();
        // [1, 2] + [9] fits, nothing evicted.
        assert_eq!(step.evicted, 0);
        assert_eq!(timeline.history(), &[1, 2, 9]);
        assert_eq!(timeline.pointer(), 2);
        assert_eq!(*timeline.current(), 9);
    }

    #[test]
    fn get_and_into_history() {
        let mut timeline = Timeline::new(String::from("a"));
        timeline.set(String::from("b"));
        assert_eq!(timeline.get(0).map(String::as_str), Some("a"));
        assert!(timeline.get(2).is_none());
        assert_eq!(timeline.into_history(), vec!["a", "b"]);
    }
}
