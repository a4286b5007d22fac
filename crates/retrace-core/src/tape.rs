#![forbid(unsafe_code)]

//! Past/present/future history.
//!
//! A [`Tape`] is the three-part alternative to [`Timeline`](crate::Timeline):
//! instead of a pointer into one buffer, values move between a past stack and
//! a future queue around the present.
//!
//! ```text
//! set(c)   past: [a, b]     present: c   future: []
//! undo()   past: [a]        present: b   future: [c]
//! undo()   past: []         present: a   future: [b, c]
//! set(d)   past: [a]        present: d   future: []
//! ```
//!
//! The optional capacity bounds the *past* only, so the present and any
//! undone values are never evicted. Reported [`Step`]s use `past.len()` as the
//! pointer, which lines up with the position `present` would occupy in a
//! flattened history.

use std::collections::VecDeque;

use crate::capacity::Capacity;
use crate::step::{Step, StepKind};

/// Past/present/future history of a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape<T> {
    past: VecDeque<T>,
    present: T,
    future: VecDeque<T>,
    capacity: Option<Capacity>,
}

impl<T> Tape<T> {
    /// Create an unbounded tape at `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::with_capacity(initial, None)
    }

    /// Create a tape at `initial` whose past holds at most `capacity` values.
    #[must_use]
    pub fn with_capacity(initial: T, capacity: Option<Capacity>) -> Self {
        Self {
            past: VecDeque::new(),
            present: initial,
            future: VecDeque::new(),
            capacity,
        }
    }

    /// The current value.
    #[must_use]
    pub fn present(&self) -> &T {
        &self.present
    }

    /// Older values, oldest first.
    #[must_use]
    pub fn past(&self) -> &VecDeque<T> {
        &self.past
    }

    /// Undone values, next redo first.
    #[must_use]
    pub fn future(&self) -> &VecDeque<T> {
        &self.future
    }

    /// Configured past capacity, if bounded.
    #[must_use]
    pub fn capacity(&self) -> Option<Capacity> {
        self.capacity
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Write a new present, pushing the old one onto the past and clearing
    /// the future. `None` if `value` equals the present.
    pub fn set(&mut self, value: T) -> Option<Step>
    where
        T: PartialEq,
    {
        if self.present == value {
            return None;
        }
        let from = self.past.len();
        let previous = std::mem::replace(&mut self.present, value);
        self.past.push_back(previous);
        self.future.clear();
        let evicted = self.enforce_capacity();
        Some(Step {
            kind: StepKind::Set,
            from,
            to: self.past.len(),
            evicted,
        })
    }

    /// Step back: the present joins the front of the future.
    pub fn undo(&mut self) -> Option<Step> {
        let previous = self.past.pop_back()?;
        let from = self.past.len() + 1;
        let undone = std::mem::replace(&mut self.present, previous);
        self.future.push_front(undone);
        Some(Step::moved(StepKind::Undo, from, self.past.len()))
    }

    /// Step forward: the present joins the back of the past.
    pub fn redo(&mut self) -> Option<Step> {
        let next = self.future.pop_front()?;
        let from = self.past.len();
        let redone = std::mem::replace(&mut self.present, next);
        self.past.push_back(redone);
        Some(Step::moved(StepKind::Redo, from, self.past.len()))
    }

    /// Drop all history and start over at `value`. The capacity is kept.
    pub fn reset(&mut self, value: T) {
        self.past.clear();
        self.future.clear();
        self.present = value;
    }

    fn enforce_capacity(&mut self) -> usize {
        let Some(capacity) = self.capacity else {
            return 0;
        };
        let excess = capacity.excess(self.past.len());
        self.past.drain(..excess);
        excess
    }
}
