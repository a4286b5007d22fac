#![forbid(unsafe_code)]

//! Bounded undo/redo store with middleware.
//!
//! [`HistoryStore`] wraps a [`Timeline`] and runs its middleware after every
//! committed transition. It is owned by exactly one caller (typically the
//! component that edits the value) and every operation completes before it
//! returns.
//!
//! # Example
//!
//! ```rust,ignore
//! use retrace_runtime::{HistoryOptions, HistoryStore};
//! use retrace_core::Capacity;
//!
//! let options = HistoryOptions::new()
//!     .capacity(Capacity::new(3)?)
//!     .observer(|value: &i32| println!("now {value}"));
//! let mut store = HistoryStore::with_options(0, options);
//!
//! store.set(1);
//! store.set(2);
//! store.undo();
//! assert_eq!(*store.current(), 1);
//! ```
//!
//! # Invariants
//!
//! 1. The history is never empty and the pointer indexes a retained entry.
//! 2. `history().len() <= capacity` when a capacity is configured.
//! 3. Middleware run exactly once per committed transition and never for
//!    a no-op.
//! 4. A failing middleware never rolls back or blocks the transition.
//!
//! # Failure Modes
//!
//! - **Middleware error or panic**: logged with the middleware name and
//!   transition kind, then skipped.
//! - **Runaway cascade**: middleware that keep requesting effects are cut
//!   off at `max_cascade_depth`; the dropped requests are logged.

use std::fmt;

use retrace_core::{Capacity, Step, Timeline};
use tracing::{debug, warn};

use crate::config::{ConfigError, StoreConfig};
use crate::middleware::{
    Action, Chain, DEFAULT_MAX_CASCADE_DEPTH, Effects, MAX_CASCADE_DEPTH, MiddlewareFn,
    MiddlewareResult, Transition,
};

/// Construction options for a [`HistoryStore`].
pub struct HistoryOptions<T> {
    capacity: Option<Capacity>,
    max_cascade_depth: u32,
    middleware: Chain<MiddlewareFn<T>>,
}

impl<T> Default for HistoryOptions<T> {
    fn default() -> Self {
        Self {
            capacity: None,
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            middleware: Chain::new(),
        }
    }
}

impl<T> fmt::Debug for HistoryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryOptions")
            .field("capacity", &self.capacity)
            .field("max_cascade_depth", &self.max_cascade_depth)
            .field("middleware", &self.middleware)
            .finish()
    }
}

impl<T> HistoryOptions<T> {
    /// Unbounded, no middleware, default cascade depth.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options seeded from a validated [`StoreConfig`].
    pub fn from_config(config: &StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            capacity: config.capacity_limit()?,
            max_cascade_depth: config.max_cascade_depth,
            middleware: Chain::new(),
        })
    }

    /// Bound the number of retained entries.
    #[must_use]
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Bound nested middleware-requested transitions, clamped to
    /// [`MAX_CASCADE_DEPTH`].
    #[must_use]
    pub fn max_cascade_depth(mut self, depth: u32) -> Self {
        self.max_cascade_depth = depth.min(MAX_CASCADE_DEPTH);
        self
    }

    /// Append a middleware named `middleware#<index>`.
    #[must_use]
    pub fn middleware(
        mut self,
        f: impl FnMut(&Transition<'_, T>, &mut Effects<T>) -> MiddlewareResult + 'static,
    ) -> Self {
        self.middleware.push(Box::new(f));
        self
    }

    /// Append a middleware under an explicit name used in failure logs.
    #[must_use]
    pub fn named_middleware(
        mut self,
        name: impl Into<String>,
        f: impl FnMut(&Transition<'_, T>, &mut Effects<T>) -> MiddlewareResult + 'static,
    ) -> Self {
        self.middleware.push_named(name, Box::new(f));
        self
    }

    /// Append a side-effect-only observer of the new current value.
    #[must_use]
    pub fn observer(mut self, mut f: impl FnMut(&T) + 'static) -> Self
    where
        T: 'static,
    {
        self.middleware
            .push(Box::new(move |transition: &Transition<'_, T>, _: &mut Effects<T>| {
                f(transition.current);
                Ok(())
            }));
        self
    }
}

/// Bounded, linear undo/redo history of a single value.
pub struct HistoryStore<T> {
    timeline: Timeline<T>,
    middleware: Chain<MiddlewareFn<T>>,
    max_cascade_depth: u32,
}

impl<T: fmt::Debug> fmt::Debug for HistoryStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStore")
            .field("timeline", &self.timeline)
            .field("middleware", &self.middleware)
            .field("max_cascade_depth", &self.max_cascade_depth)
            .finish()
    }
}

impl<T: PartialEq> HistoryStore<T> {
    /// Create an unbounded store without middleware.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::with_options(initial, HistoryOptions::default())
    }

    /// Create a store with explicit options.
    #[must_use]
    pub fn with_options(initial: T, options: HistoryOptions<T>) -> Self {
        Self {
            timeline: Timeline::with_capacity(initial, options.capacity),
            middleware: options.middleware,
            max_cascade_depth: options.max_cascade_depth,
        }
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Write a new current value. Returns `true` if the transition committed.
    ///
    /// Writing a value equal to the current one is a no-op and runs no
    /// middleware.
    pub fn set(&mut self, value: T) -> bool {
        self.apply(Action::Set(value))
    }

    /// Write a value derived from the current one.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(self.timeline.current());
        self.set(next)
    }

    /// Move back one entry. No-op at the oldest entry.
    pub fn undo(&mut self) -> bool {
        self.apply(Action::Undo)
    }

    /// Move forward one entry. No-op at the newest entry.
    pub fn redo(&mut self) -> bool {
        self.apply(Action::Redo)
    }

    /// Jump to `index`. No-op if out of range or already current.
    pub fn goto(&mut self, index: usize) -> bool {
        self.apply(Action::Goto(index))
    }

    /// Apply any [`Action`]. Returns `true` if the transition committed.
    pub fn apply(&mut self, action: Action<T>) -> bool {
        self.dispatch(action, 0)
    }

    fn dispatch(&mut self, action: Action<T>, cascade: u32) -> bool {
        let step = match action {
            Action::Set(value) => self.timeline.set(value),
            Action::Undo => self.timeline.undo(),
            Action::Redo => self.timeline.redo(),
            Action::Goto(index) => self.timeline.goto(index),
        };
        match step {
            Some(step) => {
                self.commit(step, cascade);
                true
            }
            None => false,
        }
    }

    fn commit(&mut self, step: Step, cascade: u32) {
        debug!(
            transition = step.kind.as_str(),
            from = step.from,
            to = step.to,
            evicted = step.evicted,
            len = self.timeline.depth(),
            cascade,
            "history transition committed"
        );
        if self.middleware.is_empty() {
            return;
        }

        let mut effects = Effects::new();
        let transition = Transition {
            kind: step.kind,
            current: self.timeline.current(),
            pointer: step.to,
            previous_pointer: step.from,
            len: self.timeline.depth(),
            evicted: step.evicted,
            cascade,
        };
        let report = self
            .middleware
            .run(step.kind, |middleware| middleware(&transition, &mut effects));
        if report.failed > 0 {
            debug!(
                transition = step.kind.as_str(),
                succeeded = report.succeeded,
                failed = report.failed,
                "middleware round finished with failures"
            );
        }

        self.apply_effects(effects, cascade);
    }

    fn apply_effects(&mut self, effects: Effects<T>, cascade: u32) {
        if effects.is_empty() {
            return;
        }
        if cascade >= self.max_cascade_depth {
            warn!(
                dropped = effects.len() as u64,
                cascade,
                max_cascade_depth = self.max_cascade_depth,
                "middleware effects dropped: cascade depth exceeded"
            );
            return;
        }
        for action in effects.into_actions() {
            self.dispatch(action, cascade + 1);
        }
    }
}

impl<T> HistoryStore<T> {
    // ====================================================================
    // Query
    // ====================================================================

    /// The value at the pointer.
    #[must_use]
    pub fn current(&self) -> &T {
        self.timeline.current()
    }

    /// Every retained value, oldest first.
    #[must_use]
    pub fn history(&self) -> &[T] {
        self.timeline.history()
    }

    /// Index of the current value in [`history`](Self::history).
    #[must_use]
    pub fn pointer(&self) -> usize {
        self.timeline.pointer()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.timeline.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.timeline.can_redo()
    }

    /// Configured capacity, if bounded.
    #[must_use]
    pub fn capacity(&self) -> Option<Capacity> {
        self.timeline.capacity()
    }

    #[must_use]
    pub fn max_cascade_depth(&self) -> u32 {
        self.max_cascade_depth
    }

    /// Number of registered middleware.
    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Borrow the underlying timeline.
    #[must_use]
    pub fn timeline(&self) -> &Timeline<T> {
        &self.timeline
    }

    /// Consume the store, returning the retained values.
    #[must_use]
    pub fn into_history(self) -> Vec<T> {
        self.timeline.into_history()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareError;
    use retrace_core::StepKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl FnMut(&T) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |value: &T| sink.borrow_mut().push(value.clone()))
    }

    #[test]
    fn new_store_has_single_entry() {
        let store = HistoryStore::new("initial");
        assert_eq!(store.history(), &["initial"]);
        assert_eq!(store.pointer(), 0);
        assert_eq!(*store.current(), "initial");
        assert!(!store.can_undo());
        assert!(!store.can_redo());
        assert_eq!(store.middleware_count(), 0);
        assert_eq!(store.max_cascade_depth(), DEFAULT_MAX_CASCADE_DEPTH);
    }

    #[test]
    fn observers_see_every_committed_transition() {
        let (seen, observer) = recorder::<i32>();
        let mut store = HistoryStore::with_options(0, HistoryOptions::new().observer(observer));

        assert!(store.set(1));
        assert!(store.set(2));
        assert!(store.undo());
        assert!(store.redo());
        assert!(store.goto(0));
        assert_eq!(*seen.borrow(), vec![1, 2, 1, 2, 0]);
    }

    #[test]
    fn no_ops_do_not_notify() {
        let (seen, observer) = recorder::<i32>();
        let mut store = HistoryStore::with_options(0, HistoryOptions::new().observer(observer));

        assert!(!store.set(0));
        assert!(!store.undo());
        assert!(!store.redo());
        assert!(!store.goto(0));
        assert!(!store.goto(5));
        assert!(!store.update(|v| *v));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn update_applies_function_to_current() {
        let mut store = HistoryStore::new(2);
        assert!(store.update(|v| v * 10));
        assert_eq!(store.history(), &[2, 20]);
    }

    #[test]
    fn middleware_receive_transition_metadata() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let options = HistoryOptions::new()
            .capacity(Capacity::new(2).unwrap())
            .middleware(move |t: &Transition<'_, i32>, _: &mut Effects<i32>| {
                sink.borrow_mut()
                    .push((t.kind, *t.current, t.previous_pointer, t.pointer, t.len, t.evicted));
                Ok(())
            });
        let mut store = HistoryStore::with_options(0, options);
        store.set(1);
        store.set(2);
        store.undo();

        assert_eq!(
            *seen.borrow(),
            vec![
                (StepKind::Set, 1, 0, 1, 2, 0),
                (StepKind::Set, 2, 1, 1, 2, 1),
                (StepKind::Undo, 1, 1, 0, 2, 0),
            ]
        );
    }

    #[test]
    fn failing_middleware_does_not_block_others() {
        let (seen, observer) = recorder::<i32>();
        let options = HistoryOptions::new()
            .named_middleware("rejecting", |_: &Transition<'_, i32>, _: &mut Effects<i32>| {
                Err(MiddlewareError::new("nope"))
            })
            .observer(observer);
        let mut store = HistoryStore::with_options(0, options);

        assert!(store.set(7));
        assert_eq!(*store.current(), 7);
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn effects_apply_after_the_round() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        let options = HistoryOptions::new()
            .middleware(move |t: &Transition<'_, i32>, effects: &mut Effects<i32>| {
                first.borrow_mut().push(format!("a:{}", t.current));
                // Clamp negative writes back to zero.
                if *t.current < 0 {
                    effects.set(0);
                }
                Ok(())
            })
            .middleware(move |t: &Transition<'_, i32>, _: &mut Effects<i32>| {
                second.borrow_mut().push(format!("b:{}", t.current));
                Ok(())
            });
        let mut store = HistoryStore::with_options(5, options);

        assert!(store.set(-3));
        assert_eq!(*store.current(), 0);
        assert_eq!(store.history(), &[5, -3, 0]);
        assert_eq!(*order.borrow(), vec!["a:-3", "b:-3", "a:0", "b:0"]);
    }

    #[test]
    fn cascade_depth_bounds_runaway_effects() {
        let calls = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&calls);
        let options = HistoryOptions::new().max_cascade_depth(3).middleware(
            move |t: &Transition<'_, u32>, effects: &mut Effects<u32>| {
                *counter.borrow_mut() += 1;
                effects.set(t.current + 1);
                Ok(())
            },
        );
        let mut store = HistoryStore::with_options(0, options);

        assert!(store.set(1));
        // Caller transition plus three nested follow-ups.
        assert_eq!(*calls.borrow(), 4);
        assert_eq!(store.history(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_cascade_depth_disables_effects() {
        let options = HistoryOptions::new().max_cascade_depth(0).middleware(
            |_: &Transition<'_, i32>, effects: &mut Effects<i32>| {
                effects.undo();
                Ok(())
            },
        );
        let mut store = HistoryStore::with_options(0, options);
        store.set(1);
        assert_eq!(*store.current(), 1);
        assert!(store.can_undo());
    }

    #[test]
    fn from_config_carries_capacity_and_depth() {
        let config = StoreConfig {
            capacity: Some(2),
            max_cascade_depth: 1,
        };
        let options = HistoryOptions::<i32>::from_config(&config).unwrap();
        let mut store = HistoryStore::with_options(0, options);
        store.set(1);
        store.set(2);
        assert_eq!(store.history(), &[1, 2]);
        assert_eq!(store.capacity().map(Capacity::get), Some(2));
        assert_eq!(store.max_cascade_depth(), 1);
    }

    #[test]
    fn oversized_cascade_depth_is_clamped() {
        let calls = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&calls);
        let options = HistoryOptions::new().max_cascade_depth(u32::MAX).middleware(
            move |t: &Transition<'_, u32>, effects: &mut Effects<u32>| {
                *counter.borrow_mut() += 1;
                effects.set(t.current + 1);
                Ok(())
            },
        );
        let mut store = HistoryStore::with_options(0, options);
        assert_eq!(store.max_cascade_depth(), MAX_CASCADE_DEPTH);

        assert!(store.set(1));
        assert_eq!(*calls.borrow(), MAX_CASCADE_DEPTH + 1);
        assert_eq!(store.history().len(), MAX_CASCADE_DEPTH as usize + 2);
    }

    #[test]
    fn from_config_rejects_zero_capacity() {
        let err = HistoryOptions::<i32>::from_config(&StoreConfig::bounded(0)).unwrap_err();
        assert!(matches!(err, ConfigError::Capacity(_)));
    }

    #[test]
    fn apply_dispatches_actions() {
        let mut store = HistoryStore::new('x');
        assert!(store.apply(Action::Set('y')));
        assert!(store.apply(Action::Undo));
        assert!(store.apply(Action::Redo));
        assert!(store.apply(Action::Goto(0)));
        assert_eq!(*store.current(), 'x');
        assert_eq!(store.into_history(), vec!['x', 'y']);
    }
}
