#![forbid(unsafe_code)]

//! Past/present/future navigator with reset.
//!
//! [`StateNavigator`] is the three-stack counterpart of
//! [`HistoryStore`](crate::HistoryStore). It has no random access (`goto`),
//! but can be [`reset`](StateNavigator::reset) to a fresh value, and its
//! middleware see both the previous and the next present.

use std::collections::VecDeque;
use std::fmt;

use retrace_core::{Capacity, Step, StepKind, Tape};
use tracing::debug;

use crate::middleware::{Chain, MiddlewareResult};

/// Boxed navigator middleware, called with `(previous, next)`.
pub type NavigatorMiddlewareFn<T> = Box<dyn FnMut(&T, &T) -> MiddlewareResult>;

/// Construction options for a [`StateNavigator`].
pub struct NavigatorOptions<T> {
    capacity: Option<Capacity>,
    middleware: Chain<NavigatorMiddlewareFn<T>>,
}

impl<T> Default for NavigatorOptions<T> {
    fn default() -> Self {
        Self {
            capacity: None,
            middleware: Chain::new(),
        }
    }
}

impl<T> fmt::Debug for NavigatorOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigatorOptions")
            .field("capacity", &self.capacity)
            .field("middleware", &self.middleware)
            .finish()
    }
}

impl<T> NavigatorOptions<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of past values kept for undo.
    #[must_use]
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Append a `(previous, next)` middleware named `middleware#<index>`.
    #[must_use]
    pub fn middleware(mut self, f: impl FnMut(&T, &T) -> MiddlewareResult + 'static) -> Self {
        self.middleware.push(Box::new(f));
        self
    }

    /// Append a `(previous, next)` middleware under an explicit name.
    #[must_use]
    pub fn named_middleware(
        mut self,
        name: impl Into<String>,
        f: impl FnMut(&T, &T) -> MiddlewareResult + 'static,
    ) -> Self {
        self.middleware.push_named(name, Box::new(f));
        self
    }
}

/// Undo/redo over a past stack, a present value, and a future queue.
pub struct StateNavigator<T> {
    tape: Tape<T>,
    middleware: Chain<NavigatorMiddlewareFn<T>>,
}

impl<T: fmt::Debug> fmt::Debug for StateNavigator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNavigator")
            .field("tape", &self.tape)
            .field("middleware", &self.middleware)
            .finish()
    }
}

impl<T: PartialEq> StateNavigator<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::with_options(initial, NavigatorOptions::default())
    }

    #[must_use]
    pub fn with_options(initial: T, options: NavigatorOptions<T>) -> Self {
        Self {
            tape: Tape::with_capacity(initial, options.capacity),
            middleware: options.middleware,
        }
    }

    /// Write a new present. No-op (and no middleware) if equal to the present.
    pub fn set(&mut self, value: T) -> bool {
        let step = self.tape.set(value);
        self.commit(step)
    }

    /// Write a value derived from the present.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(self.tape.present());
        self.set(next)
    }

    pub fn undo(&mut self) -> bool {
        let step = self.tape.undo();
        self.commit(step)
    }

    pub fn redo(&mut self) -> bool {
        let step = self.tape.redo();
        self.commit(step)
    }

    /// Discard past and future and start over at `value`.
    ///
    /// Middleware are not notified.
    pub fn reset(&mut self, value: T) {
        self.tape.reset(value);
        debug!("navigator reset");
    }

    fn commit(&mut self, step: Option<Step>) -> bool {
        let Some(step) = step else {
            return false;
        };
        debug!(
            transition = step.kind.as_str(),
            past = self.tape.past().len(),
            future = self.tape.future().len(),
            evicted = step.evicted,
            "navigator transition committed"
        );
        let previous = match step.kind {
            StepKind::Undo => self.tape.future().front(),
            _ => self.tape.past().back(),
        };
        if let Some(previous) = previous {
            let next = self.tape.present();
            self.middleware
                .run(step.kind, |middleware| middleware(previous, next));
        }
        true
    }
}

impl<T> StateNavigator<T> {
    #[must_use]
    pub fn present(&self) -> &T {
        self.tape.present()
    }

    /// Older values, oldest first.
    #[must_use]
    pub fn past(&self) -> &VecDeque<T> {
        self.tape.past()
    }

    /// Undone values, next redo first.
    #[must_use]
    pub fn future(&self) -> &VecDeque<T> {
        self.tape.future()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.tape.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.tape.can_redo()
    }

    #[must_use]
    pub fn capacity(&self) -> Option<Capacity> {
        self.tape.capacity()
    }
}
