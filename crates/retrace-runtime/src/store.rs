#![forbid(unsafe_code)]

//! Shared observable store with change notification and version tracking.
//!
//! # Design
//!
//! [`Store<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). When the value changes (determined by
//! `PartialEq`), all live subscribers are notified in registration order.
//! Handles are cheap to clone and every clone sees the same value.
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: subscribers may call `set`/`update` on a clone of
//!   the store. The borrow is released before callbacks run, so this is safe.
//!   A nested write runs its own notification round and the outer round stops
//!   there, so every subscriber last sees the value the store holds. Writes
//!   nested deeper than `max_cascade_depth` are rejected with a warning.
//! - **Panicking subscriber**: caught and logged; later subscribers still run.
//! - **Subscriber leak**: if [`Subscription`] guards are stored indefinitely,
//!   callbacks accumulate. Dead weak references are pruned lazily during
//!   notification.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use retrace_core::StepKind;
use tracing::{debug_span, trace, warn};
use web_time::Instant;

use crate::middleware::{DEFAULT_MAX_CASCADE_DEPTH, MAX_CASCADE_DEPTH, run_isolated};

/// A subscriber callback stored as a strong `Rc` in the guard, handed out
/// as `Weak` to the store.
type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct StoreState<T> {
    value: T,
    version: u64,
    /// Pruned on notify.
    subscribers: Vec<CallbackWeak<T>>,
}

struct Shared<T> {
    state: RefCell<StoreState<T>>,
    /// Notification rounds currently on the stack.
    depth: Cell<u32>,
    max_depth: u32,
}

/// A shared, version-tracked value with change notification.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing write.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Subscribers are notified in registration order.
pub struct Store<T> {
    shared: Rc<Shared<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Store")
            .field("value", &state.value)
            .field("version", &state.version)
            .field("subscriber_count", &state.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Store<T> {
    /// Create a store with the default cascade depth.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_max_cascade_depth(value, DEFAULT_MAX_CASCADE_DEPTH)
    }

    /// Create a store that accepts writes from subscribers at most
    /// `max_depth` rounds deep (clamped to [`MAX_CASCADE_DEPTH`]). A depth of
    /// 0 rejects every write made from inside a subscriber.
    #[must_use]
    pub fn with_max_cascade_depth(value: T, max_depth: u32) -> Self {
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(StoreState {
                    value,
                    version: 0,
                    subscribers: Vec::new(),
                }),
                depth: Cell::new(0),
                max_depth: max_depth.min(MAX_CASCADE_DEPTH),
            }),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.shared.state.borrow().value.clone()
    }

    /// Access the current value by reference.
    ///
    /// Calling `set` on this store from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.shared.state.borrow().value)
    }

    /// Replace the value. Returns `true` if it changed.
    ///
    /// Returns `false` without writing when called from a subscriber nested
    /// deeper than the cascade bound.
    pub fn set(&self, value: T) -> bool {
        if !self.write_allowed() {
            return false;
        }
        {
            let mut state = self.shared.state.borrow_mut();
            if state.value == value {
                return false;
            }
            state.value = value;
            state.version += 1;
        }
        self.notify();
        true
    }

    /// Modify the value in place. Subscribers are notified only if the result
    /// differs from the value before `f` ran.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        if !self.write_allowed() {
            return false;
        }
        let changed = {
            let mut state = self.shared.state.borrow_mut();
            let old = state.value.clone();
            f(&mut state.value);
            if state.value != old {
                state.version += 1;
                true
            } else {
                false
            }
        };
        if changed {
            self.notify();
        }
        changed
    }

    /// Subscribe to changes. Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.shared.state.borrow_mut().subscribers.push(weak);
        // `Rc<dyn Fn(&T)>` cannot coerce to `Rc<dyn Any>`, so box it.
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Increments by 1 on each value-changing write.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.state.borrow().version
    }

    /// Registered subscribers, including dropped ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.borrow().subscribers.len()
    }

    /// Writes made while `depth` rounds are running are cascade level
    /// `depth`; a top-level write is level 0 and always allowed.
    fn write_allowed(&self) -> bool {
        let depth = self.shared.depth.get();
        if depth > self.shared.max_depth {
            warn!(
                depth,
                max_cascade_depth = self.shared.max_depth,
                "store write rejected: cascade depth exceeded"
            );
            return false;
        }
        true
    }

    fn notify(&self) {
        let depth = self.shared.depth.get();

        // Collect live callbacks first so no borrow is held during calls.
        let (callbacks, value, version): (Vec<CallbackRc<T>>, T, u64) = {
            let mut state = self.shared.state.borrow_mut();
            state.subscribers.retain(|w| w.strong_count() > 0);
            let callbacks = state.subscribers.iter().filter_map(Weak::upgrade).collect();
            (callbacks, state.value.clone(), state.version)
        };
        if callbacks.is_empty() {
            return;
        }

        let started = Instant::now();
        let _span = debug_span!(
            "retrace.notify",
            subscribers = callbacks.len() as u64,
            depth,
            duration_us = tracing::field::Empty
        )
        .entered();

        self.shared.depth.set(depth + 1);
        for (index, cb) in callbacks.iter().enumerate() {
            // A nested write already delivered a newer value to everyone.
            if self.shared.state.borrow().version != version {
                trace!(depth, delivered = index as u64, "store notification superseded");
                break;
            }
            let name = format!("subscriber#{index}");
            run_isolated(&name, StepKind::Set, || {
                cb(&value);
                Ok(())
            });
        }
        self.shared.depth.set(depth);

        let duration_us = started.elapsed().as_micros() as u64;
        tracing::Span::current().record("duration_us", duration_us);
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` drops the strong `Rc`, so the `Weak` in the
/// store's subscriber list fails to upgrade on the next notification.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
