#![forbid(unsafe_code)]

//! Middleware contract and failure isolation.
//!
//! Middleware are side-effect callbacks that run after every committed
//! transition of a store, in registration order. A middleware that returns
//! an error or panics is logged and skipped; the transition stays committed
//! and the remaining middleware still run.
//!
//! # Re-entrancy
//!
//! A middleware cannot borrow the store that is calling it. Instead it
//! receives an [`Effects`] queue and may request follow-up transitions
//! (`set`, `undo`, `redo`, `goto`). The store applies them in request order
//! once the current round of middleware has finished, each as a full
//! transition with its own middleware round. The nesting level of these
//! follow-ups is the *cascade depth*; requests beyond the store's
//! `max_cascade_depth` are dropped with a warning.
//!
//! ```text
//! set(1) ──► [mw#0, mw#1] ──► effects: [set(2)]
//!                                  │
//!                cascade 1 ◄───────┘
//!                set(2) ──► [mw#0, mw#1] ──► effects: []
//! ```
//!
//! # Panics
//!
//! Panic isolation uses [`catch_unwind`], so it only holds when the final
//! binary is built with `panic = "unwind"` (the Rust default). Under
//! `panic = "abort"` a panicking middleware or subscriber aborts the process
//! before any other callback runs. Errors returned as [`MiddlewareError`] are
//! isolated under either strategy.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use retrace_core::StepKind;
use thiserror::Error;
use tracing::{debug_span, error, warn};
use web_time::Instant;

/// Default bound on nested effect-driven transitions.
pub const DEFAULT_MAX_CASCADE_DEPTH: u32 = 8;

/// Largest accepted cascade depth. Each level is a nested call frame, so
/// larger bounds are clamped (builders) or rejected (config).
pub const MAX_CASCADE_DEPTH: u32 = 64;

/// Failure reported by a middleware.
///
/// Middleware errors never reach the caller of the transition; they are only
/// logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct MiddlewareError {
    message: String,
}

impl MiddlewareError {
    /// Create an error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for MiddlewareError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for MiddlewareError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Result returned by every middleware.
pub type MiddlewareResult = Result<(), MiddlewareError>;

/// View of a committed transition handed to middleware.
#[derive(Debug)]
pub struct Transition<'a, T> {
    /// Operation that committed.
    pub kind: StepKind,
    /// The new current value.
    pub current: &'a T,
    /// Pointer after the transition.
    pub pointer: usize,
    /// Pointer before the transition (before any eviction).
    pub previous_pointer: usize,
    /// Number of retained entries after the transition.
    pub len: usize,
    /// Entries evicted by capacity enforcement.
    pub evicted: usize,
    /// 0 for caller-initiated transitions, n for the n-th nested follow-up.
    pub cascade: u32,
}

/// A transition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<T> {
    Set(T),
    Undo,
    Redo,
    Goto(usize),
}

impl<T> Action<T> {
    /// Kind of step this action would produce if it commits.
    #[must_use]
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Set(_) => StepKind::Set,
            Self::Undo => StepKind::Undo,
            Self::Redo => StepKind::Redo,
            Self::Goto(_) => StepKind::Goto,
        }
    }
}

/// Follow-up transitions requested by middleware during one round.
pub struct Effects<T> {
    queued: Vec<Action<T>>,
}

impl<T> Effects<T> {
    pub(crate) fn new() -> Self {
        Self { queued: Vec::new() }
    }

    /// Request a write of `value`.
    pub fn set(&mut self, value: T) {
        self.queued.push(Action::Set(value));
    }

    pub fn undo(&mut self) {
        self.queued.push(Action::Undo);
    }

    pub fn redo(&mut self) {
        self.queued.push(Action::Redo);
    }

    pub fn goto(&mut self, index: usize) {
        self.queued.push(Action::Goto(index));
    }

    /// Request an arbitrary action.
    pub fn push(&mut self, action: Action<T>) {
        self.queued.push(action);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub(crate) fn into_actions(self) -> Vec<Action<T>> {
        self.queued
    }
}

impl<T> fmt::Debug for Effects<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effects")
            .field("queued", &self.queued.len())
            .finish()
    }
}

/// Boxed history-store middleware.
pub type MiddlewareFn<T> = Box<dyn FnMut(&Transition<'_, T>, &mut Effects<T>) -> MiddlewareResult>;

/// Outcome of one middleware round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RoundReport {
    pub(crate) succeeded: usize,
    pub(crate) failed: usize,
}

struct Entry<F> {
    name: String,
    callback: F,
}

/// Ordered, named list of callbacks with isolated execution.
pub(crate) struct Chain<F> {
    entries: Vec<Entry<F>>,
}

impl<F> Chain<F> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a callback under a default `middleware#<index>` name.
    pub(crate) fn push(&mut self, callback: F) {
        let name = format!("middleware#{}", self.entries.len());
        self.push_named(name, callback);
    }

    pub(crate) fn push_named(&mut self, name: impl Into<String>, callback: F) {
        self.entries.push(Entry {
            name: name.into(),
            callback,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Run every callback in order through `call`, isolating failures.
    pub(crate) fn run(
        &mut self,
        kind: StepKind,
        mut call: impl FnMut(&mut F) -> MiddlewareResult,
    ) -> RoundReport {
        let mut report = RoundReport::default();
        if self.entries.is_empty() {
            return report;
        }

        let started = Instant::now();
        let _span = debug_span!(
            "retrace.middleware",
            transition = kind.as_str(),
            middleware_count = self.entries.len() as u64,
            duration_us = tracing::field::Empty
        )
        .entered();

        for entry in &mut self.entries {
            let callback = &mut entry.callback;
            if run_isolated(&entry.name, kind, || call(callback)) {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        let duration_us = started.elapsed().as_micros() as u64;
        tracing::Span::current().record("duration_us", duration_us);
        report
    }
}

impl<F> fmt::Debug for Chain<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Run one callback, catching both returned errors and panics.
///
/// Returns `true` if the callback completed successfully.
pub(crate) fn run_isolated(
    name: &str,
    kind: StepKind,
    callback: impl FnOnce() -> MiddlewareResult,
) -> bool {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(
                middleware = name,
                transition = kind.as_str(),
                error = %err,
                "middleware failed"
            );
            false
        }
        Err(payload) => {
            error!(
                middleware = name,
                transition = kind.as_str(),
                panic = panic_message(payload.as_ref()),
                "middleware panicked"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Callback = Box<dyn FnMut(&mut Vec<&'static str>) -> MiddlewareResult>;

    fn callback(f: impl FnMut(&mut Vec<&'static str>) -> MiddlewareResult + 'static) -> Callback {
        Box::new(f)
    }

    #[test]
    fn error_converts_from_strings() {
        let a = MiddlewareError::from("boom");
        let b = MiddlewareError::from(String::from("boom"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "boom");
        assert_eq!(a.message(), "boom");
    }

    #[test]
    fn effects_queue_in_request_order() {
        let mut effects = Effects::new();
        assert!(effects.is_empty());
        effects.set(3);
        effects.undo();
        effects.goto(0);
        effects.redo();
        assert_eq!(effects.len(), 4);
        assert_eq!(
            effects.into_actions(),
            vec![Action::Set(3), Action::Undo, Action::Goto(0), Action::Redo]
        );
    }

    #[test]
    fn action_kind_matches_step_kind() {
        assert_eq!(Action::Set(1).kind(), StepKind::Set);
        assert_eq!(Action::<i32>::Undo.kind(), StepKind::Undo);
        assert_eq!(Action::<i32>::Redo.kind(), StepKind::Redo);
        assert_eq!(Action::<i32>::Goto(4).kind(), StepKind::Goto);
    }

    #[test]
    fn chain_names_default_to_index() {
        let mut chain: Chain<Callback> = Chain::new();
        chain.push(callback(|_| Ok(())));
        chain.push_named("audit", callback(|_| Ok(())));
        chain.push(callback(|_| Ok(())));
        let names: Vec<_> = chain.names().collect();
        assert_eq!(names, vec!["middleware#0", "audit", "middleware#2"]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn chain_isolates_errors_and_panics() {
        let mut chain: Chain<Callback> = Chain::new();
        chain.push(callback(|log| {
            log.push("first");
            Err(MiddlewareError::new("rejected"))
        }));
        chain.push(callback(|_| panic!("observer exploded")));
        chain.push(callback(|log| {
            log.push("third");
            Ok(())
        }));

        let mut log = Vec::new();
        let report = chain.run(StepKind::Set, |cb| cb(&mut log));
        assert_eq!(log, vec!["first", "third"]);
        assert_eq!(
            report,
            RoundReport {
                succeeded: 1,
                failed: 2
            }
        );
    }

    #[test]
    fn empty_chain_reports_nothing() {
        let mut chain: Chain<Callback> = Chain::new();
        assert!(chain.is_empty());
        let report = chain.run(StepKind::Undo, |_| unreachable!());
        assert_eq!(report, RoundReport::default());
    }

    #[test]
    fn panic_message_extracts_strings() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
