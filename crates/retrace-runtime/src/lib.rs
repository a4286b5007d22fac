#![forbid(unsafe_code)]

//! retrace runtime
//!
//! Stateful stores built on the pure history models in `retrace-core`.
//!
//! # Key Components
//!
//! - [`HistoryStore`] - bounded pointer-over-array undo/redo with middleware
//! - [`StateNavigator`] - past/present/future undo/redo with reset
//! - [`Store`] - shared observable value with subscriptions
//! - [`Validated`] - value with a recomputed validity flag
//! - [`StoreConfig`] - tunables loadable from TOML/JSON (`config` feature)
//!
//! # Threading
//!
//! Everything here is single-threaded and synchronous. Stores are owned by
//! one caller ([`HistoryStore`], [`StateNavigator`], [`Validated`]) or shared
//! through `Rc` within one thread ([`Store`]). Middleware and subscribers
//! run to completion before the mutating call returns.
//!
//! # Logging
//!
//! The crate emits `tracing` events and spans but never installs a
//! subscriber. Committed transitions log at `debug`, middleware errors at
//! `warn`, and middleware panics at `error`.

pub mod config;
pub mod history_store;
pub mod middleware;
pub mod navigator;
pub mod store;
pub mod validated;

pub use config::{ConfigError, StoreConfig};
pub use history_store::{HistoryOptions, HistoryStore};
pub use middleware::{
    Action, DEFAULT_MAX_CASCADE_DEPTH, Effects, MAX_CASCADE_DEPTH, MiddlewareError, MiddlewareFn,
    MiddlewareResult, Transition,
};
pub use navigator::{NavigatorMiddlewareFn, NavigatorOptions, StateNavigator};
pub use store::{Store, Subscription};
pub use validated::Validated;
