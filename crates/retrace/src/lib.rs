#![forbid(unsafe_code)]

//! retrace public facade crate.
//!
//! Re-exports the stable surface of `retrace-core` and `retrace-runtime` and
//! offers a [`prelude`] for day-to-day use.
//!
//! ```rust,ignore
//! use retrace::prelude::*;
//!
//! let mut store = HistoryStore::with_options(
//!     0,
//!     HistoryOptions::new().capacity(Capacity::new(50)?),
//! );
//! store.set(1);
//! store.undo();
//! ```

// --- Core re-exports -------------------------------------------------------

pub use retrace_core::{Capacity, CapacityError, Step, StepKind, Tape, Timeline};

// --- Runtime re-exports ----------------------------------------------------

pub use retrace_runtime::{
    Action, ConfigError, DEFAULT_MAX_CASCADE_DEPTH, Effects, HistoryOptions, HistoryStore,
    MAX_CASCADE_DEPTH, MiddlewareError, MiddlewareFn, MiddlewareResult, NavigatorMiddlewareFn,
    NavigatorOptions, StateNavigator, Store, StoreConfig, Subscription, Transition, Validated,
};

/// Build a [`HistoryStore`] from a [`StoreConfig`] without middleware.
pub fn history_from_config<T: PartialEq>(
    initial: T,
    config: &StoreConfig,
) -> Result<HistoryStore<T>, ConfigError> {
    let options = HistoryOptions::from_config(config)?;
    Ok(HistoryStore::with_options(initial, options))
}

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Action, Capacity, Effects, HistoryOptions, HistoryStore, MiddlewareError,
        MiddlewareResult, StateNavigator, Store, StoreConfig, Transition, Validated,
    };
}
