#![forbid(unsafe_code)]

//! Core data structures for retrace.
//!
//! This crate holds the pure, callback-free history models. Nothing here logs,
//! allocates callbacks, or knows about observers; the stateful stores built on
//! top of these types live in `retrace-runtime`.
//!
//! # Key Types
//!
//! - [`Timeline`] - pointer-over-array history with optional capacity
//! - [`Tape`] - past/present/future history with optional capacity on the past
//! - [`Capacity`] - non-zero bound on retained entries
//! - [`Step`] - record of a committed transition
//!
//! Both models report every committed mutation as `Some(Step)` and every
//! no-op as `None`, so callers can decide whether anything needs to be
//! re-rendered or observed.

pub mod capacity;
pub mod step;
pub mod tape;
pub mod timeline;

pub use capacity::{Capacity, CapacityError};
pub use step::{Step, StepKind};
pub use tape::Tape;
pub use timeline::Timeline;
