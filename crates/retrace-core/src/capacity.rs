#![forbid(unsafe_code)]

//! Bounded retention limits.

use std::fmt;
use std::num::NonZeroUsize;

use thiserror::Error;

/// Errors produced when constructing a [`Capacity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// A capacity of zero would leave no room for the current value.
    #[error("history capacity must be at least 1")]
    Zero,
}

/// Maximum number of entries a history retains.
///
/// Always at least 1, so the current value can never be evicted. "Unlimited"
/// is expressed as `Option<Capacity>::None` rather than a sentinel.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capacity(NonZeroUsize);

impl Capacity {
    /// Create a capacity, rejecting zero.
    pub fn new(limit: usize) -> Result<Self, CapacityError> {
        NonZeroUsize::new(limit).map(Self).ok_or(CapacityError::Zero)
    }

    /// The limit as a plain `usize`.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }

    /// Number of entries that must be evicted to bring `len` within bounds.
    #[must_use]
    pub fn excess(self, len: usize) -> usize {
        len.saturating_sub(self.get())
    }
}

impl From<NonZeroUsize> for Capacity {
    fn from(limit: NonZeroUsize) -> Self {
        Self(limit)
    }
}

impl TryFrom<usize> for Capacity {
    type Error = CapacityError;

    fn try_from(limit: usize) -> Result<Self, Self::Error> {
        Self::new(limit)
    }
}

impl From<Capacity> for usize {
    fn from(capacity: Capacity) -> Self {
        capacity.get()
    }
}

impl fmt::Debug for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capacity({})", self.get())
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}
