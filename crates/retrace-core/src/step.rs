#![forbid(unsafe_code)]

//! Records of committed history transitions.

use std::fmt;

/// Which operation produced a [`Step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// A new value was written.
    Set,
    /// The pointer moved one entry back.
    Undo,
    /// The pointer moved one entry forward.
    Redo,
    /// The pointer jumped to an arbitrary entry.
    Goto,
}

impl StepKind {
    /// Stable lowercase name, used as a log field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Goto => "goto",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed transition.
///
/// `from` is the pointer before the operation, measured against the history
/// as it was *before* any eviction. `to` is the pointer after the operation,
/// measured against the history as it is now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Operation that committed.
    pub kind: StepKind,
    /// Pointer before the operation.
    pub from: usize,
    /// Pointer after the operation.
    pub to: usize,
    /// Entries dropped from the front by capacity enforcement.
    pub evicted: usize,
}

impl Step {
    pub(crate) const fn moved(kind: StepKind, from: usize, to: usize) -> Self {
        Self {
            kind,
            from,
            to,
            evicted: 0,
        }
    }
}
