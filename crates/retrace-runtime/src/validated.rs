#![forbid(unsafe_code)]

//! A value paired with a validity flag.

use std::fmt;

use tracing::trace;

/// Value whose validity is recomputed on every write.
///
/// The validator runs once at construction and once per `set`/`update`;
/// invalid values are stored all the same, so a form field can hold what the
/// user typed while showing an error.
pub struct Validated<T> {
    value: T,
    valid: bool,
    validator: Box<dyn Fn(&T) -> bool>,
}

impl<T: fmt::Debug> fmt::Debug for Validated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validated")
            .field("value", &self.value)
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}

impl<T> Validated<T> {
    #[must_use]
    pub fn new(initial: T, validator: impl Fn(&T) -> bool + 'static) -> Self {
        let valid = validator(&initial);
        Self {
            value: initial,
            valid,
            validator: Box::new(validator),
        }
    }

    /// Store `value` and return its validity.
    pub fn set(&mut self, value: T) -> bool {
        let valid = (self.validator)(&value);
        if valid != self.valid {
            trace!(valid, "validity changed");
        }
        self.value = value;
        self.valid = valid;
        valid
    }

    /// Store a value derived from the current one and return its validity.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.value);
        self.set(next)
    }

    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}
