#![forbid(unsafe_code)]

//! Store configuration as data.
//!
//! [`StoreConfig`] carries the tunables shared by the stores in this crate so
//! they can be loaded from TOML or JSON at startup instead of being fixed in
//! code.
//!
//! # Loading
//!
//! ```toml
//! # retrace.toml
//! capacity = 50
//! max_cascade_depth = 4
//! ```
//!
//! ```rust,ignore
//! let config = StoreConfig::from_toml_file("retrace.toml")?;
//! let options = HistoryOptions::from_config(&config)?;
//! ```
//!
//! # Defaults
//!
//! `StoreConfig::default()` is unbounded with a cascade depth of
//! [`DEFAULT_MAX_CASCADE_DEPTH`]. A capacity of zero is rejected by
//! [`validate`](StoreConfig::validate) rather than treated as unbounded, and
//! so is a cascade depth above [`MAX_CASCADE_DEPTH`].

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use retrace_core::{Capacity, CapacityError};
use thiserror::Error;

use crate::middleware::{DEFAULT_MAX_CASCADE_DEPTH, MAX_CASCADE_DEPTH};

/// Errors produced while loading or validating a [`StoreConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a file.
    #[cfg(feature = "config")]
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    /// Capacity out of range.
    #[error("invalid capacity: {0}")]
    Capacity(#[from] CapacityError),
    /// Cascade depth above [`MAX_CASCADE_DEPTH`].
    #[error("max_cascade_depth {depth} exceeds the limit of {limit}")]
    CascadeDepth { depth: u32, limit: u32 },
}

/// Tunables for history stores.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct StoreConfig {
    /// Maximum retained entries; `None` for unbounded. Must not be zero.
    pub capacity: Option<usize>,
    /// Maximum nesting of middleware-requested transitions. Zero disables
    /// follow-up effects entirely; at most [`MAX_CASCADE_DEPTH`].
    pub max_cascade_depth: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
        }
    }
}

impl StoreConfig {
    /// Bounded configuration with the default cascade depth.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capacity_limit()?;
        if self.max_cascade_depth > MAX_CASCADE_DEPTH {
            return Err(ConfigError::CascadeDepth {
                depth: self.max_cascade_depth,
                limit: MAX_CASCADE_DEPTH,
            });
        }
        Ok(())
    }

    /// The configured capacity as a validated [`Capacity`].
    pub fn capacity_limit(&self) -> Result<Option<Capacity>, ConfigError> {
        self.capacity
            .map(Capacity::new)
            .transpose()
            .map_err(ConfigError::from)
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Serialize to a TOML string.
    #[cfg(feature = "config")]
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}
