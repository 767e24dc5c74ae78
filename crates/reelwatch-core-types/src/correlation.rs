//! Correlation types for run tracking
//!
//! Every pipeline invocation gets a fresh [`RunId`] so that log lines,
//! errors and persisted artifacts of one run can be tied together.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generate a new RunId using UUIDv7 (time-ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context carried through one pipeline run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    /// What triggered the run (e.g. "schedule", "cli")
    pub trigger: String,
}

impl RunContext {
    /// Create a new context with a fresh RunId
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            trigger: trigger.into(),
        }
    }

    /// Create a context with an existing RunId
    pub fn with_run_id(run_id: RunId, trigger: impl Into<String>) -> Self {
        Self {
            run_id,
            trigger: trigger.into(),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new("manual")
    }
}
