use reelwatch_core_types::RunId;
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure in the pipeline is classified into one of these kinds.
/// Each kind maps to a stable error code used in logs, run summaries and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Upstream feed
    /// Network failure, timeout or non-2xx response from the feed
    Fetch,
    /// Feed body is not the expected nested shape (root is not an array)
    InvalidFeed,
    /// A single occurrence is malformed and was skipped
    Normalization,

    // Snapshot store
    /// Location does not exist in the store
    NotFound,
    /// Store read failed for a reason other than NotFound
    StoreRead,
    /// Store write failed
    StoreWrite,
    /// A different payload already occupies the key being written
    AlreadyExists,
    /// Stored artifact cannot be decoded
    InvalidArtifact,

    // Side effects
    /// Notification dispatch failed for one record
    Notify,
    /// Deleting an expired artifact failed
    Retention,

    // Integration/IO
    Io,
    Serialization,
    Timeout,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Fetch => "ERR_FETCH",
            ExErrorKind::InvalidFeed => "ERR_INVALID_FEED",
            ExErrorKind::Normalization => "ERR_NORMALIZATION",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::StoreRead => "ERR_STORE_READ",
            ExErrorKind::StoreWrite => "ERR_STORE_WRITE",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::InvalidArtifact => "ERR_INVALID_ARTIFACT",
            ExErrorKind::Notify => "ERR_NOTIFY",
            ExErrorKind::Retention => "ERR_RETENTION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether an error of this kind aborts a pipeline run.
    ///
    /// Normalization, notification and retention failures are collected
    /// per item; everything else stops the run where it happens.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ExErrorKind::Normalization | ExErrorKind::Notify | ExErrorKind::Retention
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling plus
/// context fields for debugging. Built with the `with_*` methods.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    stage: Option<String>,
    location: Option<String>,
    identity_key: Option<String>,
    run_id: Option<RunId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            stage: None,
            location: None,
            identity_key: None,
            run_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add pipeline stage context
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Add store location context
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Add record identity key context
    pub fn with_identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_key = Some(key.into());
        self
    }

    /// Add run ID context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the pipeline stage, if any
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    /// Get the store location context, if any
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Get the identity key context, if any
    pub fn identity_key(&self) -> Option<&str> {
        self.identity_key.as_deref()
    }

    /// Get the run ID context, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(stage) = &self.stage {
            write!(f, " (stage: {})", stage)?;
        }
        if let Some(location) = &self.location {
            write!(f, " (location: {})", location)?;
        }
        if let Some(key) = &self.identity_key {
            write!(f, " (identity_key: {})", key)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Faults found while flattening a single feed occurrence.
///
/// Positions are zero-based indices into the nested feed arrays.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A required field is absent or has the wrong JSON type
    #[error("missing required field `{field}` at item {item}, event {event}, performance {performance}")]
    MissingField {
        field: &'static str,
        item: usize,
        event: usize,
        performance: usize,
    },

    /// A field is present but its value cannot be used
    #[error("invalid value for `{field}` at item {item}, event {event}, performance {performance}: {reason}")]
    InvalidField {
        field: &'static str,
        item: usize,
        event: usize,
        performance: usize,
        reason: String,
    },

    /// The feed root is not an array of items
    #[error("feed root must be an array, got {found}")]
    RootNotArray { found: String },
}

impl From<RecordError> for ExError {
    fn from(err: RecordError) -> Self {
        let kind = match err {
            RecordError::RootNotArray { .. } => ExErrorKind::InvalidFeed,
            RecordError::MissingField { .. } | RecordError::InvalidField { .. } => {
                ExErrorKind::Normalization
            }
        };
        ExError::new(kind)
            .with_op("normalize")
            .with_message(err.to_string())
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}
