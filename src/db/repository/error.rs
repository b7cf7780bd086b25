//! Error types for store operations.
//!
//! All store failures surface through [`RepositoryError`] with structured
//! context for debugging and monitoring. Errors are propagated to the caller
//! unmodified; the engine never retries internally.

use std::fmt;

/// Result type for store operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Structured context for store errors.
///
/// Provides additional information about where and why an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "get_policy_by_ids").
    pub operation: Option<String>,
    /// The entity type involved (e.g., "profile", "window", "mapping").
    pub entity: Option<String>,
    /// The entity ID if applicable.
    pub entity_id: Option<String>,
    /// Additional details about the error.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the entity type.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set the entity ID.
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref entity) = self.entity {
            parts.push(format!("entity={}", entity));
        }
        if let Some(ref id) = self.entity_id {
            parts.push(format!("id={}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Policy, window or mapping lookup failure.
    #[error("Read error: {message} {context}")]
    ReadError {
        message: String,
        context: ErrorContext,
    },

    /// Transactional write failure; the surrounding transaction rolls back.
    #[error("Write error: {message} {context}")]
    WriteError {
        message: String,
        context: ErrorContext,
    },

    /// Requested entity was not found. Evaluation paths treat this as "no
    /// restriction"; targeted CRUD reads surface it.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// Malformed policy JSON or window payload.
    #[error("Serialization error: {message} {context}")]
    SerializationError {
        message: String,
        context: ErrorContext,
    },

    /// Input failed validation before the store was touched (e.g. an
    /// unknown timezone name on a profile).
    #[error("Validation error: {message} {context}")]
    ValidationError {
        message: String,
        context: ErrorContext,
    },

    /// Begin/commit/rollback failed or a transaction handle was misused.
    #[error("Transaction error: {message} {context}")]
    TransactionError {
        message: String,
        context: ErrorContext,
    },

    /// Configuration or initialization error.
    #[error("Configuration error: {message} {context}")]
    ConfigurationError {
        message: String,
        context: ErrorContext,
    },
}

impl RepositoryError {
    /// Create a read error.
    pub fn read(message: impl Into<String>) -> Self {
        Self::ReadError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a read error with context.
    pub fn read_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ReadError {
            message: message.into(),
            context,
        }
    }

    /// Create a write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a write error with context.
    pub fn write_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::WriteError {
            message: message.into(),
            context,
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a not found error with context.
    pub fn not_found_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a validation error with context.
    pub fn validation_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ValidationError {
            message: message.into(),
            context,
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// True for absent-entity errors, which evaluation reads map to "no
    /// restriction configured".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ReadError { context, .. } => context,
            Self::WriteError { context, .. } => context,
            Self::NotFound { context, .. } => context,
            Self::SerializationError { context, .. } => context,
            Self::ValidationError { context, .. } => context,
            Self::TransactionError { context, .. } => context,
            Self::ConfigurationError { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::ReadError { context, .. }
            | Self::WriteError { context, .. }
            | Self::NotFound { context, .. }
            | Self::SerializationError { context, .. }
            | Self::ValidationError { context, .. }
            | Self::TransactionError { context, .. }
            | Self::ConfigurationError { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError {
            message: err.to_string(),
            context: ErrorContext::default().with_entity("json_data"),
        }
    }
}
