//! Error types for the Snowflake provider.

use thiserror::Error;

use crate::executor::{ScanError, SqlError};
use crate::schema::Diagnostic;

/// Errors that can occur while managing Snowflake resources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote object does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A statement failed; the context names the operation and object.
    #[error("{context}: {source}")]
    Sql {
        /// What was being attempted, e.g. `error creating schema S`.
        context: String,
        /// The underlying execution error.
        #[source]
        source: SqlError,
    },

    /// A query failed before any rows came back.
    #[error(transparent)]
    Query(#[from] SqlError),

    /// A result row did not have the expected shape.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A composite resource ID could not be parsed.
    #[error("ID {0} is invalid")]
    InvalidId(String),

    /// The server reported state the provider cannot interpret.
    #[error("Invalid remote state: {0}")]
    InvalidState(String),

    /// An update failed part way; `state` holds every change that was applied.
    #[error("{source}")]
    PartialApply {
        /// Prior state with the successfully applied attributes merged in.
        state: serde_json::Value,
        /// The error that stopped the update.
        #[source]
        source: Box<ProviderError>,
    },

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from the host.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Wrap a statement failure with operation context.
    pub fn sql(context: impl Into<String>, source: SqlError) -> Self {
        Self::Sql {
            context: context.into(),
            source,
        }
    }

    /// Whether this error means the remote object is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::PartialApply { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// The state committed before a partial failure, if any.
    pub fn partial_state(&self) -> Option<&serde_json::Value> {
        match self {
            Self::PartialApply { state, .. } => Some(state),
            _ => None,
        }
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(err: &ProviderError) -> Self {
        let diagnostic = Diagnostic::error(err.to_string());
        match err {
            ProviderError::Sql { source, .. } => diagnostic.with_detail(source.to_string()),
            ProviderError::PartialApply { .. } => {
                diagnostic.with_detail("Changes applied before the failure were kept")
            }
            _ => diagnostic,
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        Diagnostic::from(&err)
    }
}
