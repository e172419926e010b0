//! Error types for the facet index.
//!
//! Malformed filter input is never an error here: filters report it by parsing
//! to `None`. What remains are configuration mistakes caught at registration
//! time and failures raised by the relational backend, which always surface to
//! the caller of the search request.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for index build and search operations.
#[derive(Error, Debug)]
pub enum FacetError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised while loading or registering filter configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Two filters of one content type share a key.
    #[error("duplicate filter key '{key}' for content type '{content_type}'")]
    DuplicateFilterKey { content_type: String, key: String },

    /// A filter key cannot be used as a column suffix or request parameter.
    #[error("invalid filter key '{key}': only lowercase letters, digits and '_' are allowed")]
    InvalidFilterKey { key: String },

    /// A content type name cannot be used as a table suffix.
    #[error("invalid content type '{content_type}'")]
    InvalidContentType { content_type: String },

    /// No filters are registered for the content type.
    #[error("unknown content type '{content_type}'")]
    UnknownContentType { content_type: String },

    /// The configured site UTC offset is malformed.
    #[error("invalid UTC offset '{value}'")]
    InvalidUtcOffset { value: String },

    /// The configuration document could not be deserialized.
    #[error("failed to parse configuration: {message}")]
    Parse { message: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse {
            message: err.to_string(),
        }
    }
}

/// Errors reported by the relational backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("backend '{backend_name}' unavailable: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// A statement failed to execute.
    #[error("query failed on backend '{backend_name}': {message}")]
    QueryFailed {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Any other backend failure.
    #[error("internal error in backend '{backend_name}': {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BackendError {
    /// Creates a query failure without an underlying source.
    pub fn query_failed(backend_name: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::QueryFailed {
            backend_name: backend_name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Returns the name of the backend that produced this error.
    pub fn backend_name(&self) -> &str {
        match self {
            BackendError::Unavailable { backend_name, .. }
            | BackendError::QueryFailed { backend_name, .. }
            | BackendError::Internal { backend_name, .. } => backend_name,
        }
    }
}

/// Result type alias for facet index operations.
pub type FacetResult<T> = Result<T, FacetError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
