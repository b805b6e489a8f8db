//! Domain error types
//!
//! Error hierarchy for the sync engine. Collaborator-specific failures are
//! wrapped by [`SyncError`]; third-party error types never cross this
//! boundary.

use thiserror::Error;

/// Main error type used throughout the application.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// ERP API errors
    #[error("ERP error: {0}")]
    Erp(#[from] ErpError),

    /// Storefront API errors
    #[error("Storefront error: {0}")]
    Storefront(#[from] StorefrontError),

    /// Pre-flight validation failures that never reach the wire
    #[error("Validation error: {0}")]
    Validation(String),

    /// Market/catalog/publication/price-list provisioning failures
    #[error("Provisioning error: {0}")]
    Provisioning(String),

    /// Retry budget exhausted against the storefront API
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// The flow's cancellation signal fired before this unit completed
    #[error("operation cancelled")]
    Cancelled,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// True when the error is the cooperative-cancellation marker.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}

/// ERP-specific errors
#[derive(Debug, Error)]
pub enum ErpError {
    /// Failed to reach the ERP API
    #[error("Failed to connect to ERP API: {0}")]
    ConnectionFailed(String),

    /// Non-success HTTP status from the ERP API
    #[error("ERP API returned {status}: {message}")]
    BadStatus { status: u16, message: String },

    /// Envelope carried a non-ok application status
    #[error("ERP API rejected request: {0}")]
    Rejected(String),

    /// Response body did not match the expected envelope
    #[error("Invalid response from ERP API: {0}")]
    InvalidResponse(String),
}

/// Storefront (Shopify Admin GraphQL) errors
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Failed to reach the GraphQL endpoint
    #[error("Failed to connect to storefront API: {0}")]
    ConnectionFailed(String),

    /// Non-success HTTP status outside the retryable class
    #[error("Storefront API returned {status}: {message}")]
    BadStatus { status: u16, message: String },

    /// Rate-limit signal, either HTTP 429 or an app-level throttle entry
    #[error("Storefront API throttled request: {0}")]
    Throttled(String),

    /// GraphQL top-level errors (non-throttle)
    #[error("GraphQL error: {0}")]
    Graphql(String),

    /// The mutation was accepted but rejected the operation semantically
    #[error("user errors: {}", format_user_errors(.0))]
    UserErrors(Vec<UserError>),

    /// Response body did not match the expected shape
    #[error("Invalid response from storefront API: {0}")]
    InvalidResponse(String),
}

impl StorefrontError {
    /// True for failures the retry policy is allowed to retry: the
    /// retryable HTTP status class and app-level throttling.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorefrontError::Throttled(_) => true,
            StorefrontError::BadStatus { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

/// A single entry of a mutation's `userErrors` payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl UserError {
    /// Dotted field path, or "(no field)" when the API omitted it.
    pub fn field_path(&self) -> String {
        match &self.field {
            Some(parts) if !parts.is_empty() => parts.join("."),
            _ => "(no field)".to_string(),
        }
    }
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field_path(), self.message)
    }
}

/// Join user errors into a single `field: message; ...` line.
pub fn format_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// Conversion from serde_json errors raised while building variables or
// decoding payloads outside the transport layer.
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}
