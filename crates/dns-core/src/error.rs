//! Error handling for zone data and zone transactions
//!
//! Every fallible operation in the workspace returns [`DnsResult`]. Storage
//! backends report their own failures through the same type, so errors flow
//! from a backend to the caller of a transaction without being re-wrapped.

use thiserror::Error;

/// Main result type used throughout the workspace
pub type DnsResult<T> = Result<T, DnsError>;

/// DNS zone and transaction error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    // Name errors
    #[error("Invalid DNS name '{name}': {reason}")]
    InvalidDnsName { name: String, reason: String },

    // Storage errors
    #[error("Record not found: {name} {record_type}")]
    RecordNotFound { name: String, record_type: u16 },

    #[error("Disk I/O error: {message}")]
    DiskIoError { message: String },

    // Transaction errors
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Tried to write to a read-only transaction")]
    ReadOnly,

    #[error("Existing data did not match data specified by an exact delete: {message}")]
    DeleteNotExact { message: String },

    #[error("Operation not supported by this backend: {feature}")]
    NotSupported { feature: String },

    #[error("Commit failed: {message}")]
    CommitFailed { message: String },

    #[error("Concurrency error: {message}")]
    ConcurrencyError { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigurationNotFound { path: String },

    #[error("Configuration parse error: {message}")]
    ConfigurationParseError { message: String },

    // Serialization errors
    #[error("Serialization error: {message}")]
    SerializationError { message: String },
}

impl DnsError {
    /// Create a new invalid name error
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDnsName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new record not found error
    pub fn record_not_found(name: impl Into<String>, record_type: u16) -> Self {
        Self::RecordNotFound {
            name: name.into(),
            record_type,
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Create a new inexact delete error
    pub fn delete_not_exact(message: impl Into<String>) -> Self {
        Self::DeleteNotExact { message: message.into() }
    }

    /// Create a new unsupported capability error
    pub fn not_supported(feature: impl Into<String>) -> Self {
        Self::NotSupported { feature: feature.into() }
    }

    /// Create a new commit failure
    pub fn commit_failed(message: impl Into<String>) -> Self {
        Self::CommitFailed { message: message.into() }
    }

    /// Create a new invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration { message: message.into() }
    }

    /// Check if this error is recoverable
    ///
    /// Only contention for the zone writer clears up on its own; every other
    /// failure needs different input or a different backend.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConcurrencyError { .. })
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidDnsName { .. } => "name",

            Self::RecordNotFound { .. } |
            Self::DiskIoError { .. } => "storage",

            Self::InvalidArgument { .. } |
            Self::ReadOnly |
            Self::DeleteNotExact { .. } |
            Self::NotSupported { .. } |
            Self::CommitFailed { .. } => "transaction",

            Self::ConcurrencyError { .. } => "concurrency",
            Self::InvalidState { .. } => "internal",

            Self::InvalidConfiguration { .. } |
            Self::ConfigurationNotFound { .. } |
            Self::ConfigurationParseError { .. } => "configuration",

            Self::SerializationError { .. } => "serialization",
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for DnsError {
    fn from(err: std::io::Error) -> Self {
        Self::DiskIoError { message: err.to_string() }
    }
}

/// Convert from serde_json::Error
impl From<serde_json::Error> for DnsError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError { message: err.to_string() }
    }
}
