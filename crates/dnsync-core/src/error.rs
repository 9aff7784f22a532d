//! Error types for dnsync
//!
//! The reconciler never treats an error as fatal. Errors only stop the
//! process during configuration and construction; once running, every
//! failure is reported and retried on the next scheduled tick.

use thiserror::Error;

use crate::config::AddressFamily;

/// Result type alias for dnsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dnsync
#[derive(Error, Debug)]
pub enum Error {
    /// The address resolver could not produce an address
    #[error("Address resolution failed ({family}): {message}")]
    Resolution {
        /// Address family that was being resolved
        family: AddressFamily,
        /// Error message
        message: String,
    },

    /// Listing the published value of a record failed
    #[error("Failed to list {record}: {message}")]
    ProviderList {
        /// Record descriptor (`domain/type@zone`)
        record: String,
        /// Error message
        message: String,
    },

    /// Writing a record value failed
    #[error("Failed to write {record}: {message}")]
    ProviderWrite {
        /// Record descriptor (`domain/type@zone`)
        record: String,
        /// Error message
        message: String,
    },

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(family: AddressFamily, message: impl Into<String>) -> Self {
        Self::Resolution {
            family,
            message: message.into(),
        }
    }

    /// Create a list error for a record
    pub fn provider_list(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderList {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Create a write error for a record
    pub fn provider_write(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderWrite {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
