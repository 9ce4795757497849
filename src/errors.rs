/*!
 * Error types for the subrelay library.
 *
 * This module contains custom error types for the different stages of a
 * subtitle request, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors raised by an upstream subtitle source.
///
/// The resolution cascade never propagates these: a failing source is
/// treated as "no candidate" and the next probe runs.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source could not be reached or answered with a failure
    #[error("{source_name} unavailable: {message}")]
    Unavailable {
        /// Name of the source adapter
        source_name: &'static str,
        /// What went wrong
        message: String,
    },

    /// The request did not finish within the adapter's timeout
    #[error("{source_name} timed out")]
    Timeout {
        /// Name of the source adapter
        source_name: &'static str,
    },

    /// The source answered but the payload could not be decoded
    #[error("{source_name} returned an unreadable response: {message}")]
    InvalidResponse {
        /// Name of the source adapter
        source_name: &'static str,
        /// Decoder message
        message: String,
    },
}

impl SourceError {
    /// Classify a reqwest error for the given source
    pub fn from_reqwest(source_name: &'static str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout { source_name }
        } else if error.is_decode() {
            Self::InvalidResponse {
                source_name,
                message: error.to_string(),
            }
        } else {
            Self::Unavailable {
                source_name,
                message: error.to_string(),
            }
        }
    }
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and body onto a provider error
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while a translation job runs
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The source subtitle body could not be fetched or held no cues
    #[error("Download failed: {0}")]
    Download(String),

    /// The provider returned a different number of units than it was given
    #[error("Translated unit count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Units submitted
        expected: usize,
        /// Units returned after correction
        actual: usize,
    },

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Unknown provider name or missing credential
    #[error("Provider configuration error: {0}")]
    Configuration(String),

    /// The final artifact or its record could not be written
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TranslationError {
    /// Whether another attempt may succeed
    ///
    /// Provider failures and count mismatches share the retry ceiling.
    /// A rejected credential is a configuration problem and, like everything
    /// else, ends the job at once.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CountMismatch { .. } => true,
            Self::Provider(ProviderError::AuthenticationError(_)) => false,
            Self::Provider(_) => true,
            _ => false,
        }
    }
}
