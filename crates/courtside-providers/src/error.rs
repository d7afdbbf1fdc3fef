//! Error types for provider operations.
//!
//! Every failure the booking sites can produce is classified into a
//! [`ProviderErrorCode`]. The classification drives retry decisions and the
//! sentence shown to the end user; raw provider codes are kept alongside for
//! diagnostics only.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    /// Connection failed, timed out, or the body could not be read.
    NetworkError,
    /// HTTP 429 from the provider.
    RateLimited,
    /// HTTP 5xx from the provider.
    ServerError,
    /// Login rejected; new credentials are needed.
    AuthenticationFailed,
    /// The page or payload no longer has the shape we scrape.
    MarkupShape,
    /// Booking attempted outside the allowed window (result `"err"`).
    TimeWindowRejection,
    /// Member is not entitled to book (result `"-3"`).
    EligibilityRejection,
    /// Someone else booked the slot first (result `"-1"`).
    SlotConflictRejection,
    /// Any other provider result code.
    UnknownProvider,
    /// The provider refused a cancellation request.
    CancellationRejected,
    /// Unexpected HTTP status or malformed response that is not a shape change.
    InvalidResponse,
    /// The caller aborted the operation.
    Cancelled,
    /// Missing or invalid configuration.
    ConfigurationError,
    /// Unexpected internal state.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if the operation may be retried with backoff.
    ///
    /// Only transport-level failures qualify; business outcomes never do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns true for the booking rejections decoded from a result code.
    pub fn is_business_rejection(&self) -> bool {
        matches!(
            self,
            Self::TimeWindowRejection | Self::EligibilityRejection | Self::SlotConflictRejection
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::AuthenticationFailed => "authentication_failed",
            Self::MarkupShape => "markup_shape",
            Self::TimeWindowRejection => "time_window_rejection",
            Self::EligibilityRejection => "eligibility_rejection",
            Self::SlotConflictRejection => "slot_conflict_rejection",
            Self::UnknownProvider => "unknown_provider",
            Self::CancellationRejected => "cancellation_rejected",
            Self::InvalidResponse => "invalid_response",
            Self::Cancelled => "cancelled",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }

    /// The sentence shown to the end user for this kind of failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NetworkError | Self::ServerError => {
                "The reservation site could not be reached. Please try again shortly."
            }
            Self::RateLimited => "The reservation site is busy. Please try again shortly.",
            Self::AuthenticationFailed => {
                "Login failed. Please check the site ID and password in your profile."
            }
            Self::MarkupShape => {
                "The reservation site changed its pages. Booking is unavailable until this is fixed."
            }
            Self::TimeWindowRejection => {
                "Booking is not open for this slot yet. Please try again during the booking window."
            }
            Self::EligibilityRejection => "This account is not eligible to book this court.",
            Self::SlotConflictRejection => "This slot has already been booked by someone else.",
            Self::UnknownProvider => "The reservation site returned an unexpected result.",
            Self::CancellationRejected => "The reservation site refused the cancellation.",
            Self::InvalidResponse => "The reservation site returned an unexpected response.",
            Self::Cancelled => "The operation was cancelled before it completed.",
            Self::ConfigurationError => "The reservation client is not configured correctly.",
            Self::InternalError => "An internal error occurred.",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to a booking site.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    /// Human-readable detail for logs.
    message: String,
    /// The provider that produced this error ("nowon", "dobong").
    provider: Option<String>,
    /// Raw provider result code, kept for diagnostics.
    raw_code: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            raw_code: None,
            source: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn markup_shape(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::MarkupShape, message)
    }

    pub fn cancellation_rejected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::CancellationRejected, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Cancelled, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_raw_code(mut self, raw_code: impl Into<String>) -> Self {
        self.raw_code = Some(raw_code.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn raw_code(&self) -> Option<&str> {
        self.raw_code.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == ProviderErrorCode::Cancelled
    }

    /// The end-user sentence for this error.
    pub fn user_message(&self) -> &'static str {
        self.code.user_message()
    }

    /// Copies everything except the boxed source, which cannot be cloned.
    ///
    /// Used when one failure (e.g. a login) applies to several batches.
    pub fn detached(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            provider: self.provider.clone(),
            raw_code: self.raw_code.clone(),
            source: None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref raw) = self.raw_code {
            write!(f, " (code {})", raw)?;
        }
        Ok(())
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_retry() {
        assert!(ProviderErrorCode::NetworkError.is_retryable());
        assert!(ProviderErrorCode::RateLimited.is_retryable());
        assert!(ProviderErrorCode::ServerError.is_retryable());
        assert!(!ProviderErrorCode::AuthenticationFailed.is_retryable());
        assert!(!ProviderErrorCode::MarkupShape.is_retryable());
        assert!(!ProviderErrorCode::SlotConflictRejection.is_retryable());
        assert!(!ProviderErrorCode::UnknownProvider.is_retryable());
        assert!(!ProviderErrorCode::Cancelled.is_retryable());
    }

    #[test]
    fn rejections_have_distinct_messages() {
        let messages = [
            ProviderErrorCode::TimeWindowRejection.user_message(),
            ProviderErrorCode::EligibilityRejection.user_message(),
            ProviderErrorCode::SlotConflictRejection.user_message(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
        assert!(ProviderErrorCode::SlotConflictRejection.is_business_rejection());
        assert!(!ProviderErrorCode::UnknownProvider.is_business_rejection());
    }

    #[test]
    fn display_includes_provider_and_raw_code() {
        let err = ProviderError::new(ProviderErrorCode::UnknownProvider, "unmapped result")
            .with_provider("nowon")
            .with_raw_code("-7");
        let display = err.to_string();
        assert!(display.contains("[nowon]"));
        assert!(display.contains("unknown_provider"));
        assert!(display.contains("(code -7)"));
    }

    #[test]
    fn detached_keeps_classification() {
        let io_err = std::io::Error::other("reset");
        let err = ProviderError::network("login failed")
            .with_provider("dobong")
            .with_source(io_err);
        let copy = err.detached();
        assert_eq!(copy.code(), ProviderErrorCode::NetworkError);
        assert_eq!(copy.provider(), Some("dobong"));
        assert!(std::error::Error::source(&copy).is_none());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn code_serializes_snake_case() {
        let json = serde_json::to_string(&ProviderErrorCode::SlotConflictRejection).unwrap();
        assert_eq!(json, "\"slot_conflict_rejection\"");
    }
}
