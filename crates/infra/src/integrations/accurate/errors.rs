//! Error taxonomy for ERP calls.

use std::fmt;

use serde_json::Value;
use storefront_common::error::{ErrorClassification, ErrorSeverity};
use storefront_common::resilience::SchedulerError;
use storefront_domain::StorefrontError;
use thiserror::Error;

/// Body of a failed upstream response, parsed when it is JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    /// Body parsed as JSON
    Json(Value),
    /// Body that is not JSON
    Text(String),
}

impl UpstreamBody {
    /// Parse `raw` as JSON, keeping the text when it is not.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).map_or_else(|_| Self::Text(raw.to_string()), Self::Json)
    }

    /// The ERP's own message: `d` of an envelope, `error_description` /
    /// `error` of an auth failure, or the whole body otherwise.
    pub fn message(&self) -> String {
        match self {
            Self::Json(Value::Object(map)) => {
                for key in ["d", "error_description", "error", "message"] {
                    match map.get(key) {
                        Some(Value::String(text)) if !text.is_empty() => return text.clone(),
                        Some(Value::Array(items)) if !items.is_empty() => {
                            return items
                                .iter()
                                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                                .collect::<Vec<_>>()
                                .join("; ");
                        }
                        _ => {}
                    }
                }
                self.to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for UpstreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Failure of an ERP operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccurateError {
    /// Missing or unusable secrets/settings; retrying cannot help
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Host discovery failed
    #[error("token verification failed{}: {body}", status_suffix(.status))]
    TokenVerification {
        /// HTTP status, absent when no response arrived
        status: Option<u16>,
        /// Upstream body or a description of what was wrong with it
        body: String,
    },

    /// The ERP answered with a non-2xx status, or with `s: false`
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status; 200 for an `s: false` envelope
        status: u16,
        /// Response body as received
        body: UpstreamBody,
    },

    /// Transport failure before a response arrived
    #[error("network error: {0}")]
    Network(String),

    /// Caller input rejected before anything was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A 2xx response that does not have the expected shape
    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    /// The request scheduler could not run the task
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}

impl AccurateError {
    /// Upstream rejected the credentials or the signature (401/403).
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Upstream { status: 401 | 403, .. })
            || matches!(self, Self::TokenVerification { status: Some(401 | 403), .. })
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::TokenVerification { status, .. } => *status,
            _ => None,
        }
    }
}

impl ErrorClassification for AccurateError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Configuration(_) => ErrorSeverity::Critical,
            Self::Network(_) => ErrorSeverity::Warning,
            Self::Upstream { status, .. } if *status >= 500 => ErrorSeverity::Warning,
            Self::InvalidRequest(_) => ErrorSeverity::Info,
            Self::Scheduler(err) => err.severity(),
            _ => ErrorSeverity::Error,
        }
    }
}

impl From<StorefrontError> for AccurateError {
    fn from(value: StorefrontError) -> Self {
        match value {
            StorefrontError::Config(msg) => Self::Configuration(msg),
            StorefrontError::InvalidInput(msg) => Self::InvalidRequest(msg),
            StorefrontError::Network(msg)
            | StorefrontError::Auth(msg)
            | StorefrontError::NotFound(msg)
            | StorefrontError::Internal(msg) => Self::Network(msg),
        }
    }
}

impl From<AccurateError> for StorefrontError {
    fn from(value: AccurateError) -> Self {
        let message = value.to_string();
        match value {
            AccurateError::Configuration(_) => Self::Config(message),
            AccurateError::TokenVerification { .. } => Self::Auth(message),
            AccurateError::Upstream { status, .. } => match status {
                401 | 403 => Self::Auth(message),
                404 => Self::NotFound(message),
                400..=499 => Self::InvalidInput(message),
                _ => Self::Network(message),
            },
            AccurateError::Network(_) => Self::Network(message),
            AccurateError::InvalidRequest(_) => Self::InvalidInput(message),
            AccurateError::Decode(_) | AccurateError::Scheduler(_) => Self::Internal(message),
        }
    }
}
