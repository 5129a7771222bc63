//! Api - Error contract of the remote management API
//!
//! Every remote call either succeeds with a response document or fails with an
//! [`ApiError`] carrying a dotted error code (e.g., `InvalidParameter.Name`).
//! The [`ErrorClassifier`] turns those codes into apply-loop outcomes.

use std::collections::HashSet;

use thiserror::Error;

use crate::provider::ProviderError;
use crate::retry::Attempt;

/// Code used when the transport itself failed before the API answered
pub const NETWORK_ERROR: &str = "ClientError.NetworkError";

/// Code used when a response could not be encoded or decoded
pub const PARSE_ERROR: &str = "ClientError.ParseError";

/// Error returned by a remote API call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "[ApiError] Code={code}, Message={message}, RequestId={}",
    .request_id.as_deref().unwrap_or("")
)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(NETWORK_ERROR, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(PARSE_ERROR, message)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// True if the code equals `family` or belongs to it (`family.Sub`)
    pub fn is_code(&self, family: &str) -> bool {
        code_matches(&self.code, family)
    }
}

fn code_matches(code: &str, family: &str) -> bool {
    code == family
        || code
            .strip_prefix(family)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Code families that never succeed on retry
pub const DEFAULT_PERMANENT_CODES: &[&str] = &[
    "AuthFailure",
    PARSE_ERROR,
    "FailedOperation.QueryFailed",
    "InvalidAction",
    "InvalidParameter",
    "InvalidParameterValue",
    "MissingParameter",
    "ResourceNotFound",
    "UnauthorizedOperation",
    "UnknownParameter",
    "UnsupportedOperation",
];

/// Splits remote errors into retryable and permanent
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    permanent: HashSet<String>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PERMANENT_CODES.iter().copied())
    }
}

impl ErrorClassifier {
    pub fn new<I, S>(permanent: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permanent: permanent.into_iter().map(Into::into).collect(),
        }
    }

    fn is_permanent(&self, err: &ApiError) -> bool {
        self.permanent.iter().any(|family| err.is_code(family))
    }

    /// Classify a failed attempt
    pub fn classify<T>(&self, err: ApiError) -> Attempt<T> {
        self.classify_with(err, &[])
    }

    /// Classify a failed attempt, forcing `extra_retryable` codes to be retried
    /// even when they belong to a permanent family
    pub fn classify_with<T>(&self, err: ApiError, extra_retryable: &[&str]) -> Attempt<T> {
        let retry =
            extra_retryable.iter().any(|code| err.is_code(code)) || !self.is_permanent(&err);
        if retry {
            log::debug!("retryable error: {}", err);
            Attempt::Retry(ProviderError::from(err))
        } else {
            log::error!("[CRITICAL] non-retryable error: {}", err);
            Attempt::Fatal(ProviderError::from(err))
        }
    }
}
