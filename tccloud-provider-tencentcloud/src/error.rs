use tccloud_core::provider::ProviderError;
use tccloud_core::waiter::CheckError;

use crate::config::ConfigError;

/// Errors raised while talking to the Tencent Cloud APIs.
///
/// Messages never include credentials.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection failed, timed out, or the body could not be read
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body is not the JSON we expect
    #[error("failed to decode response of {action}: {source}")]
    Decode {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// Business error reported by the vendor
    #[error("[{code}] {message} (request id: {request_id})")]
    Vendor {
        code: String,
        message: String,
        request_id: String,
    },

    /// Non-success HTTP status without a decodable vendor envelope
    #[error("unexpected HTTP status {status}: {body}")]
    Http { status: u16, body: String },

    /// Envelope carried neither an error nor a payload
    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("failed to sign request: {0}")]
    Signing(String),

    /// Request parameters rejected before sending
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

const RETRYABLE_CODES: &[&str] = &[
    "InternalError",
    "RequestLimitExceeded",
    "ResourceInUse",
    "ResourceBusy",
    "FailedOperation.TaskConflict",
    "UnsupportedOperation.LastOperationNotFinished",
];

impl ApiError {
    pub fn vendor(
        code: impl Into<String>,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self::Vendor {
            code: code.into(),
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    /// Vendor error code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Vendor { code, .. } => Some(code),
            _ => None,
        }
    }

    /// The object addressed by the request does not exist
    pub fn is_not_found(&self) -> bool {
        self.code().is_some_and(|code| {
            code.starts_with("ResourceNotFound")
                || code.ends_with(".NotFound")
                || code.ends_with("NotExist")
                || code == "InvalidParameterValue.NotFound"
        })
    }

    /// Transient failure; the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Http { status, .. } => *status == 429 || *status >= 500,
            ApiError::Vendor { code, .. } => RETRYABLE_CODES
                .iter()
                .any(|prefix| code == prefix || code.starts_with(&format!("{}.", prefix))),
            _ => false,
        }
    }

    /// Classification for status checks inside a waiter
    pub fn into_check_error(self) -> CheckError {
        if self.is_retryable() {
            CheckError::Retryable(self.to_string())
        } else {
            CheckError::Fatal(self.to_string())
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        let code = err.code().map(String::from);
        let mut provider_err = ProviderError::new(err.to_string());
        if let Some(code) = code {
            provider_err = provider_err.with_code(code);
        }
        provider_err.with_cause(err)
    }
}

impl From<ApiError> for CheckError {
    fn from(err: ApiError) -> Self {
        err.into_check_error()
    }
}

impl From<ConfigError> for ProviderError {
    fn from(err: ConfigError) -> Self {
        ProviderError::new(err.to_string()).with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_error_display() {
        let err = ApiError::vendor("InvalidParameter", "bad cidr", "req-1");
        assert_eq!(err.to_string(), "[InvalidParameter] bad cidr (request id: req-1)");
    }

    #[test]
    fn test_not_found_codes() {
        for code in [
            "ResourceNotFound",
            "ResourceNotFound.InstanceNotExist",
            "InvalidParameterValue.NotFound",
            "InvalidDisk.NotFound",
            "InvalidInstanceId.NotFound",
        ] {
            assert!(ApiError::vendor(code, "", "").is_not_found(), "{}", code);
        }
        assert!(!ApiError::vendor("InvalidParameter", "", "").is_not_found());
        assert!(!ApiError::EmptyResponse("DescribeVpcs".to_string()).is_not_found());
    }

    #[test]
    fn test_retryable_codes() {
        assert!(ApiError::vendor("InternalError", "", "").is_retryable());
        assert!(ApiError::vendor("InternalError.DbError", "", "").is_retryable());
        assert!(ApiError::vendor("RequestLimitExceeded", "", "").is_retryable());
        assert!(!ApiError::vendor("InternalErrorX", "", "").is_retryable());
        assert!(!ApiError::vendor("AuthFailure.SignatureFailure", "", "").is_retryable());
        assert!(!ApiError::Signing("bad key".to_string()).is_retryable());
        assert!(ApiError::Http { status: 502, body: String::new() }.is_retryable());
        assert!(!ApiError::Http { status: 403, body: String::new() }.is_retryable());
    }

    #[test]
    fn test_check_error_classification() {
        assert!(matches!(
            ApiError::vendor("InternalError", "busy", "r").into_check_error(),
            CheckError::Retryable(_)
        ));
        assert!(matches!(
            ApiError::vendor("AuthFailure", "denied", "r").into_check_error(),
            CheckError::Fatal(_)
        ));
    }

    #[test]
    fn test_conversion_to_provider_error_keeps_code() {
        let err: ProviderError = ApiError::vendor("ResourceInUse", "in use", "r").into();
        assert_eq!(err.code.as_deref(), Some("ResourceInUse"));
        assert!(err.message.contains("in use"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
