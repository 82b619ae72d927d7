use thiserror::Error;

use crate::types::ErrorResponse;

/// Errors raised by the typed API client.
///
/// Transport failures and non-2xx responses are separate variants, but both
/// flatten to a single message when displayed, matching what the hosted API
/// returns to callers that only look at the string.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a status outside 2xx.
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never completed (DNS, TLS, connection reset, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A 2xx body that could not be decoded into the expected type.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request body that could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header: {0}")]
    Header(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// HTTP status for protocol failures, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The structured `{"error", "message"}` payload of a status error, when
    /// the body carries one.
    pub fn error_response(&self) -> Option<ErrorResponse> {
        match self {
            Self::Status { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message_embeds_code_and_body() {
        let err = ApiError::Status { status: 422, body: "{\"error\":\"bad ttl\"}".into() };
        assert_eq!(err.to_string(), "API error 422: {\"error\":\"bad ttl\"}");
        assert_eq!(err.status(), Some(422));
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn unauthorized_is_detected_from_status() {
        let err = ApiError::Status { status: 401, body: String::new() };
        assert!(err.is_unauthorized());
    }

    #[test]
    fn status_body_decodes_to_error_response() {
        let err = ApiError::Status { status: 422, body: "{\"error\":\"invalid_ttl\",\"message\":\"ttl too long\"}".into() };
        let payload = err.error_response().unwrap();
        assert_eq!(payload.error, "invalid_ttl");
        assert_eq!(payload.message, "ttl too long");

        let plain = ApiError::Status { status: 502, body: "Bad Gateway".into() };
        assert_eq!(plain.error_response(), None);
        assert_eq!(ApiError::Storage("x".into()).error_response(), None);
    }

    #[test]
    fn non_http_errors_have_no_status() {
        let err = ApiError::Storage("disk full".into());
        assert_eq!(err.status(), None);
    }
}
