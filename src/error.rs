use std::collections::BTreeMap;
use std::fmt;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Authentication or request-construction failure.
    ///
    /// Raised before anything is sent: empty tokens, malformed key
    /// material, missing base URL or identifiers. Never retried.
    #[error("auth error: {0}")]
    Auth(String),
    /// The network layer produced no HTTP response (connect, DNS,
    /// timeout, or retry exhaustion).
    #[error("transport error: {0}")]
    Transport(String),
    /// An HTTP error response that was not retried.
    #[error(transparent)]
    Api(ApiError),
    /// A successful payload did not match the shape an endpoint promises.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    /// HTTP status of an [`ClientError::Api`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns the API error payload, if this is one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

/// A received HTTP error response (status >= 400).
#[derive(Clone, Debug, PartialEq)]
pub struct ApiError {
    /// Human-readable message; `"API request failed"` when the body had none.
    pub message: String,
    /// HTTP status code.
    pub status: u16,
    /// Platform error code from the `error_code` body field.
    pub error_code: Option<String>,
    /// Structured `detail` body field.
    pub detail: Option<serde_json::Value>,
    /// Response headers, names lower-cased.
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body, or a JSON string holding the raw text.
    pub body: serde_json::Value,
}

impl ApiError {
    pub const DEFAULT_MESSAGE: &'static str = "API request failed";

    /// Builds an error from a status, captured headers and the raw body text.
    ///
    /// A JSON body contributes `message`, `error_code` and `detail`; any
    /// other body is kept verbatim and used as the message.
    pub fn from_parts(status: u16, headers: BTreeMap<String, String>, text: String) -> Self {
        let mut message = text.clone();
        let mut error_code = None;
        let mut detail = None;

        let body = match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(parsed) => {
                if let Some(found) = parsed.get("message").and_then(|v| v.as_str()) {
                    message = found.to_owned();
                }
                error_code = parsed.get("error_code").and_then(|v| match v {
                    serde_json::Value::String(code) => Some(code.clone()),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                });
                detail = parsed.get("detail").filter(|v| !v.is_null()).cloned();
                parsed
            }
            Err(_) => serde_json::Value::String(text),
        };

        if message.trim().is_empty() {
            message = Self::DEFAULT_MESSAGE.to_owned();
        }

        Self {
            message,
            status,
            error_code,
            detail,
            headers,
            body,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "api error {}: {}", self.status, self.message)?;
        if let Some(code) = &self.error_code {
            write!(f, " ({code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::{ApiError, ClientError};

    #[test]
    fn json_body_fields_are_extracted() {
        let body = json!({
            "message": "resource missing",
            "error_code": "not_found",
            "detail": {"key": "home"}
        });
        let err = ApiError::from_parts(404, BTreeMap::new(), body.to_string());

        assert_eq!(err.message, "resource missing");
        assert_eq!(err.error_code.as_deref(), Some("not_found"));
        assert_eq!(err.detail, Some(json!({"key": "home"})));
        assert_eq!(err.body, body);
    }

    #[test]
    fn plain_text_body_is_kept_as_message() {
        let err = ApiError::from_parts(502, BTreeMap::new(), "bad gateway".to_owned());
        assert_eq!(err.message, "bad gateway");
        assert_eq!(err.body, json!("bad gateway"));
        assert!(err.error_code.is_none());
    }

    #[test]
    fn empty_body_falls_back_to_default_message() {
        let err = ApiError::from_parts(500, BTreeMap::new(), String::new());
        assert_eq!(err.message, ApiError::DEFAULT_MESSAGE);
        assert_eq!(err.body, json!(""));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut headers = BTreeMap::new();
        headers.insert("x-request-id".to_owned(), "abc".to_owned());
        let err = ApiError::from_parts(400, headers, "{}".to_owned());
        assert_eq!(err.header("X-Request-Id"), Some("abc"));
    }

    #[test]
    fn status_helpers() {
        let err = ClientError::from(ApiError::from_parts(404, BTreeMap::new(), String::new()));
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(!ClientError::Transport("x".into()).is_not_found());
        assert!(ClientError::Auth("x".into()).is_auth());
    }
}
