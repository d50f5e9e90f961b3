use serde::{Deserialize, Serialize};
use std::fmt;

pub mod chunk;
pub mod deliver;
pub mod identity;
pub mod payload;

pub use chunk::{chunk, Chunks, MESSAGE_CHAR_LIMIT};
pub use deliver::{deliver, ChunkOutcome, DeliveryReport, FailurePolicy};
pub use identity::{IdentityPolicy, WebhookIdentity, DEFAULT_API_BASE};
pub use payload::{
    Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia, MessagePayload, WebhookInfo,
    WebhookKind, WebhookUpdate,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("malformed webhook identity: {0}")]
    MalformedIdentity(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("transport failed: {0}")]
    Transport(#[source] BoxError),
    #[error("read failed: {0}")]
    Read(String),
}

impl Error {
    pub fn transport(e: impl Into<BoxError>) -> Self {
        Self::Transport(e.into())
    }

    /// The structured service rejection, if this error is one.
    pub fn as_service(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Structured failure returned by the webhook API for a non-success status.
///
/// Rate-limit responses carry no `code`, so it defaults to 0; `message` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceError {
    #[serde(skip)]
    pub http_status: u16,
    #[serde(default)]
    pub code: u64,
    pub message: String,
    /// Seconds to wait before retrying, sent with HTTP 429.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
}

impl ServiceError {
    /// Decode a response body, stamping the HTTP status the body arrived with.
    pub fn from_body(http_status: u16, body: &[u8]) -> serde_json::Result<Self> {
        let mut e: ServiceError = serde_json::from_slice(body)?;
        e.http_status = http_status;
        Ok(e)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.http_status == 429
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service rejected request (HTTP {}, code {}): {}",
            self.http_status, self.code, self.message
        )
    }
}

impl std::error::Error for ServiceError {}

/// One webhook endpoint, addressed by the identity the backend was built with.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait::async_trait]
pub trait WebhookBackend: Send + Sync {
    async fn send_message(&self, payload: &MessagePayload) -> Result<()>;

    async fn send_file(&self, file: &[u8], filename: &str, payload: &MessagePayload)
        -> Result<()>;

    async fn fetch(&self) -> Result<WebhookInfo>;

    async fn update(&self, update: &WebhookUpdate) -> Result<WebhookInfo>;

    async fn remove(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_decodes_empty_message_body() {
        let body = br#"{"code": 50006, "message": "Cannot send an empty message"}"#;
        let e = ServiceError::from_body(400, body).unwrap();
        assert_eq!(e.http_status, 400);
        assert_eq!(e.code, 50006);
        assert_eq!(e.message, "Cannot send an empty message");
        assert!(!e.is_rate_limited());
    }

    #[test]
    fn service_error_decodes_rate_limit_body_without_code() {
        let body = br#"{"message": "You are being rate limited.", "retry_after": 0.64, "global": false}"#;
        let e = ServiceError::from_body(429, body).unwrap();
        assert_eq!(e.code, 0);
        assert_eq!(e.retry_after, Some(0.64));
        assert!(e.is_rate_limited());
    }

    #[test]
    fn service_error_rejects_bodies_without_message() {
        assert!(ServiceError::from_body(500, b"").is_err());
        assert!(ServiceError::from_body(500, b"<html>bad gateway</html>").is_err());
        assert!(ServiceError::from_body(500, br#"{"code": 1}"#).is_err());
        assert!(ServiceError::from_body(500, b"[1,2,3]").is_err());
    }

    #[test]
    fn error_display_includes_service_fields() {
        let e = Error::from(ServiceError {
            http_status: 400,
            code: 50006,
            message: "Cannot send an empty message".to_string(),
            retry_after: None,
        });
        let s = e.to_string();
        assert!(s.contains("HTTP 400"), "{s}");
        assert!(s.contains("50006"), "{s}");
        assert_eq!(e.as_service().map(|s| s.code), Some(50006));
    }

    #[test]
    fn transport_error_keeps_its_source() {
        use std::error::Error as _;
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e = Error::transport(io);
        assert!(e.source().is_some());
        assert!(e.to_string().starts_with("transport failed"));
    }
}
