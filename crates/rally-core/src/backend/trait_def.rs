//! The `GenerativeBackend` trait and its request and error types.

use async_trait::async_trait;
use thiserror::Error;

/// One prompt for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Ask the backend to constrain its output to JSON.
    pub json_output: bool,
}

impl GenerationRequest {
    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_output: true,
        }
    }
}

/// Failure of a backend call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Network error or timeout talking to the backend.
    #[error("backend unreachable: {0}")]
    Network(String),

    /// Quota or rate limit exhausted (HTTP 429).
    #[error("backend quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The backend failed on its side (HTTP 5xx).
    #[error("backend server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The backend refused the request (HTTP 4xx other than 429).
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A successful response with no usable text (blocked, empty candidates).
    #[error("backend returned no text: {0}")]
    EmptyResponse(String),
}

impl BackendError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::QuotaExceeded(_) | Self::Server { .. }
        )
    }
}

/// A text generation service.
///
/// Object-safe so the server can hold an `Arc<dyn GenerativeBackend>`.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short identifier for logs (e.g. "gemini").
    fn name(&self) -> &str;

    /// Run one generation and return the raw response text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn GenerativeBackend) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(BackendError::Network("reset".into()).is_transient());
        assert!(BackendError::QuotaExceeded("slow down".into()).is_transient());
        assert!(
            BackendError::Server {
                status: 503,
                message: "overloaded".into()
            }
            .is_transient()
        );
        assert!(
            !BackendError::Rejected {
                status: 400,
                message: "bad prompt".into()
            }
            .is_transient()
        );
        assert!(!BackendError::EmptyResponse("SAFETY".into()).is_transient());
    }

    #[test]
    fn json_request_sets_flag() {
        let r = GenerationRequest::json("hello");
        assert!(r.json_output);
        assert_eq!(r.prompt, "hello");
    }
}
