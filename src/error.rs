use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

pub const RATE_LIMITED_DETAIL: &str =
    "Rate limit or quota exceeded with the AI provider. Check billing/quotas or try again later.";
pub const UNAVAILABLE_DETAIL: &str = "Could not reach the AI service. Please try again in a moment.";
pub const UNEXPECTED_LLM_DETAIL: &str = "Unexpected error while calling the AI service.";

/// Body of every failed response: `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    UnsupportedMedia(String),

    #[error("Failed to fetch page: {0}")]
    FetchError(String),

    #[error("{}", RATE_LIMITED_DETAIL)]
    RateLimited,

    #[error("{}", UNAVAILABLE_DETAIL)]
    LlmUnavailable,

    #[error("OpenAI error: {message}")]
    Upstream { status: u16, message: String },

    #[error("{}", UNEXPECTED_LLM_DETAIL)]
    LlmError(String),

    #[error("Request processing timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::FetchError(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::LlmUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::LlmError(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::FetchError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_keeps_provider_status() {
        let err = AppError::Upstream { status: 401, message: "bad key".into() };
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "OpenAI error: bad key");
    }

    #[test]
    fn upstream_with_invalid_status_is_bad_gateway() {
        let err = AppError::Upstream { status: 42, message: "odd".into() };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn llm_error_hides_internal_message() {
        let err = AppError::LlmError("missing choices".into());
        assert_eq!(err.to_string(), UNEXPECTED_LLM_DETAIL);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
