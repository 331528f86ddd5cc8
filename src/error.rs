use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures of the thumbnail generation pipeline that the user needs to see.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No channel suggestions were produced for this persona")]
    NoChannelSuggestions,

    #[error("None of the {attempted} suggested channels could be resolved")]
    NoChannelsResolved { attempted: usize },

    #[error("No videos could be fetched from {channels} resolved channels")]
    NoVideosFetched { channels: usize },
}

/// Errors from the language-model HTTP clients.
#[derive(Error, Debug, Clone)]
pub enum AiError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Model returned no text")]
    EmptyResponse,
}

/// Error type returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Pipeline(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Database details stay in the logs
        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            other => {
                if status.is_server_error() {
                    tracing::error!("{}", other);
                } else {
                    tracing::warn!("{}", other);
                }
                other.to_string()
            }
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::NotFound("missing".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(PipelineError::NoChannelsResolved { attempted: 3 }).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_pipeline_messages() {
        let err = PipelineError::NoVideosFetched { channels: 2 };
        assert_eq!(err.to_string(), "No videos could be fetched from 2 resolved channels");
    }
}
