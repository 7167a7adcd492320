use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::backend::BackendError;
use crate::render::RenderError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(value: RenderError) -> Self {
        match value {
            RenderError::ProfessorsNotLoaded => ApiError::NotFound(value.to_string()),
            RenderError::MissingWeeklySchedule => ApiError::Internal(value.to_string()),
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(value: BackendError) -> Self {
        error!("Backend error: {value}");
        match value {
            BackendError::Url(_) => ApiError::Internal("Backend URL is misconfigured".into()),
            _ => ApiError::BadGateway("Scheduling service request failed".into()),
        }
    }
}
