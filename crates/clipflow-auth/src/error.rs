//! HTTP error response conversion for the auth service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use clipflow_core::AppError;

#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput(_) | AppError::Payload(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
            (status, Json(serde_json::json!({ "msg": "internal server error" }))).into_response()
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
            (status, Json(serde_json::json!({ "msg": self.0.to_string() }))).into_response()
        }
    }
}
