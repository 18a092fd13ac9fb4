//! HTTP error response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use clipflow_core::AppError;

/// Wrapper so the external `IntoResponse` trait can be implemented for the
/// core error type.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

pub(crate) fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Payload(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::Database(_)
        | AppError::Broker(_)
        | AppError::Storage(_)
        | AppError::Transcode(_)
        | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }

        let msg = if status.is_server_error() {
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(serde_json::json!({ "msg": msg }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            status_for(&AppError::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AppError::NotFound("missing".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AppError::Unauthorized("no".into())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn infrastructure_errors_map_to_500() {
        assert_eq!(
            status_for(&AppError::Broker("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&AppError::Database(sqlx::Error::PoolClosed)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
