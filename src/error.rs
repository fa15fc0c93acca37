use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    dao::storage::StorageError,
    state::session::{CorruptState, SessionError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The session state machine rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Storage backend refused a concurrent write.
    #[error("storage conflict")]
    Conflict(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// The persisted state violates session invariants.
    #[error(transparent)]
    Corrupt(#[from] CorruptState),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            conflict @ StorageError::Conflict { .. } => ServiceError::Conflict(conflict),
            other => ServiceError::Unavailable(other),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Session(session) => match session {
                SessionError::NotFound(_) => AppError::NotFound(session.to_string()),
                SessionError::CapacityExceeded | SessionError::GameConcluded { .. } => {
                    AppError::Conflict(session.to_string())
                }
            },
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Conflict(source) => AppError::Conflict(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Corrupt(corrupt) => AppError::Internal(corrupt.to_string()),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

/// JSON body returned with every error status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_rejections_map_to_client_errors() {
        let not_found: AppError = ServiceError::from(SessionError::NotFound(4)).into();
        assert!(matches!(not_found, AppError::NotFound(_)));

        let full: AppError = ServiceError::from(SessionError::CapacityExceeded).into();
        assert_eq!(full.into_response().status(), StatusCode::CONFLICT);

        let over: AppError = ServiceError::from(SessionError::GameConcluded { winner: 1 }).into();
        assert_eq!(over.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn storage_conflicts_stay_conflicts() {
        let err = ServiceError::from(StorageError::conflict("rev mismatch"));
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn infrastructure_failures_are_unavailable() {
        for err in [ServiceError::Degraded, ServiceError::Timeout] {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }
}
