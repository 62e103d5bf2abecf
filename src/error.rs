use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::model::leave_request::{Decision, LeaveStatus};

/// Failures reported by a repository adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row changed, a unique key collided, or the database gave up on a lock.
    #[error("record changed concurrently")]
    Conflict,

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("record not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// MySQL: 1062 duplicate key, 1205 lock wait timeout, 1213 deadlock.
const CONFLICT_ERROR_NUMBERS: [u16; 3] = [1062, 1205, 1213];

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            let is_conflict = db_err
                .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                .map(|my| CONFLICT_ERROR_NUMBERS.contains(&my.number()))
                .unwrap_or(false);
            if is_conflict || db_err.code().as_deref() == Some("40001") {
                return StoreError::Conflict;
            }
        }
        StoreError::Database(e)
    }
}

#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("Start date must be before end date")]
    InvalidRange,

    #[error("Employee does not exist")]
    EmployeeNotFound,

    #[error("Leave request overlaps with an existing leave")]
    OverlappingRequest,

    #[error("Leave request not found")]
    NotFound,

    #[error("You cannot {action} your own leave")]
    SelfActionForbidden { action: Decision },

    #[error("Cannot {action} leave that is already {current}")]
    InvalidStateTransition {
        action: Decision,
        current: LeaveStatus,
    },

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Leave request was modified concurrently, please retry")]
    ConcurrentConflict,

    #[error("You are not allowed to view this leave request")]
    AccessDenied,

    #[error("Something went wrong, Contact with system admin")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for LeaveError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => LeaveError::ConcurrentConflict,
            StoreError::NotFound => LeaveError::NotFound,
            other => LeaveError::Storage(other),
        }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::InvalidRange | LeaveError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            LeaveError::SelfActionForbidden { .. } | LeaveError::AccessDenied => {
                StatusCode::FORBIDDEN
            }
            LeaveError::NotFound | LeaveError::EmployeeNotFound => StatusCode::NOT_FOUND,
            LeaveError::OverlappingRequest
            | LeaveError::InvalidStateTransition { .. }
            | LeaveError::ConcurrentConflict => StatusCode::CONFLICT,
            LeaveError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let LeaveError::Storage(source) = self {
            tracing::error!(error = %source, "Leave storage failure");
        }

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_failures_to_status_codes() {
        let cases = [
            (LeaveError::InvalidRange, StatusCode::BAD_REQUEST),
            (
                LeaveError::ValidationFailed("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (LeaveError::EmployeeNotFound, StatusCode::NOT_FOUND),
            (LeaveError::NotFound, StatusCode::NOT_FOUND),
            (
                LeaveError::SelfActionForbidden {
                    action: Decision::Approve,
                },
                StatusCode::FORBIDDEN,
            ),
            (LeaveError::AccessDenied, StatusCode::FORBIDDEN),
            (LeaveError::OverlappingRequest, StatusCode::CONFLICT),
            (
                LeaveError::InvalidStateTransition {
                    action: Decision::Reject,
                    current: LeaveStatus::Approved,
                },
                StatusCode::CONFLICT,
            ),
            (LeaveError::ConcurrentConflict, StatusCode::CONFLICT),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn storage_errors_hide_backend_text() {
        let err: LeaveError = StoreError::Unavailable("mysql://root:secret@db".into()).into();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn store_conflict_becomes_concurrent_conflict() {
        let err: LeaveError = StoreError::Conflict.into();
        assert!(matches!(err, LeaveError::ConcurrentConflict));
    }
}
