pub mod employee;
pub mod leave_request;

use serde::Serialize;

/// Success envelope shared by every API handler. Failures use the
/// `{success, message}` body produced by `LeaveError`.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}
