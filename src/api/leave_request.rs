use std::str::FromStr;

use crate::api::ApiResponse;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveDetail, LeaveQuery, LeaveStatus};
use crate::service::{ApplyLeave, LeavePage, LeaveService};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ApplyLeaveRequest {
    #[schema(example = "2026-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    /// Exclusive: the first day back at work
    #[schema(example = "2026-06-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "family trip")]
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectLeaveRequest {
    #[schema(example = "scheduling conflict")]
    #[serde(default)]
    pub rejection_reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveResponse {
    #[schema(example = 1)]
    /// leave application id
    pub id: u64,
    /// employee who applied
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub employee: Option<Employee>,
    #[schema(example = "2026-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-06-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "family trip")]
    pub reason: String,
    pub status: LeaveStatus,
    /// employee who decided the request
    #[schema(example = 1001)]
    pub approved_by: Option<u64>,
    pub approved_by_employee: Option<Employee>,
    #[schema(example = "2026-05-20T09:30:00Z", format = "date-time", value_type = Option<String>)]
    pub approved_date: Option<DateTime<Utc>>,
    #[schema(example = "scheduling conflict")]
    pub rejection_reason: Option<String>,
    #[schema(example = "2026-05-18T08:00:00Z", format = "date-time", value_type = String)]
    pub created_date: DateTime<Utc>,
    #[schema(example = "2026-05-20T09:30:00Z", format = "date-time", value_type = Option<String>)]
    pub updated_date: Option<DateTime<Utc>>,
}

impl From<LeaveDetail> for LeaveResponse {
    fn from(detail: LeaveDetail) -> Self {
        let leave = detail.leave;
        Self {
            id: leave.id,
            employee_id: leave.employee_id,
            employee: detail.employee,
            start_date: leave.start_date,
            end_date: leave.end_date,
            reason: leave.reason,
            status: leave.status,
            approved_by: leave.approved_by,
            approved_by_employee: detail.approver,
            approved_date: leave.approved_date,
            rejection_reason: leave.rejection_reason,
            created_date: leave.created_date,
            updated_date: leave.updated_date,
        }
    }
}

fn to_responses(details: Vec<LeaveDetail>) -> Vec<LeaveResponse> {
    details.into_iter().map(LeaveResponse::from).collect()
}

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "data": [
        {
            "id": 1,
            "employee_id": 1000,
            "employee": { "id": 1000, "name": "john.doe", "email": "john.doe@company.com" },
            "start_date": "2026-06-01",
            "end_date": "2026-06-05",
            "reason": "family trip",
            "status": "Pending",
            "approved_by": null,
            "approved_by_employee": null,
            "approved_date": null,
            "rejection_reason": null,
            "created_date": "2026-05-18T08:00:00Z",
            "updated_date": null
        }
    ],
    "page": 1,
    "per_page": 10,
    "total": 1
}))]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

impl From<LeavePage> for LeaveListResponse {
    fn from(page: LeavePage) -> Self {
        Self {
            data: to_responses(page.data),
            page: page.page,
            per_page: page.per_page,
            total: page.total,
        }
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "Pending")]
    /// Filter by leave status (Pending, Approved, Rejected)
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Items per page, at most 100
    pub per_page: Option<u64>,
}

impl LeaveFilter {
    fn to_query(&self) -> Result<LeaveQuery, LeaveError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(LeaveStatus::from_str(raw).map_err(|_| {
                LeaveError::ValidationFailed(format!("Unknown leave status: {raw}"))
            })?),
        };

        Ok(LeaveQuery {
            employee_id: self.employee_id,
            status,
        })
    }
}

/* =========================
Apply for leave
========================= */
#[utoipa::path(
    post,
    path = "/api/leaves/apply",
    request_body(
        content = ApplyLeaveRequest,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "success": true,
            "message": "Leave request submitted",
            "data": { "id": 1, "employee_id": 1000, "status": "Pending" }
        })),
        (status = 400, description = "Start date is not before end date", body = Object, example = json!({
            "success": false,
            "message": "Start date must be before end date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Overlaps an existing request", body = Object, example = json!({
            "success": false,
            "message": "Leave request overlaps with an existing leave"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn apply_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<ApplyLeaveRequest>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let detail = service
        .apply_leave(
            &auth,
            ApplyLeave {
                start_date: payload.start_date,
                end_date: payload.end_date,
                reason: payload.reason,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(
        "Leave request submitted",
        LeaveResponse::from(detail),
    )))
}

/* =========================
Caller's own requests
========================= */
#[utoipa::path(
    get,
    path = "/api/leaves/my",
    responses(
        (status = 200, description = "Caller's leave requests, newest first", body = Object, example = json!({
            "success": true,
            "message": "Leave requests",
            "data": []
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    service: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    let leaves = service.get_my_leaves(&auth).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Leave requests", to_responses(leaves))))
}

/* =========================
Pending queue (Manager)
========================= */
#[utoipa::path(
    get,
    path = "/api/leaves/pending",
    responses(
        (status = 200, description = "Pending requests, earliest start first", body = Object, example = json!({
            "success": true,
            "message": "Pending leave requests",
            "data": []
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn pending_leaves(
    auth: AuthUser,
    service: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let leaves = service.get_pending_leaves().await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Pending leave requests",
        to_responses(leaves),
    )))
}

/* =========================
Approve leave (Manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/leaves/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "success": true,
            "message": "Leave approved",
            "data": { "id": 1, "status": "Approved", "approved_by": 1001 }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a manager, or own request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already decided", body = Object, example = json!({
            "success": false,
            "message": "Cannot approve leave that is already Approved"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let detail = service.approve_leave(path.into_inner(), &auth).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Leave approved",
        LeaveResponse::from(detail),
    )))
}

/* =========================
Reject leave (Manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/leaves/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body(
        content = RejectLeaveRequest,
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "success": true,
            "message": "Leave rejected",
            "data": { "id": 1, "status": "Rejected", "rejection_reason": "scheduling conflict" }
        })),
        (status = 400, description = "Rejection reason missing"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a manager, or own request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: web::Json<RejectLeaveRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let detail = service
        .reject_leave(path.into_inner(), &auth, &payload.rejection_reason)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Leave rejected",
        LeaveResponse::from(detail),
    )))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leaves/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = Object, example = json!({
            "success": true,
            "message": "Leave request",
            "data": { "id": 1, "employee_id": 1000, "status": "Pending" }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Request belongs to someone else"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "success": false,
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let detail = service.get_leave(path.into_inner(), &auth).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Leave request", LeaveResponse::from(detail))))
}

#[utoipa::path(
    delete,
    path = "/api/leaves/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to delete")
    ),
    responses(
        (status = 200, description = "Leave request deleted", body = Object, example = json!({
            "success": true,
            "message": "Leave request deleted",
            "data": null
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    service.delete_leave(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Leave request deleted", ())))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leaves",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let filter = query.to_query()?;
    let page = service
        .list_leaves(&filter, query.page, query.per_page)
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse::from(page)))
}
