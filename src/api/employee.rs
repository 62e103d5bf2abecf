use crate::api::ApiResponse;
use crate::auth::auth::AuthUser;
use crate::model::employee::Employee;
use crate::service::LeaveService;
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct EmployeeProfile {
    pub employee: Employee,
    /// True when this call created the directory record
    #[schema(example = false)]
    pub created: bool,
}

/// Resolves the caller's employee record, creating it on first use.
#[utoipa::path(
    get,
    path = "/api/employees/me",
    responses(
        (status = 200, description = "Employee record of the caller", body = Object, example = json!({
            "success": true,
            "message": "Employee profile",
            "data": {
                "employee": { "id": 1, "name": "john.doe", "email": "john.doe@company.com" },
                "created": false
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Token carries no email")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn me(
    auth: AuthUser,
    service: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    let provisioned = service.directory().resolve_or_provision(&auth).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Employee profile",
        EmployeeProfile {
            employee: provisioned.employee,
            created: provisioned.created,
        },
    )))
}
