use crate::api::employee::EmployeeProfile;
use crate::api::leave_request::{
    ApplyLeaveRequest, LeaveFilter, LeaveListResponse, LeaveResponse, RejectLeaveRequest,
};
use crate::model::employee::Employee;
use crate::model::leave_request::LeaveStatus;
use crate::model::role::Role;
use crate::models::{AuthResponse, LoginReqDto, RegisterReq, UserDto};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave Management

Employees apply for leave over a half-open date range `[start_date, end_date)`;
managers approve or reject pending requests.

### Rules
- A request starts **Pending** and is decided exactly once (**Approved** or **Rejected**).
- Requests of one employee may not overlap unless the older one was rejected.
- Nobody decides their own request.
- A rejection always carries a reason.

### Security
All `/api` endpoints require a **JWT Bearer** token from `/auth/login` or `/auth/register`.
Approving, rejecting, deleting and listing all requests need the **Manager** role.

### Response Format
`{ "success": bool, "message": string, "data": ... }`
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,

        crate::api::employee::me,

        crate::api::leave_request::apply_leave,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::pending_leaves,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            UserDto,
            AuthResponse,
            Role,
            Employee,
            EmployeeProfile,
            LeaveStatus,
            ApplyLeaveRequest,
            RejectLeaveRequest,
            LeaveFilter,
            LeaveResponse,
            LeaveListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Employee", description = "Employee directory APIs"),
        (name = "Leave", description = "Leave management APIs"),
    )
)]
pub struct ApiDoc;
