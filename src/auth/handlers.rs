use std::str::FromStr;

use crate::{
    auth::{
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::StoreError,
    model::{employee::normalize_email, role::Role, user::User},
    models::{AuthResponse, LoginReqDto, RegisterReq, UserDto},
};
use actix_web::{HttpResponse, Responder, http::StatusCode, web};
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

fn failure(message: &str) -> AuthResponse {
    AuthResponse {
        success: false,
        message: message.to_string(),
        token: None,
        user: None,
    }
}

fn issue_token(user: UserDto, config: &Config, status: StatusCode, message: &str) -> HttpResponse {
    match generate_access_token(
        user.id,
        user.username.clone(),
        user.email.clone(),
        user.role,
        &config.jwt_secret,
        config.access_token_ttl,
    ) {
        Ok(token) => HttpResponse::build(status).json(AuthResponse {
            success: true,
            message: message.to_string(),
            token: Some(token),
            user: Some(user),
        }),
        Err(e) => {
            error!(error = %e, "Failed to sign access token");
            HttpResponse::InternalServerError().json(failure("Failed to issue token"))
        }
    }
}

/// Returns the name of the first identity field already taken, if any.
async fn taken_field(
    username: &str,
    email: &str,
    pool: &MySqlPool,
) -> Result<Option<&'static str>, sqlx::Error> {
    let (email_taken, username_taken) = sqlx::query_as::<_, (bool, bool)>(
        r#"
        SELECT
            EXISTS(SELECT 1 FROM users WHERE email = ?),
            EXISTS(SELECT 1 FROM users WHERE username = ?)
        "#,
    )
    .bind(email)
    .bind(username)
    .fetch_one(pool)
    .await?;

    Ok(if email_taken {
        Some("Email")
    } else if username_taken {
        Some("Username")
    } else {
        None
    })
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email or username already exists")
    )
)]
#[instrument(name = "auth_register", skip(payload, pool, config), fields(username = %payload.username))]
pub async fn register(
    payload: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let payload = payload.into_inner();
    let username = payload.username.trim().to_string();
    let email = normalize_email(&payload.email);
    let role = payload.role.unwrap_or(Role::Employee);

    if username.is_empty() || email.is_empty() || payload.password.is_empty() {
        debug!("Validation failed: blank registration field");
        return HttpResponse::BadRequest()
            .json(failure("Username, email and password are required"));
    }

    match taken_field(&username, &email, pool.get_ref()).await {
        Ok(Some(field)) => {
            info!(field, "Registration refused: identity taken");
            return HttpResponse::Conflict().json(failure(&format!("{field} already exists")));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Database error while checking identity");
            return HttpResponse::InternalServerError().json(failure("Failed to register user"));
        }
    }

    let hashed = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            return HttpResponse::InternalServerError().json(failure("Failed to register user"));
        }
    };

    let inserted = sqlx::query(
        r#"INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&username)
    .bind(&email)
    .bind(&hashed)
    .bind(role.as_ref())
    .execute(pool.get_ref())
    .await;

    let user_id = match inserted {
        Ok(done) => done.last_insert_id(),
        Err(e) => {
            return match StoreError::from(e) {
                // lost a race against a concurrent registration
                StoreError::Conflict => HttpResponse::Conflict()
                    .json(failure("Email or username already exists")),
                other => {
                    error!(error = %other, "Failed to insert user");
                    HttpResponse::InternalServerError().json(failure("Failed to register user"))
                }
            };
        }
    };

    info!(user_id, "User registered");

    issue_token(
        UserDto {
            id: user_id,
            username,
            email,
            role,
        },
        &config,
        StatusCode::CREATED,
        "User registered successfully",
    )
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials")
    )
)]
#[instrument(name = "auth_login", skip(pool, config, payload))]
pub async fn login(
    payload: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let email = normalize_email(&payload.email);

    if email.is_empty() || payload.password.is_empty() {
        debug!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().json(failure("Email and password are required"));
    }

    let db_user = match sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, role
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!("Invalid credentials: unknown email");
            return HttpResponse::Unauthorized().json(failure("Invalid credentials"));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().json(failure("Login failed"));
        }
    };

    if let Err(e) = verify_password(&payload.password, &db_user.password_hash) {
        info!(user_id = db_user.id, error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(failure("Invalid credentials"));
    }

    let role = match Role::from_str(&db_user.role) {
        Ok(r) => r,
        Err(_) => {
            error!(user_id = db_user.id, role = %db_user.role, "Stored role is not recognised");
            return HttpResponse::InternalServerError().json(failure("Login failed"));
        }
    };

    info!(user_id = db_user.id, "Login successful");

    issue_token(
        db_user.into_dto(role),
        &config,
        StatusCode::OK,
        "Login successful",
    )
}
