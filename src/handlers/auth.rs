use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{AuthRouterExt, AuthUser, TokenResponse, UserSummary};
use crate::entities::user::UserRole;
use crate::errors::{ApiError, ServiceError};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::AppState;

/// Login request payload
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Register request payload
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

pub fn auth_routes() -> Router<AppState> {
    let session = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_auth();

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(session)
}

/// Create a customer account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = crate::ApiResponse<UserSummary>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let account = state
        .services
        .auth
        .create_user(
            &payload.email,
            &payload.name,
            &payload.password,
            UserRole::Customer,
        )
        .await
        .map_err(|e| map_service_error(ServiceError::from(e)))?;

    info!(user_id = %account.id, "Customer registered");
    Ok(created_response(UserSummary::from(account)))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = crate::ApiResponse<TokenResponse>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let token = state
        .services
        .auth
        .login(&payload.email, &payload.password)
        .await
        .map_err(|e| map_service_error(ServiceError::from(e)))?;
    Ok(success_response(token))
}

/// End the current session
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn logout(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .auth
        .logout(user.session_id)
        .await
        .map_err(|e| map_service_error(ServiceError::from(e)))?;
    Ok(no_content_response())
}

/// The authenticated account
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = crate::ApiResponse<UserSummary>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn me(user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .services
        .auth
        .current_user(user.user_id)
        .await
        .map_err(|e| map_service_error(ServiceError::from(e)))?;
    Ok(success_response(UserSummary::from(account)))
}
