use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, ensure_decimal_positive, map_service_error, no_content_response,
    success_response, validate_input,
};
use crate::services::promotions::{CreatePromotionInput, UpdatePromotionInput};
use crate::AppState;

pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promotions).post(create_promotion))
        .route(
            "/:id",
            get(get_promotion)
                .put(update_promotion)
                .delete(delete_promotion),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/promotions",
    responses((status = 200, description = "All promotions, newest first", body = Object)),
    security(("Bearer" = [])),
    tag = "Admin: Promotions"
)]
pub async fn list_promotions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let promotions = state
        .services
        .promotions
        .list_promotions()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(promotions))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/promotions",
    request_body = CreatePromotionInput,
    responses(
        (status = 201, description = "Promotion created", body = Object),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Promotions"
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    Json(payload): Json<CreatePromotionInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    ensure_decimal_positive(&payload.value, "value")?;
    let promotion = state
        .services
        .promotions
        .create_promotion(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(promotion))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/promotions/:id",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    responses(
        (status = 200, description = "Promotion", body = Object),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Promotions"
)]
pub async fn get_promotion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let promotion = state
        .services
        .promotions
        .get_promotion(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(promotion))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/promotions/:id",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    request_body = UpdatePromotionInput,
    responses(
        (status = 200, description = "Promotion updated", body = Object),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Promotions"
)]
pub async fn update_promotion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePromotionInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    if let Some(value) = payload.value.as_ref() {
        ensure_decimal_positive(value, "value")?;
    }
    let promotion = state
        .services
        .promotions
        .update_promotion(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(promotion))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/promotions/:id",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    responses(
        (status = 204, description = "Promotion deleted"),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Promotions"
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .promotions
        .delete_promotion(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
