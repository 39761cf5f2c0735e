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
use crate::services::markets::{CreateMarketInput, MarketWithPricing, UpdateMarketInput};
use crate::AppState;

pub fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_markets).post(create_market))
        .route(
            "/:id",
            get(get_market).put(update_market).delete(delete_market),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/markets",
    responses((status = 200, description = "All markets", body = Object)),
    security(("Bearer" = [])),
    tag = "Admin: Markets"
)]
pub async fn list_markets(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let markets = state
        .services
        .markets
        .list_markets(true)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(markets))
}

/// Create a market and generate prices for every product in one transaction
#[utoipa::path(
    post,
    path = "/api/v1/admin/markets",
    request_body = CreateMarketInput,
    responses(
        (status = 201, description = "Market created with prices", body = crate::ApiResponse<MarketWithPricing>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Markets"
)]
pub async fn create_market(
    State(state): State<AppState>,
    Json(payload): Json<CreateMarketInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    ensure_decimal_positive(&payload.exchange_rate, "exchange_rate")?;
    let created = state
        .services
        .markets
        .create_market(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/markets/:id",
    params(("id" = Uuid, Path, description = "Market ID")),
    responses(
        (status = 200, description = "Market", body = Object),
        (status = 404, description = "Market not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Markets"
)]
pub async fn get_market(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let market = state
        .services
        .markets
        .get_market(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(market))
}

/// Update a market; automatic prices are regenerated in the same transaction
#[utoipa::path(
    put,
    path = "/api/v1/admin/markets/:id",
    params(("id" = Uuid, Path, description = "Market ID")),
    request_body = UpdateMarketInput,
    responses(
        (status = 200, description = "Market updated", body = crate::ApiResponse<MarketWithPricing>),
        (status = 404, description = "Market not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Markets"
)]
pub async fn update_market(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMarketInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    if let Some(rate) = payload.exchange_rate.as_ref() {
        ensure_decimal_positive(rate, "exchange_rate")?;
    }
    let updated = state
        .services
        .markets
        .update_market(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/markets/:id",
    params(("id" = Uuid, Path, description = "Market ID")),
    responses(
        (status = 204, description = "Market and its prices deleted"),
        (status = 404, description = "Market not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Markets"
)]
pub async fn delete_market(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .markets
        .delete_market(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
