use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthRouterExt, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::{
    map_service_error, no_content_response, success_response, validate_input,
};
use crate::services::cart::CartView;
use crate::services::promotions::AppliedPromotion;
use crate::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CartParams {
    /// Market slug to price the cart in
    pub market: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct SetQuantityRequest {
    /// Zero removes the line
    #[validate(range(min = 0, max = 10))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct PromotionCheckRequest {
    #[validate(length(min = 1, max = 40))]
    pub code: String,
    pub market: Option<String>,
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", put(set_quantity).delete(remove_item))
        .route("/promotion", post(check_promotion))
        .with_auth()
}

#[utoipa::path(
    get,
    path = "/api/v1/cart",
    params(CartParams),
    responses(
        (status = 200, description = "Cart with line totals", body = crate::ApiResponse<CartView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn view_cart(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<CartParams>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .view_cart(user.user_id, params.market.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Add a product; an existing line is incremented
#[utoipa::path(
    post,
    path = "/api/v1/cart/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = crate::ApiResponse<CartView>),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn add_item(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state
        .services
        .cart
        .add_item(user.user_id, payload.product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

#[utoipa::path(
    put,
    path = "/api/v1/cart/items/:product_id",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = crate::ApiResponse<CartView>),
        (status = 404, description = "Product not in cart", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn set_quantity(
    user: AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<SetQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state
        .services
        .cart
        .set_quantity(user.user_id, product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/:product_id",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Updated cart", body = crate::ApiResponse<CartView>),
        (status = 404, description = "Product not in cart", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove_item(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cart",
    responses((status = 204, description = "Cart emptied")),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .cart
        .clear(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Preview a promotion code against the current cart without consuming it
#[utoipa::path(
    post,
    path = "/api/v1/cart/promotion",
    request_body = PromotionCheckRequest,
    responses(
        (status = 200, description = "Discount the code would give", body = crate::ApiResponse<AppliedPromotion>),
        (status = 400, description = "Code not applicable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown code", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn check_promotion(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PromotionCheckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state
        .services
        .cart
        .view_cart(user.user_id, payload.market.as_deref())
        .await
        .map_err(map_service_error)?;
    let applied = state
        .services
        .promotions
        .validate_code(&payload.code, cart.subtotal, Utc::now())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(applied))
}
