use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthRouterExt, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::{map_service_error, success_response};
use crate::services::wishlist::WishlistEntry;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct WishlistRequest {
    pub product_id: Uuid,
}

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_wishlist).post(add_to_wishlist))
        .route("/:product_id", delete(remove_from_wishlist))
        .with_auth()
}

#[utoipa::path(
    get,
    path = "/api/v1/wishlist",
    responses(
        (status = 200, description = "Saved products, newest first", body = crate::ApiResponse<Vec<WishlistEntry>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Wishlist"
)]
pub async fn list_wishlist(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .wishlist
        .list(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}

/// Save a product. Saving it again is a no-op.
#[utoipa::path(
    post,
    path = "/api/v1/wishlist",
    request_body = WishlistRequest,
    responses(
        (status = 200, description = "Updated wishlist", body = crate::ApiResponse<Vec<WishlistEntry>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Wishlist"
)]
pub async fn add_to_wishlist(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<WishlistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .wishlist
        .add(user.user_id, payload.product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}

#[utoipa::path(
    delete,
    path = "/api/v1/wishlist/:product_id",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Updated wishlist", body = crate::ApiResponse<Vec<WishlistEntry>>),
        (status = 404, description = "Product not in wishlist", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Wishlist"
)]
pub async fn remove_from_wishlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .wishlist
        .remove(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}
