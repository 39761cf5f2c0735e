//! Category and collection management.

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::services::categories::{CreateGroupingInput, UpdateGroupingInput};
use crate::services::collections::CollectionMember;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CollectionProductsRequest {
    pub product_ids: Vec<Uuid>,
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/:id/products", get(list_category_products))
}

pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_collections).post(create_collection))
        .route(
            "/:id",
            get(get_collection)
                .put(update_collection)
                .delete(delete_collection),
        )
        .route(
            "/:id/products",
            get(list_members).post(add_collection_products),
        )
        .route("/:id/products/order", put(reorder_collection_products))
        .route("/:id/products/:product_id", delete(remove_collection_product))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/categories",
    responses((status = 200, description = "All categories", body = Object)),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .categories
        .list_categories(true)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/categories",
    request_body = CreateGroupingInput,
    responses(
        (status = 201, description = "Category created", body = Object),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupingInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .categories
        .create_category(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/categories/:id",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = Object),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get_category(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/categories/:id",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateGroupingInput,
    responses(
        (status = 200, description = "Category updated", body = Object),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGroupingInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .categories
        .update_category(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

/// Delete a category; its products become uncategorised
#[utoipa::path(
    delete,
    path = "/api/v1/admin/categories/:id",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .categories
        .delete_category(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/categories/:id/products",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Products in the category", body = Object)),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn list_category_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .categories
        .list_products(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/collections",
    responses((status = 200, description = "All collections", body = Object)),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let collections = state
        .services
        .collections
        .list_collections(true)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(collections))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/collections",
    request_body = CreateGroupingInput,
    responses(
        (status = 201, description = "Collection created", body = Object),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn create_collection(
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupingInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let collection = state
        .services
        .collections
        .create_collection(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(collection))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/collections/:id",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Collection", body = Object),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = state
        .services
        .collections
        .get_collection(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(collection))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/collections/:id",
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = UpdateGroupingInput,
    responses(
        (status = 200, description = "Collection updated", body = Object),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn update_collection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGroupingInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let collection = state
        .services
        .collections
        .update_collection(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(collection))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/collections/:id",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 204, description = "Collection deleted"),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .collections
        .delete_collection(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/collections/:id/products",
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses((status = 200, description = "Members by rank", body = crate::ApiResponse<Vec<CollectionMember>>)),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let members = state
        .services
        .collections
        .list_members(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(members))
}

/// Add products to the end of a collection. Existing members are kept
/// where they are.
#[utoipa::path(
    post,
    path = "/api/v1/admin/collections/:id/products",
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = CollectionProductsRequest,
    responses(
        (status = 200, description = "Members by rank", body = crate::ApiResponse<Vec<CollectionMember>>),
        (status = 404, description = "Collection or product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn add_collection_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CollectionProductsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.product_ids.is_empty() {
        return Err(ApiError::ValidationError(
            "product_ids cannot be empty".to_string(),
        ));
    }
    let members = state
        .services
        .collections
        .add_products(id, payload.product_ids)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(members))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/collections/:id/products/order",
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = CollectionProductsRequest,
    responses(
        (status = 200, description = "Members in their new order", body = crate::ApiResponse<Vec<CollectionMember>>),
        (status = 400, description = "Ids do not match the members", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn reorder_collection_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CollectionProductsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let members = state
        .services
        .collections
        .reorder_products(id, payload.product_ids)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(members))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/collections/:id/products/:product_id",
    params(
        ("id" = Uuid, Path, description = "Collection ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product removed from the collection"),
        (status = 404, description = "Not a member", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Catalog"
)]
pub async fn remove_collection_product(
    State(state): State<AppState>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .collections
        .remove_product(id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
