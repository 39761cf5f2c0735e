use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use bytes::Bytes;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, ensure_decimal_non_negative, ensure_decimal_positive, map_service_error,
    no_content_response, success_response, validate_input, PaginatedResponse,
};
use crate::services::markets::ProductMarketPrice;
use crate::services::products::{
    AttributeInput, CreateProductInput, ImageInput, UpdateProductInput,
};
use crate::services::storage::{UploadOutcome, UploadStatus, UploadedImage, MAX_IMAGE_BYTES};
use crate::{ApiResponse, AppState};

/// Request bodies for multipart uploads may carry several images.
const MAX_UPLOAD_REQUEST_BYTES: usize = MAX_IMAGE_BYTES * 8;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminProductQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Name or slug contains
    pub search: Option<String>,
    #[serde(default = "default_true")]
    pub include_inactive: bool,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddImagesRequest {
    #[validate]
    pub images: Vec<ImageInput>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct RemoveImageRequest {
    #[validate(length(min = 1))]
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReorderImagesRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct SetAttributesRequest {
    #[validate]
    pub attributes: Vec<AttributeInput>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReorderAttributesRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct MarketPriceRequest {
    pub price: Decimal,
}

pub fn product_routes() -> Router<AppState> {
    let uploads = Router::new()
        .route("/:id/images/upload", post(upload_images))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_REQUEST_BYTES));

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/redirects", get(list_redirects))
        .route("/:id/images", post(add_images).delete(remove_image))
        .route("/:id/images/order", put(reorder_images))
        .route("/:id/attributes", put(set_attributes))
        .route("/:id/attributes/order", put(reorder_attributes))
        .route("/:id/prices", get(list_prices))
        .route(
            "/:id/prices/:market_id",
            put(set_price).delete(clear_price),
        )
        .merge(uploads)
}

fn check_amounts(
    weight: Option<&Decimal>,
    price: Option<&Decimal>,
    compare_at_price: Option<&Decimal>,
) -> Result<(), ApiError> {
    if let Some(value) = weight {
        ensure_decimal_non_negative(value, "weight")?;
    }
    if let Some(value) = price {
        ensure_decimal_non_negative(value, "price")?;
    }
    if let Some(value) = compare_at_price {
        ensure_decimal_non_negative(value, "compare_at_price")?;
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/products",
    params(AdminProductQuery),
    responses(
        (status = 200, description = "Products page", body = Object),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<AdminProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let max = state.config.api_max_page_size;
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, max.max(1));
    let (products, total) = state
        .services
        .products
        .list_products(page, per_page, query.search, query.include_inactive)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        products, page, per_page, total,
    )))
}

/// Create a product. Its price comes from the current material rate when
/// one is set.
#[utoipa::path(
    post,
    path = "/api/v1/admin/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = Object),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    check_amounts(
        Some(&payload.weight),
        payload.price.as_ref(),
        payload.compare_at_price.as_ref(),
    )?;
    let product = state
        .services
        .products
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = Object),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

/// Update a product. A slug change leaves a redirect behind.
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = Object),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    check_amounts(
        payload.weight.as_ref(),
        payload.price.as_ref(),
        payload.compare_at_price.as_ref(),
    )?;
    let product = state
        .services
        .products
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .products
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/products/:id/redirects",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Retired slugs pointing at the product", body = Object)),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn list_redirects(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let redirects = state
        .services
        .products
        .list_redirects(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(redirects))
}

/// Append images by URL
#[utoipa::path(
    post,
    path = "/api/v1/admin/products/:id/images",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = AddImagesRequest,
    responses(
        (status = 200, description = "Product images", body = crate::ApiResponse<Vec<crate::entities::product::ProductImage>>),
        (status = 400, description = "Too many images", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn add_images(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddImagesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    if payload.images.is_empty() {
        return Err(ApiError::ValidationError(
            "At least one image is required".to_string(),
        ));
    }
    let images = state
        .services
        .products
        .add_images(id, payload.images)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(images))
}

/// Upload image files (multipart). Each `file` part may be followed by an
/// `alt` text part describing it.
#[utoipa::path(
    post,
    path = "/api/v1/admin/products/:id/images/upload",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body(content_type = "multipart/form-data", content = String),
    responses(
        (status = 201, description = "Images stored and attached", body = crate::ApiResponse<UploadOutcome>),
        (status = 202, description = "Images stored; product update queued for retry", body = crate::ApiResponse<UploadOutcome>),
        (status = 400, description = "Unsupported or oversized file", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn upload_images(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut files: Vec<UploadedImage> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "alt" => {
                let alt = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable alt text: {}", e)))?;
                if let Some(last) = files.last_mut() {
                    last.alt = Some(alt.trim().to_string()).filter(|alt| !alt.is_empty());
                }
            }
            "file" | "files" => {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_default();
                let bytes: Bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable file: {}", e)))?;
                files.push(UploadedImage {
                    content_type,
                    bytes,
                    alt: None,
                });
            }
            _ => {}
        }
    }

    let outcome = state
        .services
        .uploads
        .upload_images(id, files)
        .await
        .map_err(map_service_error)?;
    let status = match outcome.status {
        UploadStatus::Attached => StatusCode::CREATED,
        UploadStatus::Queued => StatusCode::ACCEPTED,
    };
    Ok((status, Json(ApiResponse::success(outcome))))
}

/// Remove one image. Removing the last one leaves an empty list.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/:id/images",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = RemoveImageRequest,
    responses(
        (status = 200, description = "Remaining images", body = crate::ApiResponse<Vec<crate::entities::product::ProductImage>>),
        (status = 404, description = "Image not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn remove_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RemoveImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let images = state
        .services
        .uploads
        .delete_image(id, &payload.url)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(images))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/products/:id/images/order",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ReorderImagesRequest,
    responses(
        (status = 200, description = "Images in their new order", body = crate::ApiResponse<Vec<crate::entities::product::ProductImage>>),
        (status = 400, description = "URLs do not match the product's images", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn reorder_images(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderImagesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let images = state
        .services
        .products
        .reorder_images(id, payload.urls)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(images))
}

/// Replace the attribute list
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/:id/attributes",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = SetAttributesRequest,
    responses(
        (status = 200, description = "Attributes", body = crate::ApiResponse<Vec<crate::entities::product::ProductAttribute>>)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn set_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetAttributesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let attributes = state
        .services
        .products
        .set_attributes(id, payload.attributes)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(attributes))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/products/:id/attributes/order",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ReorderAttributesRequest,
    responses(
        (status = 200, description = "Attributes in their new order", body = crate::ApiResponse<Vec<crate::entities::product::ProductAttribute>>)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn reorder_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderAttributesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let attributes = state
        .services
        .products
        .reorder_attributes(id, payload.ids)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(attributes))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/products/:id/prices",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Price in every market", body = crate::ApiResponse<Vec<ProductMarketPrice>>)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn list_prices(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let prices = state
        .services
        .markets
        .list_product_prices(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(prices))
}

/// Pin a manual price in one market; rate and market changes leave it alone
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/:id/prices/:market_id",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("market_id" = Uuid, Path, description = "Market ID")
    ),
    request_body = MarketPriceRequest,
    responses(
        (status = 200, description = "Pricing row", body = Object),
        (status = 404, description = "Product or market not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn set_price(
    State(state): State<AppState>,
    Path((id, market_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MarketPriceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_decimal_positive(&payload.price, "price")?;
    let pricing = state
        .services
        .markets
        .set_product_price(id, market_id, payload.price)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(pricing))
}

/// Drop a manual price and go back to the converted base price
#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/:id/prices/:market_id",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("market_id" = Uuid, Path, description = "Market ID")
    ),
    responses(
        (status = 200, description = "Regenerated pricing row", body = Object)
    ),
    security(("Bearer" = [])),
    tag = "Admin: Products"
)]
pub async fn clear_price(
    State(state): State<AppState>,
    Path((id, market_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let pricing = state
        .services
        .markets
        .clear_product_price(id, market_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(pricing))
}
