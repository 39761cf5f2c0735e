//! CMS page editor. Block edits go through the service, which validates the
//! whole tree before anything is written.

use axum::{
    extract::{Json, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::services::cms::{
    Block, BlockKind, CmsPageView, CreatePageInput, MoveDirection, UpdatePageInput,
};
use crate::AppState;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReplaceBlocksRequest {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddBlockRequest {
    pub kind: BlockKind,
    /// Section or grid to nest under; top level when absent
    pub parent: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddBlockResponse {
    pub page: CmsPageView,
    pub block: Block,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BlockDataRequest {
    #[schema(value_type = Object)]
    pub data: Value,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct MoveBlockRequest {
    pub direction: MoveDirection,
}

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pages).post(create_page))
        .route("/:id", get(get_page).put(update_page).delete(delete_page))
        .route("/:id/blocks", put(replace_blocks).post(add_block))
        .route(
            "/:id/blocks/:block_id",
            put(update_block).delete(remove_block),
        )
        .route("/:id/blocks/:block_id/move", post(move_block))
        .route("/:id/publish", post(publish_page))
        .route("/:id/unpublish", post(unpublish_page))
        .route("/:id/preview", get(preview_page))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/pages",
    responses((status = 200, description = "All pages, drafts included", body = crate::ApiResponse<Vec<CmsPageView>>)),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn list_pages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pages = state
        .services
        .cms
        .list_pages()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(pages))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/pages",
    request_body = CreatePageInput,
    responses(
        (status = 201, description = "Page created as a draft", body = crate::ApiResponse<CmsPageView>),
        (status = 400, description = "Invalid page or block tree", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn create_page(
    State(state): State<AppState>,
    Json(payload): Json<CreatePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let page = state
        .services
        .cms
        .create_page(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/pages/:id",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page", body = crate::ApiResponse<CmsPageView>),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .cms
        .get_page(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/pages/:id",
    params(("id" = Uuid, Path, description = "Page ID")),
    request_body = UpdatePageInput,
    responses(
        (status = 200, description = "Page updated", body = crate::ApiResponse<CmsPageView>),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn update_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let page = state
        .services
        .cms
        .update_page(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/pages/:id",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 204, description = "Page deleted"),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn delete_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .cms
        .delete_page(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/pages/:id/blocks",
    params(("id" = Uuid, Path, description = "Page ID")),
    request_body = ReplaceBlocksRequest,
    responses(
        (status = 200, description = "Block tree replaced", body = crate::ApiResponse<CmsPageView>),
        (status = 400, description = "Invalid block tree", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn replace_blocks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplaceBlocksRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .cms
        .replace_blocks(id, payload.blocks)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/pages/:id/blocks",
    params(("id" = Uuid, Path, description = "Page ID")),
    request_body = AddBlockRequest,
    responses(
        (status = 201, description = "Block appended with default data", body = crate::ApiResponse<AddBlockResponse>),
        (status = 400, description = "Parent cannot hold children", body = crate::errors::ErrorResponse),
        (status = 404, description = "Page or parent not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn add_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddBlockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, block) = state
        .services
        .cms
        .add_block(id, payload.kind, payload.parent)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(AddBlockResponse { page, block }))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/pages/:id/blocks/:block_id",
    params(
        ("id" = Uuid, Path, description = "Page ID"),
        ("block_id" = Uuid, Path, description = "Block ID")
    ),
    request_body = BlockDataRequest,
    responses(
        (status = 200, description = "Block data replaced", body = crate::ApiResponse<CmsPageView>),
        (status = 404, description = "Block not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn update_block(
    State(state): State<AppState>,
    Path((id, block_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<BlockDataRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !payload.data.is_object() {
        return Err(ApiError::ValidationError(
            "Block data must be a JSON object".to_string(),
        ));
    }
    let page = state
        .services
        .cms
        .update_block_data(id, block_id, payload.data)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/pages/:id/blocks/:block_id",
    params(
        ("id" = Uuid, Path, description = "Page ID"),
        ("block_id" = Uuid, Path, description = "Block ID")
    ),
    responses(
        (status = 200, description = "Block and its children removed", body = crate::ApiResponse<CmsPageView>),
        (status = 404, description = "Block not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn remove_block(
    State(state): State<AppState>,
    Path((id, block_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .cms
        .remove_block(id, block_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Swap a block with its neighbour among its siblings. Moving past either
/// end leaves the tree unchanged.
#[utoipa::path(
    post,
    path = "/api/v1/admin/pages/:id/blocks/:block_id/move",
    params(
        ("id" = Uuid, Path, description = "Page ID"),
        ("block_id" = Uuid, Path, description = "Block ID")
    ),
    request_body = MoveBlockRequest,
    responses(
        (status = 200, description = "Block moved", body = crate::ApiResponse<CmsPageView>),
        (status = 404, description = "Block not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn move_block(
    State(state): State<AppState>,
    Path((id, block_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MoveBlockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .cms
        .move_block(id, block_id, payload.direction)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/pages/:id/publish",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses((status = 200, description = "Page published", body = crate::ApiResponse<CmsPageView>)),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn publish_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .cms
        .set_published(id, true)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/pages/:id/unpublish",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses((status = 200, description = "Page back to draft", body = crate::ApiResponse<CmsPageView>)),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn unpublish_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .cms
        .set_published(id, false)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/pages/:id/preview",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Rendered draft", content_type = "text/html", body = String),
        (status = 404, description = "Page not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin: CMS"
)]
pub async fn preview_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let html = state
        .services
        .cms
        .render_preview(id)
        .await
        .map_err(map_service_error)?;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html))
}
