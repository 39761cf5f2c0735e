//! Public catalog reads: products, categories, collections, markets and
//! published CMS pages.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use utoipa::IntoParams;

use crate::errors::{ApiError, ServiceError};
use crate::handlers::common::{map_service_error, success_response};
use crate::services::catalog_filter::CatalogQuery;
use crate::services::products::{SlugLookup, StorefrontPage, StorefrontProductDetail};
use crate::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MarketParam {
    /// Market slug used to project prices
    pub market: Option<String>,
}

/// A category or collection with the storefront page of its products
#[derive(Debug, Serialize)]
pub struct GroupingPage<T> {
    pub grouping: T,
    pub products: StorefrontPage,
}

pub fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:slug", get(get_product))
        .route("/categories", get(list_categories))
        .route("/categories/:slug", get(get_category))
        .route("/collections", get(list_collections))
        .route("/collections/:slug", get(get_collection))
        .route("/markets", get(list_markets))
        .route("/pages/:slug", get(get_page))
        .route("/pages/:slug/html", get(render_page))
}

fn product_location(slug: &str, market: Option<&str>) -> String {
    match market {
        Some(market) => {
            let market: String = form_urlencoded::byte_serialize(market.as_bytes()).collect();
            format!("/api/v1/products/{}?market={}", slug, market)
        }
        None => format!("/api/v1/products/{}", slug),
    }
}

/// Filtered, sorted and paginated catalog
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Catalog page", body = crate::ApiResponse<StorefrontPage>),
        (status = 404, description = "Unknown category, collection or market", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .products
        .storefront_listing(&query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Product detail. Retired slugs answer with a permanent redirect to the
/// current one.
#[utoipa::path(
    get,
    path = "/api/v1/products/:slug",
    params(
        ("slug" = String, Path, description = "Product slug"),
        MarketParam
    ),
    responses(
        (status = 200, description = "Product", body = crate::ApiResponse<StorefrontProductDetail>),
        (status = 308, description = "Slug moved; see Location"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<MarketParam>,
) -> Result<axum::response::Response, ApiError> {
    let lookup = state
        .services
        .products
        .storefront_product(&slug, params.market.as_deref())
        .await
        .map_err(map_service_error)?;

    Ok(match lookup {
        SlugLookup::Found(detail) => success_response(detail),
        SlugLookup::Redirect(canonical) => {
            Redirect::permanent(&product_location(&canonical, params.market.as_deref()))
                .into_response()
        }
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Active categories", body = Object)
    ),
    tag = "Storefront"
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .categories
        .list_categories(false)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

/// Category with its filtered products
#[utoipa::path(
    get,
    path = "/api/v1/categories/:slug",
    params(
        ("slug" = String, Path, description = "Category slug"),
        CatalogQuery
    ),
    responses(
        (status = 200, description = "Category page", body = Object),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(mut query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get_by_slug(&slug)
        .await
        .map_err(map_service_error)?;
    if !category.is_active {
        return Err(ServiceError::NotFound(format!("Category '{}' not found", slug)).into());
    }

    query.category = Some(category.slug.clone());
    let products = state
        .services
        .products
        .storefront_listing(&query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(GroupingPage {
        grouping: category,
        products,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/collections",
    responses(
        (status = 200, description = "Active collections", body = Object)
    ),
    tag = "Storefront"
)]
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let collections = state
        .services
        .collections
        .list_collections(false)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(collections))
}

/// Collection with its products in curated order unless a sort is given
#[utoipa::path(
    get,
    path = "/api/v1/collections/:slug",
    params(
        ("slug" = String, Path, description = "Collection slug"),
        CatalogQuery
    ),
    responses(
        (status = 200, description = "Collection page", body = Object),
        (status = 404, description = "Collection not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_collection(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(mut query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = state
        .services
        .collections
        .get_by_slug(&slug)
        .await
        .map_err(map_service_error)?;
    if !collection.is_active {
        return Err(ServiceError::NotFound(format!("Collection '{}' not found", slug)).into());
    }

    query.collection = Some(collection.slug.clone());
    let products = state
        .services
        .products
        .storefront_listing(&query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(GroupingPage {
        grouping: collection,
        products,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/markets",
    responses(
        (status = 200, description = "Active markets", body = Object)
    ),
    tag = "Storefront"
)]
pub async fn list_markets(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let markets = state
        .services
        .markets
        .list_markets(false)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(markets))
}

/// Published CMS page with its block tree
#[utoipa::path(
    get,
    path = "/api/v1/pages/:slug",
    params(("slug" = String, Path, description = "Page slug")),
    responses(
        (status = 200, description = "Page", body = crate::ApiResponse<crate::services::cms::CmsPageView>),
        (status = 404, description = "Page not found or unpublished", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .cms
        .published_page(&slug)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Published CMS page rendered to HTML
#[utoipa::path(
    get,
    path = "/api/v1/pages/:slug/html",
    params(("slug" = String, Path, description = "Page slug")),
    responses(
        (status = 200, description = "Rendered page", content_type = "text/html", body = String),
        (status = 404, description = "Page not found or unpublished", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn render_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .cms
        .published_page(&slug)
        .await
        .map_err(map_service_error)?;
    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        page.render(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_location_keeps_market() {
        assert_eq!(product_location("rose-band", None), "/api/v1/products/rose-band");
        assert_eq!(
            product_location("rose-band", Some("uae")),
            "/api/v1/products/rose-band?market=uae"
        );
    }

    #[test]
    fn redirect_location_escapes_market() {
        assert_eq!(
            product_location("rose-band", Some("uae&sort=price-asc")),
            "/api/v1/products/rose-band?market=uae%26sort%3Dprice-asc"
        );
        let location = product_location("rose-band", Some("\n"));
        assert_eq!(location, "/api/v1/products/rose-band?market=%0A");
        assert!(axum::http::HeaderValue::from_str(&location).is_ok());
    }
}
