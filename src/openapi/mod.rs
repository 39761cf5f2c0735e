use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lustre API",
        version = "1.0.0",
        description = r#"
# Lustre Jewelry Storefront API

Storefront and back-office API for a jewelry shop whose prices follow the
daily gold and silver rates.

## Features

- **Catalog**: products with images, attributes, categories and ranked collections
- **Daily rates**: per-gram material rates that reprice every rated product
- **Markets**: per-market currencies with generated and manual prices
- **CMS**: block-based pages with draft preview and publishing
- **Checkout**: carts, wishlists, promotion codes and orders

## Authentication

Register or log in under `/api/v1/auth` and send the token on every protected call:

```
Authorization: Bearer <token>
```

Everything under `/api/v1/admin` additionally requires the admin role.

## Responses

Successful responses are wrapped as `{ "success": true, "data": ... }`.
Errors use `{ "error": ..., "message": ..., "timestamp": ... }` with the matching HTTP status.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Registration and sessions"),
        (name = "Storefront", description = "Public catalog and pages"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Wishlist", description = "Saved products"),
        (name = "Checkout", description = "Checkout and customer orders"),
        (name = "Admin: Products", description = "Product management"),
        (name = "Admin: Catalog", description = "Categories and collections"),
        (name = "Admin: Markets", description = "Markets and market prices"),
        (name = "Admin: Rates", description = "Daily material rates"),
        (name = "Admin: CMS", description = "CMS pages and blocks"),
        (name = "Admin: Promotions", description = "Promotion codes"),
        (name = "Admin: Orders", description = "Order fulfilment"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::health::health_check,

        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::me,

        handlers::storefront::list_products,
        handlers::storefront::get_product,
        handlers::storefront::list_categories,
        handlers::storefront::get_category,
        handlers::storefront::list_collections,
        handlers::storefront::get_collection,
        handlers::storefront::list_markets,
        handlers::storefront::get_page,
        handlers::storefront::render_page,

        handlers::cart::view_cart,
        handlers::cart::add_item,
        handlers::cart::set_quantity,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::cart::check_promotion,

        handlers::wishlist::list_wishlist,
        handlers::wishlist::add_to_wishlist,
        handlers::wishlist::remove_from_wishlist,

        handlers::checkout::checkout,
        handlers::checkout::list_my_orders,
        handlers::checkout::get_my_order,

        handlers::admin::products::list_products,
        handlers::admin::products::create_product,
        handlers::admin::products::get_product,
        handlers::admin::products::update_product,
        handlers::admin::products::delete_product,
        handlers::admin::products::list_redirects,
        handlers::admin::products::add_images,
        handlers::admin::products::upload_images,
        handlers::admin::products::remove_image,
        handlers::admin::products::reorder_images,
        handlers::admin::products::set_attributes,
        handlers::admin::products::reorder_attributes,
        handlers::admin::products::list_prices,
        handlers::admin::products::set_price,
        handlers::admin::products::clear_price,

        handlers::admin::catalog::list_categories,
        handlers::admin::catalog::create_category,
        handlers::admin::catalog::get_category,
        handlers::admin::catalog::update_category,
        handlers::admin::catalog::delete_category,
        handlers::admin::catalog::list_category_products,
        handlers::admin::catalog::list_collections,
        handlers::admin::catalog::create_collection,
        handlers::admin::catalog::get_collection,
        handlers::admin::catalog::update_collection,
        handlers::admin::catalog::delete_collection,
        handlers::admin::catalog::list_members,
        handlers::admin::catalog::add_collection_products,
        handlers::admin::catalog::reorder_collection_products,
        handlers::admin::catalog::remove_collection_product,

        handlers::admin::markets::list_markets,
        handlers::admin::markets::create_market,
        handlers::admin::markets::get_market,
        handlers::admin::markets::update_market,
        handlers::admin::markets::delete_market,

        handlers::admin::rates::list_current_rates,
        handlers::admin::rates::set_daily_rate,
        handlers::admin::rates::rate_history,
        handlers::admin::rates::reprice_material,

        handlers::admin::cms::list_pages,
        handlers::admin::cms::create_page,
        handlers::admin::cms::get_page,
        handlers::admin::cms::update_page,
        handlers::admin::cms::delete_page,
        handlers::admin::cms::replace_blocks,
        handlers::admin::cms::add_block,
        handlers::admin::cms::update_block,
        handlers::admin::cms::remove_block,
        handlers::admin::cms::move_block,
        handlers::admin::cms::publish_page,
        handlers::admin::cms::unpublish_page,
        handlers::admin::cms::preview_page,

        handlers::admin::promotions::list_promotions,
        handlers::admin::promotions::create_promotion,
        handlers::admin::promotions::get_promotion,
        handlers::admin::promotions::update_promotion,
        handlers::admin::promotions::delete_promotion,

        handlers::admin::orders::list_orders,
        handlers::admin::orders::get_order,
        handlers::admin::orders::update_order_status,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::errors::ErrorResponse,
            crate::health::HealthInfo,
            crate::auth::TokenResponse,
            crate::auth::UserSummary,
            crate::entities::Material,
            crate::entities::order::OrderStatus,
            handlers::auth::LoginRequest,
            handlers::auth::RegisterRequest,
            handlers::cart::AddCartItemRequest,
            handlers::cart::SetQuantityRequest,
            handlers::cart::PromotionCheckRequest,
            handlers::wishlist::WishlistRequest,
            handlers::admin::products::AddImagesRequest,
            handlers::admin::products::RemoveImageRequest,
            handlers::admin::products::ReorderImagesRequest,
            handlers::admin::products::SetAttributesRequest,
            handlers::admin::products::ReorderAttributesRequest,
            handlers::admin::products::MarketPriceRequest,
            handlers::admin::catalog::CollectionProductsRequest,
            handlers::admin::rates::SetRateRequest,
            handlers::admin::cms::ReplaceBlocksRequest,
            handlers::admin::cms::AddBlockRequest,
            handlers::admin::cms::AddBlockResponse,
            handlers::admin::cms::BlockDataRequest,
            handlers::admin::cms::MoveBlockRequest,
            handlers::admin::orders::UpdateOrderStatusRequest,
            crate::services::products::CreateProductInput,
            crate::services::products::UpdateProductInput,
            crate::services::products::StorefrontProduct,
            crate::services::products::StorefrontProductDetail,
            crate::services::products::StorefrontPage,
            crate::services::categories::CreateGroupingInput,
            crate::services::categories::UpdateGroupingInput,
            crate::services::collections::CollectionMember,
            crate::services::markets::CreateMarketInput,
            crate::services::markets::UpdateMarketInput,
            crate::services::markets::MarketWithPricing,
            crate::services::pricing::RatePropagationReport,
            crate::services::cms::CmsPageView,
            crate::services::cms::CreatePageInput,
            crate::services::cms::UpdatePageInput,
            crate::services::promotions::CreatePromotionInput,
            crate::services::promotions::UpdatePromotionInput,
            crate::services::promotions::AppliedPromotion,
            crate::services::cart::CartView,
            crate::services::checkout::CheckoutInput,
            crate::services::orders::OrderWithItems,
            crate::services::storage::UploadOutcome,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_storefront_and_admin_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Lustre API"));
        assert!(json.contains("/api/v1/products"));
        assert!(json.contains("/api/v1/admin/rates"));
        assert!(json.contains("\"Bearer\""));
    }
}
