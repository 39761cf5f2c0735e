//! Back-office routes. Everything under `/admin` requires an admin session.

pub mod catalog;
pub mod cms;
pub mod markets;
pub mod orders;
pub mod products;
pub mod promotions;
pub mod rates;

use axum::Router;

use crate::auth::{AuthRouterExt, UserRole};
use crate::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", products::product_routes())
        .nest("/categories", catalog::category_routes())
        .nest("/collections", catalog::collection_routes())
        .nest("/markets", markets::market_routes())
        .nest("/rates", rates::rate_routes())
        .nest("/pages", cms::page_routes())
        .nest("/promotions", promotions::promotion_routes())
        .nest("/orders", orders::order_routes())
        .with_role(UserRole::Admin)
}
