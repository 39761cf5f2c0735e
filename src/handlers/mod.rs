pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod common;
pub mod storefront;
pub mod wishlist;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::cache::{InMemoryCache, Revalidator};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::message_queue::{InMemoryMessageQueue, MessageQueue};
use crate::services::{
    cart::CartService,
    categories::CategoryService,
    checkout::CheckoutService,
    cms::CmsService,
    collections::CollectionService,
    markets::MarketService,
    orders::OrderService,
    pricing::MaterialRateService,
    products::{CatalogSettings, ProductService},
    promotions::PromotionService,
    storage::{ImageStorage, ImageUploadService, LocalImageStorage, RetrySettings},
    wishlist::WishlistService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub rates: Arc<MaterialRateService>,
    pub products: Arc<ProductService>,
    pub uploads: Arc<ImageUploadService>,
    pub categories: Arc<CategoryService>,
    pub collections: Arc<CollectionService>,
    pub markets: Arc<MarketService>,
    pub cms: Arc<CmsService>,
    pub cart: Arc<CartService>,
    pub wishlist: Arc<WishlistService>,
    pub promotions: Arc<PromotionService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub revalidator: Arc<Revalidator>,
    pub message_queue: Arc<dyn MessageQueue>,
}

impl AppServices {
    /// Build the service container with local image storage and the
    /// in-memory queue.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        config: &AppConfig,
    ) -> Self {
        let storage: Arc<dyn ImageStorage> = Arc::new(LocalImageStorage::from_app_config(config));
        let message_queue: Arc<dyn MessageQueue> = Arc::new(InMemoryMessageQueue::new());
        Self::with_backends(
            db_pool,
            event_sender,
            auth_service,
            config,
            storage,
            message_queue,
        )
    }

    pub fn with_backends(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        config: &AppConfig,
        storage: Arc<dyn ImageStorage>,
        message_queue: Arc<dyn MessageQueue>,
    ) -> Self {
        let cache = Arc::new(InMemoryCache::new());
        let revalidator = Arc::new(Revalidator::new(cache, event_sender.clone()));

        let rates = Arc::new(MaterialRateService::new(
            db_pool.clone(),
            event_sender.clone(),
            revalidator.clone(),
        ));
        let products = Arc::new(ProductService::new(
            db_pool.clone(),
            event_sender.clone(),
            revalidator.clone(),
            rates.clone(),
            CatalogSettings::from(config),
        ));
        let uploads = Arc::new(ImageUploadService::new(
            storage,
            products.clone(),
            message_queue.clone(),
            RetrySettings::from(config),
        ));
        let categories = Arc::new(CategoryService::new(
            db_pool.clone(),
            event_sender.clone(),
            revalidator.clone(),
        ));
        let collections = Arc::new(CollectionService::new(
            db_pool.clone(),
            event_sender.clone(),
            revalidator.clone(),
        ));
        let markets = Arc::new(MarketService::new(
            db_pool.clone(),
            event_sender.clone(),
            revalidator.clone(),
        ));
        let cms = Arc::new(CmsService::new(
            db_pool.clone(),
            event_sender.clone(),
            revalidator.clone(),
        ));
        let cart = Arc::new(CartService::new(
            db_pool.clone(),
            config.default_currency.clone(),
        ));
        let wishlist = Arc::new(WishlistService::new(db_pool.clone()));
        let promotions = Arc::new(PromotionService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            revalidator.clone(),
            config.default_currency.clone(),
        ));
        let orders = Arc::new(OrderService::new(
            db_pool,
            event_sender,
            revalidator.clone(),
        ));

        Self {
            auth: auth_service,
            rates,
            products,
            uploads,
            categories,
            collections,
            markets,
            cms,
            cart,
            wishlist,
            promotions,
            checkout,
            orders,
            revalidator,
            message_queue,
        }
    }
}
