//! Admin product management and storefront catalog reads.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{paths, Revalidator};
use crate::config::AppConfig;
use crate::entities::{
    cart_item, category, collection, collection_product, market, product,
    product::{ProductAttribute, ProductImage},
    product_pricing, product_slug_redirect, wishlist_item, Gender, Material,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::catalog_filter::{self, CatalogQuery, ProductFilter};
use crate::services::pricing::{market_price, refresh_product_market_prices, MaterialRateService};
use crate::services::slug::resolve_slug;

/// Catalog knobs taken from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub cache_ttl: Duration,
    pub max_images_per_product: usize,
    pub max_page_size: u64,
    pub default_currency: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            max_images_per_product: 12,
            max_page_size: 100,
            default_currency: "INR".to_string(),
        }
    }
}

impl From<&AppConfig> for CatalogSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            cache_ttl: config.catalog_cache_ttl(),
            max_images_per_product: config.max_images_per_product,
            max_page_size: config.api_max_page_size,
            default_currency: config.default_currency.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ImageInput {
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    #[validate(length(max = 300))]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AttributeInput {
    /// Existing attribute id to keep; a new id is assigned when absent
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Derived from the name when absent
    pub slug: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub material: Material,
    pub gender: Gender,
    /// Grams
    pub weight: Decimal,
    /// Required unless the material has a current rate
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    #[validate]
    pub images: Vec<ImageInput>,
    #[serde(default)]
    #[validate]
    pub attributes: Vec<AttributeInput>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub slug: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub material: Option<Material>,
    pub gender: Option<Gender>,
    pub weight: Option<Decimal>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
    pub category_id: Option<Uuid>,
}

/// Product summary as shown in storefront listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StorefrontProduct {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub material: Material,
    pub gender: Gender,
    pub weight: Decimal,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub currency: String,
    pub image: Option<ProductImage>,
    pub in_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StorefrontProductDetail {
    #[serde(flatten)]
    pub summary: StorefrontProduct,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub images: Vec<ProductImage>,
    pub attributes: Vec<ProductAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StorefrontPage {
    pub items: Vec<StorefrontProduct>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
    pub currency: String,
    /// Canonical query string for the applied filter and sort
    pub query: String,
}

/// Result of looking a product up by slug
#[derive(Debug, Clone, PartialEq)]
pub enum SlugLookup<T> {
    Found(T),
    /// The slug was retired; the product now lives at this slug
    Redirect(String),
}

/// Prices in a market's currency, falling back to conversion when no
/// pricing row exists yet.
struct PriceProjection {
    currency: String,
    exchange_rate: Decimal,
    prices: HashMap<Uuid, Decimal>,
}

impl PriceProjection {
    fn base(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            exchange_rate: Decimal::ONE,
            prices: HashMap::new(),
        }
    }

    fn price_of(&self, item: &product::Model) -> Decimal {
        self.prices
            .get(&item.id)
            .copied()
            .unwrap_or_else(|| market_price(item.price, self.exchange_rate))
    }

    fn compare_at_of(&self, item: &product::Model) -> Option<Decimal> {
        item.compare_at_price
            .map(|price| market_price(price, self.exchange_rate))
    }

    fn summary(&self, item: &product::Model) -> StorefrontProduct {
        StorefrontProduct {
            id: item.id,
            name: item.name.clone(),
            slug: item.slug.clone(),
            material: item.material,
            gender: item.gender,
            weight: item.weight,
            price: self.price_of(item),
            compare_at_price: self.compare_at_of(item),
            currency: self.currency.clone(),
            image: item.image_list().into_iter().next(),
            in_stock: item.stock > 0,
        }
    }
}

/// Ranks 0..n in list order
fn rerank_images(images: &mut [ProductImage]) {
    for (rank, image) in images.iter_mut().enumerate() {
        image.rank = rank as i32;
    }
}

fn rerank_attributes(attributes: &mut [ProductAttribute]) {
    for (rank, attribute) in attributes.iter_mut().enumerate() {
        attribute.rank = rank as i32;
    }
}

fn images_json(images: &[ProductImage]) -> Result<serde_json::Value, ServiceError> {
    Ok(serde_json::to_value(images)?)
}

fn build_attributes(inputs: Vec<AttributeInput>) -> Vec<ProductAttribute> {
    let mut attributes: Vec<ProductAttribute> = inputs
        .into_iter()
        .map(|input| ProductAttribute {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            name: input.name.trim().to_string(),
            value: input.value.trim().to_string(),
            rank: 0,
        })
        .collect();
    rerank_attributes(&mut attributes);
    attributes
}

/// Orders `current` by `requested` keys. Keys must all exist; items not named
/// keep their relative order after the named ones.
fn reorder_by<T, K, F>(current: Vec<T>, requested: &[K], key: F) -> Result<Vec<T>, ServiceError>
where
    K: PartialEq + std::fmt::Display,
    F: Fn(&T) -> &K,
{
    for (i, wanted) in requested.iter().enumerate() {
        if requested[..i].contains(wanted) {
            return Err(ServiceError::ValidationError(format!(
                "{} listed more than once",
                wanted
            )));
        }
        if !current.iter().any(|item| key(item) == wanted) {
            return Err(ServiceError::NotFound(format!("{} not found", wanted)));
        }
    }

    let mut remaining: Vec<Option<T>> = current.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(remaining.len());
    for wanted in requested {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().map(|item| key(item) == wanted).unwrap_or(false))
        {
            if let Some(item) = slot.take() {
                ordered.push(item);
            }
        }
    }
    ordered.extend(remaining.into_iter().flatten());
    Ok(ordered)
}

/// Ensures `slug` is free for `product_id` (or a new product).
async fn ensure_slug_available<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    product_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = product::Entity::find().filter(product::Column::Slug.eq(slug));
    if let Some(id) = product_id {
        query = query.filter(product::Column::Id.ne(id));
    }
    if query.one(conn).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "Product slug '{}' is already in use",
            slug
        )));
    }
    Ok(())
}

/// A slug that is live again must not keep redirecting elsewhere.
async fn clear_redirect_for<C: ConnectionTrait>(conn: &C, slug: &str) -> Result<u64, ServiceError> {
    let result = product_slug_redirect::Entity::delete_many()
        .filter(product_slug_redirect::Column::OldSlug.eq(slug))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Points `old_slug` at `product_id`. One row per old slug: a second rename
/// away from the same slug updates the existing row.
async fn record_redirect<C: ConnectionTrait>(
    conn: &C,
    old_slug: &str,
    product_id: Uuid,
) -> Result<(), ServiceError> {
    product_slug_redirect::Entity::insert(product_slug_redirect::ActiveModel {
        id: Set(Uuid::new_v4()),
        old_slug: Set(old_slug.to_string()),
        product_id: Set(product_id),
        created_at: Set(Utc::now()),
    })
    .on_conflict(
        OnConflict::column(product_slug_redirect::Column::OldSlug)
            .update_column(product_slug_redirect::Column::ProductId)
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    revalidator: Arc<Revalidator>,
    rates: Arc<MaterialRateService>,
    settings: CatalogSettings,
}

impl ProductService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        revalidator: Arc<Revalidator>,
        rates: Arc<MaterialRateService>,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            db,
            event_sender,
            revalidator,
            rates,
            settings,
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    async fn revalidate_catalog(&self) {
        self.revalidator
            .revalidate(&[paths::PRODUCTS, paths::CATEGORIES, paths::COLLECTIONS])
            .await;
    }

    async fn ensure_category_exists(&self, category_id: Uuid) -> Result<(), ServiceError> {
        if category::Entity::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::ValidationError(format!(
                "Category {} does not exist",
                category_id
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        if input.weight < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "weight must not be negative".to_string(),
            ));
        }
        if input.images.len() > self.settings.max_images_per_product {
            return Err(ServiceError::ValidationError(format!(
                "A product can have at most {} images",
                self.settings.max_images_per_product
            )));
        }
        let slug = resolve_slug(input.slug.as_deref(), &input.name).ok_or_else(|| {
            ServiceError::ValidationError("A valid slug could not be derived".to_string())
        })?;
        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let price = match self.rates.quote(input.material, input.weight).await? {
            Some(quoted) => quoted,
            None => input.price.ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "price is required: no current rate for {}",
                    input.material
                ))
            })?,
        };
        if price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }

        let mut images: Vec<ProductImage> = input
            .images
            .into_iter()
            .map(|image| ProductImage {
                url: image.url,
                alt: image.alt,
                rank: 0,
            })
            .collect();
        rerank_images(&mut images);
        let attributes = build_attributes(input.attributes);

        let now = Utc::now();
        let txn = self.db.begin().await?;
        ensure_slug_available(&txn, &slug, None).await?;
        clear_redirect_for(&txn, &slug).await?;

        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            slug: Set(slug),
            description: Set(input.description),
            material: Set(input.material),
            gender: Set(input.gender),
            weight: Set(input.weight),
            price: Set(price),
            compare_at_price: Set(input.compare_at_price),
            stock: Set(input.stock),
            is_active: Set(input.is_active),
            category_id: Set(input.category_id),
            images: Set(images_json(&images)?),
            attributes: Set(serde_json::to_value(&attributes)?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        refresh_product_market_prices(&txn, created.id, created.price).await?;
        txn.commit().await?;

        self.revalidate_catalog().await;
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;
        info!(product_id = %created.id, slug = %created.slug, %price, "Product created");
        Ok(created)
    }

    /// Applies a partial update. A slug change records a redirect from the
    /// previous slug in the same transaction.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_product(product_id).await?;

        let material = input.material.unwrap_or(existing.material);
        let weight = input.weight.unwrap_or(existing.weight);
        if weight < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "weight must not be negative".to_string(),
            ));
        }
        let price = match self.rates.quote(material, weight).await? {
            Some(quoted) => quoted,
            None => input.price.unwrap_or(existing.price),
        };
        if price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }

        let new_slug = match input.slug.as_deref() {
            Some(raw) => Some(resolve_slug(Some(raw), &existing.name).ok_or_else(|| {
                ServiceError::ValidationError(format!("'{}' is not a valid slug", raw))
            })?),
            None => None,
        }
        .filter(|slug| *slug != existing.slug);

        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let old_slug = existing.slug.clone();
        let price_changed = price != existing.price;
        let mut active: product::ActiveModel = existing.into();

        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(gender) = input.gender {
            active.gender = Set(gender);
        }
        if let Some(compare_at_price) = input.compare_at_price {
            active.compare_at_price = Set(Some(compare_at_price));
        }
        if let Some(stock) = input.stock {
            active.stock = Set(stock);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        active.material = Set(material);
        active.weight = Set(weight);
        active.price = Set(price);
        active.updated_at = Set(Utc::now());

        let txn = self.db.begin().await?;
        if let Some(slug) = &new_slug {
            ensure_slug_available(&txn, slug, Some(product_id)).await?;
            clear_redirect_for(&txn, slug).await?;
            record_redirect(&txn, &old_slug, product_id).await?;
            active.slug = Set(slug.clone());
        }
        let updated = active.update(&txn).await?;
        if price_changed {
            refresh_product_market_prices(&txn, product_id, updated.price).await?;
        }
        txn.commit().await?;

        self.revalidate_catalog().await;
        if let Some(slug) = new_slug {
            info!(%product_id, %old_slug, new_slug = %slug, "Product slug changed");
            self.event_sender
                .send_or_log(Event::ProductSlugChanged {
                    product_id,
                    old_slug,
                    new_slug: slug,
                })
                .await;
        }
        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let found = product::Entity::find_by_id(product_id).one(&txn).await?;
        if found.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        product_slug_redirect::Entity::delete_many()
            .filter(product_slug_redirect::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        product_pricing::Entity::delete_many()
            .filter(product_pricing::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        collection_product::Entity::delete_many()
            .filter(collection_product::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        product::Entity::delete_by_id(product_id).exec(&txn).await?;
        txn.commit().await?;

        self.revalidate_catalog().await;
        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;
        info!(%product_id, "Product deleted");
        Ok(())
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Admin listing, newest first
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
        include_inactive: bool,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let per_page = per_page.clamp(1, self.settings.max_page_size);
        let mut query = product::Entity::find();
        if !include_inactive {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(product::Column::Name.contains(term.trim()));
        }
        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Redirects that currently point at `product_id`
    pub async fn list_redirects(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<product_slug_redirect::Model>, ServiceError> {
        Ok(product_slug_redirect::Entity::find()
            .filter(product_slug_redirect::Column::ProductId.eq(product_id))
            .order_by_asc(product_slug_redirect::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Resolves a slug to a product, following retired slugs.
    pub async fn find_by_slug(
        &self,
        slug: &str,
    ) -> Result<SlugLookup<product::Model>, ServiceError> {
        if let Some(found) = product::Entity::find()
            .filter(product::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
        {
            return Ok(SlugLookup::Found(found));
        }

        let redirect = product_slug_redirect::Entity::find()
            .filter(product_slug_redirect::Column::OldSlug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product '{}' not found", slug)))?;
        let target = self.get_product(redirect.product_id).await?;
        debug!(from = %slug, to = %target.slug, "Following slug redirect");
        Ok(SlugLookup::Redirect(target.slug))
    }

    async fn update_images(
        &self,
        product_id: Uuid,
        images: Vec<ProductImage>,
    ) -> Result<Vec<ProductImage>, ServiceError> {
        let existing = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = existing.into();
        active.images = Set(images_json(&images)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        self.revalidate_catalog().await;
        self.event_sender
            .send_or_log(Event::ProductImagesChanged {
                product_id,
                image_count: images.len(),
            })
            .await;
        Ok(images)
    }

    /// Appends images after the existing ones. URLs already present are skipped.
    #[instrument(skip(self, new_images))]
    pub async fn add_images(
        &self,
        product_id: Uuid,
        new_images: Vec<ImageInput>,
    ) -> Result<Vec<ProductImage>, ServiceError> {
        for image in &new_images {
            image.validate()?;
        }
        let mut images = self.get_product(product_id).await?.try_image_list()?;
        let mut known: HashSet<String> = images.iter().map(|img| img.url.clone()).collect();
        for input in new_images {
            if !known.insert(input.url.clone()) {
                continue;
            }
            images.push(ProductImage {
                url: input.url,
                alt: input.alt,
                rank: 0,
            });
        }
        if images.len() > self.settings.max_images_per_product {
            return Err(ServiceError::ValidationError(format!(
                "A product can have at most {} images",
                self.settings.max_images_per_product
            )));
        }
        rerank_images(&mut images);
        self.update_images(product_id, images).await
    }

    /// Removes an image by URL. Removing the last image leaves `[]`.
    #[instrument(skip(self))]
    pub async fn remove_image(
        &self,
        product_id: Uuid,
        url: &str,
    ) -> Result<Vec<ProductImage>, ServiceError> {
        let mut images = self.get_product(product_id).await?.try_image_list()?;
        let before = images.len();
        images.retain(|img| img.url != url);
        if images.len() == before {
            return Err(ServiceError::NotFound(format!("Image {} not found", url)));
        }
        rerank_images(&mut images);
        self.update_images(product_id, images).await
    }

    /// Rewrites image ranks to follow `urls`. Last write wins.
    #[instrument(skip(self, urls))]
    pub async fn reorder_images(
        &self,
        product_id: Uuid,
        urls: Vec<String>,
    ) -> Result<Vec<ProductImage>, ServiceError> {
        let current = self.get_product(product_id).await?.try_image_list()?;
        let mut images = reorder_by(current, &urls, |img| &img.url)?;
        rerank_images(&mut images);
        self.update_images(product_id, images).await
    }

    /// Replaces the attribute list; ranks follow input order.
    #[instrument(skip(self, inputs))]
    pub async fn set_attributes(
        &self,
        product_id: Uuid,
        inputs: Vec<AttributeInput>,
    ) -> Result<Vec<ProductAttribute>, ServiceError> {
        for input in &inputs {
            input.validate()?;
        }
        let attributes = build_attributes(inputs);
        self.write_attributes(product_id, attributes).await
    }

    #[instrument(skip(self, ids))]
    pub async fn reorder_attributes(
        &self,
        product_id: Uuid,
        ids: Vec<Uuid>,
    ) -> Result<Vec<ProductAttribute>, ServiceError> {
        let current = self.get_product(product_id).await?.try_attribute_list()?;
        let mut attributes = reorder_by(current, &ids, |attr| &attr.id)?;
        rerank_attributes(&mut attributes);
        self.write_attributes(product_id, attributes).await
    }

    async fn write_attributes(
        &self,
        product_id: Uuid,
        attributes: Vec<ProductAttribute>,
    ) -> Result<Vec<ProductAttribute>, ServiceError> {
        let existing = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = existing.into();
        active.attributes = Set(serde_json::to_value(&attributes)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        self.revalidator.revalidate(&[paths::PRODUCTS]).await;
        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;
        Ok(attributes)
    }

    /// Active products in catalog order (newest first), served from the
    /// response cache when warm.
    pub async fn catalog_snapshot(&self) -> Result<Vec<product::Model>, ServiceError> {
        let key = paths::PRODUCTS;
        let cache = self.revalidator.cache();
        match cache.get_json::<Vec<product::Model>>(key) {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Discarding unreadable catalog snapshot"),
        }

        let products = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id)
            .all(&*self.db)
            .await?;
        if let Err(e) = cache.set_json(key, &products, Some(self.settings.cache_ttl)) {
            warn!(error = %e, "Failed to cache catalog snapshot");
        }
        Ok(products)
    }

    /// Product ids of a collection in rank order, cached per collection.
    async fn collection_member_ids(&self, slug: &str) -> Result<Vec<Uuid>, ServiceError> {
        let key = format!("{}/{}/members", paths::COLLECTIONS, slug);
        let cache = self.revalidator.cache();
        if let Ok(Some(ids)) = cache.get_json::<Vec<Uuid>>(&key) {
            return Ok(ids);
        }

        let found = collection::Entity::find()
            .filter(collection::Column::Slug.eq(slug))
            .filter(collection::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Collection '{}' not found", slug)))?;
        let ids: Vec<Uuid> = collection_product::Entity::find()
            .filter(collection_product::Column::CollectionId.eq(found.id))
            .order_by_asc(collection_product::Column::Rank)
            .order_by_asc(collection_product::Column::CreatedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|member| member.product_id)
            .collect();
        if let Err(e) = cache.set_json(&key, &ids, Some(self.settings.cache_ttl)) {
            warn!(error = %e, "Failed to cache collection members");
        }
        Ok(ids)
    }

    async fn category_id_for(&self, slug: &str) -> Result<Uuid, ServiceError> {
        category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .filter(category::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .map(|found| found.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Category '{}' not found", slug)))
    }

    async fn projection(&self, market_slug: Option<&str>) -> Result<PriceProjection, ServiceError> {
        let Some(slug) = market_slug.filter(|s| !s.is_empty()) else {
            return Ok(PriceProjection::base(&self.settings.default_currency));
        };
        let found = market::Entity::find()
            .filter(market::Column::Slug.eq(slug))
            .filter(market::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Market '{}' not found", slug)))?;
        let prices = product_pricing::Entity::find()
            .filter(product_pricing::Column::MarketId.eq(found.id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|row| (row.product_id, row.price))
            .collect();
        Ok(PriceProjection {
            currency: found.currency,
            exchange_rate: found.exchange_rate,
            prices,
        })
    }

    /// Storefront listing: snapshot, restrict to category or collection,
    /// filter, sort, paginate, then project prices into the requested market.
    ///
    /// Price filters apply to base-currency prices.
    #[instrument(skip(self))]
    pub async fn storefront_listing(
        &self,
        query: &CatalogQuery,
    ) -> Result<StorefrontPage, ServiceError> {
        let (filter, sort) = ProductFilter::from_query(query);
        let mut products = self.catalog_snapshot().await?;

        if let Some(category_slug) = &filter.category {
            let category_id = self.category_id_for(category_slug).await?;
            products.retain(|item| item.category_id == Some(category_id));
        }
        if let Some(collection_slug) = &filter.collection {
            let member_ids = self.collection_member_ids(collection_slug).await?;
            let mut by_id: HashMap<Uuid, product::Model> =
                products.into_iter().map(|item| (item.id, item)).collect();
            products = member_ids
                .iter()
                .filter_map(|id| by_id.remove(id))
                .collect();
        }

        let selected = catalog_filter::apply(products, &filter, sort);
        let total = selected.len() as u64;
        let per_page = query
            .per_page
            .unwrap_or(24)
            .clamp(1, self.settings.max_page_size);
        let page = query.page.unwrap_or(1).max(1);
        let projection = self.projection(query.market.as_deref()).await?;

        let items = selected
            .iter()
            .skip(((page - 1) * per_page) as usize)
            .take(per_page as usize)
            .map(|item| projection.summary(item))
            .collect();

        Ok(StorefrontPage {
            items,
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
            currency: projection.currency,
            query: filter.to_query_string(sort),
        })
    }

    /// Storefront detail by slug. Inactive products read as missing.
    pub async fn storefront_product(
        &self,
        slug: &str,
        market_slug: Option<&str>,
    ) -> Result<SlugLookup<StorefrontProductDetail>, ServiceError> {
        let item = match self.find_by_slug(slug).await? {
            SlugLookup::Found(item) => item,
            SlugLookup::Redirect(canonical) => return Ok(SlugLookup::Redirect(canonical)),
        };
        if !item.is_active {
            return Err(ServiceError::NotFound(format!(
                "Product '{}' not found",
                slug
            )));
        }

        let projection = self.projection(market_slug).await?;
        Ok(SlugLookup::Found(StorefrontProductDetail {
            summary: projection.summary(&item),
            description: item.description.clone(),
            category_id: item.category_id,
            images: item.image_list(),
            attributes: item.attribute_list(),
        }))
    }

    /// Writes uploaded image URLs onto the product. Used by the upload
    /// flow and its retry worker.
    pub async fn attach_uploaded_images(
        &self,
        product_id: Uuid,
        images: Vec<ImageInput>,
    ) -> Result<Vec<ProductImage>, ServiceError> {
        self.add_images(product_id, images).await.map_err(|e| {
            error!(%product_id, error = %e, "Failed to attach uploaded images");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn image(url: &str) -> ProductImage {
        ProductImage {
            url: url.to_string(),
            alt: None,
            rank: 0,
        }
    }

    #[test]
    fn reorder_moves_named_items_first() {
        let current = vec![image("a"), image("b"), image("c")];
        let ordered = reorder_by(current, &["c".to_string()], |img| &img.url).unwrap();
        let urls: Vec<_> = ordered.iter().map(|img| img.url.as_str()).collect();
        assert_eq!(urls, vec!["c", "a", "b"]);
    }

    #[test]
    fn reorder_rejects_unknown_and_duplicate_keys() {
        let current = vec![image("a"), image("b")];
        assert!(matches!(
            reorder_by(current.clone(), &["z".to_string()], |img| &img.url),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            reorder_by(current, &["a".to_string(), "a".to_string()], |img| &img.url),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn empty_image_list_serializes_as_array() {
        let mut images: Vec<ProductImage> = Vec::new();
        rerank_images(&mut images);
        assert_eq!(images_json(&images).unwrap(), serde_json::json!([]));
    }

    #[test]
    fn attributes_rank_in_input_order() {
        let attributes = build_attributes(vec![
            AttributeInput {
                id: None,
                name: " Purity ".into(),
                value: "22K".into(),
            },
            AttributeInput {
                id: Some(Uuid::nil()),
                name: "Finish".into(),
                value: "Matte".into(),
            },
        ]);
        assert_eq!(attributes[0].name, "Purity");
        assert_eq!(attributes[0].rank, 0);
        assert_eq!(attributes[1].id, Uuid::nil());
        assert_eq!(attributes[1].rank, 1);
    }

    #[test]
    fn projection_falls_back_to_exchange_rate() {
        let now = Utc::now();
        let item = product::Model {
            id: Uuid::new_v4(),
            name: "Band".into(),
            slug: "band".into(),
            description: None,
            material: Material::Gold,
            gender: Gender::Unisex,
            weight: dec!(2),
            price: dec!(1000),
            compare_at_price: Some(dec!(1200)),
            stock: 0,
            is_active: true,
            category_id: None,
            images: serde_json::json!([]),
            attributes: serde_json::json!([]),
            created_at: now,
            updated_at: now,
        };
        let mut projection = PriceProjection {
            currency: "USD".into(),
            exchange_rate: dec!(0.5),
            prices: HashMap::new(),
        };
        let summary = projection.summary(&item);
        assert_eq!(summary.price, dec!(500));
        assert_eq!(summary.compare_at_price, Some(dec!(600)));
        assert!(!summary.in_stock);

        projection.prices.insert(item.id, dec!(450));
        assert_eq!(projection.summary(&item).price, dec!(450));
    }
}
