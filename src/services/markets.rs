use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::cache::{paths, Revalidator};
use crate::entities::{market, product, product_pricing};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::pricing::upsert_market_price;
use crate::services::slug::resolve_slug;

fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(ValidationError::new("currency_code"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMarketInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub slug: Option<String>,
    /// ISO 4217 code
    #[validate(custom = "validate_currency")]
    pub currency: String,
    /// Market currency units per base currency unit
    pub exchange_rate: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMarketInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub slug: Option<String>,
    #[validate(custom = "validate_currency")]
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarketWithPricing {
    #[schema(value_type = Object)]
    pub market: market::Model,
    pub prices_regenerated: u64,
}

/// A product's price in one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductMarketPrice {
    pub market_id: Uuid,
    pub market_slug: String,
    pub currency: String,
    pub price: Decimal,
    pub is_manual: bool,
}

fn ensure_positive_rate(rate: Decimal) -> Result<(), ServiceError> {
    if rate <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "exchange_rate must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Upserts automatic prices of every product into `market`.
async fn regenerate_prices<C: ConnectionTrait>(
    conn: &C,
    target: &market::Model,
) -> Result<u64, ServiceError> {
    let products = product::Entity::find().all(conn).await?;
    let mut written = 0;
    for item in &products {
        if upsert_market_price(conn, item.id, target, item.price).await? {
            written += 1;
        }
    }
    Ok(written)
}

async fn ensure_unique_slug<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = market::Entity::find().filter(market::Column::Slug.eq(slug));
    if let Some(id) = except {
        query = query.filter(market::Column::Id.ne(id));
    }
    if query.one(conn).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "Market slug '{}' is already in use",
            slug
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct MarketService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    revalidator: Arc<Revalidator>,
}

impl MarketService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        revalidator: Arc<Revalidator>,
    ) -> Self {
        Self {
            db,
            event_sender,
            revalidator,
        }
    }

    async fn changed(&self, market_id: Uuid, prices_regenerated: u64) {
        self.revalidator
            .revalidate(&[paths::MARKETS, paths::PRODUCTS, paths::COLLECTIONS])
            .await;
        self.event_sender
            .send_or_log(Event::MarketChanged {
                market_id,
                prices_regenerated,
            })
            .await;
    }

    /// Creates the market and prices every product in it, in one transaction.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_market(
        &self,
        input: CreateMarketInput,
    ) -> Result<MarketWithPricing, ServiceError> {
        input.validate()?;
        ensure_positive_rate(input.exchange_rate)?;
        let slug = resolve_slug(input.slug.as_deref(), &input.name).ok_or_else(|| {
            ServiceError::ValidationError("A valid slug could not be derived".to_string())
        })?;

        let txn = self.db.begin().await?;
        ensure_unique_slug(&txn, &slug, None).await?;
        let now = Utc::now();
        let created = market::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            slug: Set(slug),
            currency: Set(input.currency.to_ascii_uppercase()),
            exchange_rate: Set(input.exchange_rate),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        let prices_regenerated = regenerate_prices(&txn, &created).await?;
        txn.commit().await?;

        self.changed(created.id, prices_regenerated).await;
        info!(market_id = %created.id, slug = %created.slug, prices_regenerated, "Market created");
        Ok(MarketWithPricing {
            market: created,
            prices_regenerated,
        })
    }

    /// Updates the market and regenerates its automatic prices, in one
    /// transaction. Manual overrides are kept.
    #[instrument(skip(self, input))]
    pub async fn update_market(
        &self,
        id: Uuid,
        input: UpdateMarketInput,
    ) -> Result<MarketWithPricing, ServiceError> {
        input.validate()?;
        if let Some(rate) = input.exchange_rate {
            ensure_positive_rate(rate)?;
        }

        let txn = self.db.begin().await?;
        let existing = market::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Market {} not found", id)))?;
        let mut active: market::ActiveModel = existing.clone().into();

        if let Some(raw) = input.slug.as_deref() {
            let slug = resolve_slug(Some(raw), &existing.name).ok_or_else(|| {
                ServiceError::ValidationError(format!("'{}' is not a valid slug", raw))
            })?;
            if slug != existing.slug {
                ensure_unique_slug(&txn, &slug, Some(id)).await?;
                active.slug = Set(slug);
            }
        }
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency.to_ascii_uppercase());
        }
        if let Some(rate) = input.exchange_rate {
            active.exchange_rate = Set(rate);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        let prices_regenerated = regenerate_prices(&txn, &updated).await?;
        txn.commit().await?;

        self.changed(id, prices_regenerated).await;
        info!(market_id = %id, prices_regenerated, "Market updated");
        Ok(MarketWithPricing {
            market: updated,
            prices_regenerated,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_market(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        if market::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Market {} not found", id)));
        }
        product_pricing::Entity::delete_many()
            .filter(product_pricing::Column::MarketId.eq(id))
            .exec(&txn)
            .await?;
        market::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        self.revalidator
            .revalidate(&[paths::MARKETS, paths::PRODUCTS, paths::COLLECTIONS])
            .await;
        self.event_sender.send_or_log(Event::MarketDeleted(id)).await;
        info!(market_id = %id, "Market deleted");
        Ok(())
    }

    pub async fn get_market(&self, id: Uuid) -> Result<market::Model, ServiceError> {
        market::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Market {} not found", id)))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<market::Model, ServiceError> {
        market::Entity::find()
            .filter(market::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Market '{}' not found", slug)))
    }

    pub async fn list_markets(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<market::Model>, ServiceError> {
        let mut query = market::Entity::find();
        if !include_inactive {
            query = query.filter(market::Column::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(market::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Pins a product's price in a market. Pinned prices survive rate
    /// changes and market regeneration until cleared.
    #[instrument(skip(self))]
    pub async fn set_product_price(
        &self,
        product_id: Uuid,
        market_id: Uuid,
        price: Decimal,
    ) -> Result<product_pricing::Model, ServiceError> {
        if price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }
        self.get_market(market_id).await?;
        if product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!("Product {} not found", product_id)));
        }

        product_pricing::Entity::insert(product_pricing::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            market_id: Set(market_id),
            price: Set(price),
            is_manual: Set(true),
            updated_at: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::columns([
                product_pricing::Column::ProductId,
                product_pricing::Column::MarketId,
            ])
            .update_columns([
                product_pricing::Column::Price,
                product_pricing::Column::IsManual,
                product_pricing::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(&*self.db)
        .await?;

        self.revalidator.revalidate(&[paths::PRODUCTS]).await;
        self.find_price_row(product_id, market_id).await
    }

    /// Drops a pinned price and restores the converted automatic price.
    #[instrument(skip(self))]
    pub async fn clear_product_price(
        &self,
        product_id: Uuid,
        market_id: Uuid,
    ) -> Result<product_pricing::Model, ServiceError> {
        let target = self.get_market(market_id).await?;
        let txn = self.db.begin().await?;
        let item = product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        product_pricing::Entity::delete_many()
            .filter(product_pricing::Column::ProductId.eq(product_id))
            .filter(product_pricing::Column::MarketId.eq(market_id))
            .exec(&txn)
            .await?;
        upsert_market_price(&txn, product_id, &target, item.price).await?;
        txn.commit().await?;

        self.revalidator.revalidate(&[paths::PRODUCTS]).await;
        self.find_price_row(product_id, market_id).await
    }

    async fn find_price_row(
        &self,
        product_id: Uuid,
        market_id: Uuid,
    ) -> Result<product_pricing::Model, ServiceError> {
        product_pricing::Entity::find()
            .filter(product_pricing::Column::ProductId.eq(product_id))
            .filter(product_pricing::Column::MarketId.eq(market_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("Pricing row missing after write".to_string())
            })
    }

    /// A product's price in every market that has one
    pub async fn list_product_prices(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<ProductMarketPrice>, ServiceError> {
        let rows = product_pricing::Entity::find()
            .filter(product_pricing::Column::ProductId.eq(product_id))
            .find_also_related(market::Entity)
            .all(&*self.db)
            .await?;
        let mut prices: Vec<ProductMarketPrice> = rows
            .into_iter()
            .filter_map(|(row, found)| {
                found.map(|m| ProductMarketPrice {
                    market_id: m.id,
                    market_slug: m.slug,
                    currency: m.currency,
                    price: row.price,
                    is_manual: row.is_manual,
                })
            })
            .collect();
        prices.sort_by(|a, b| a.market_slug.cmp(&b.market_slug));
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_codes_are_three_letters() {
        assert!(validate_currency("USD").is_ok());
        assert!(validate_currency("usd").is_ok());
        assert!(validate_currency("US").is_err());
        assert!(validate_currency("US1").is_err());
    }

    #[test]
    fn non_positive_rates_are_rejected() {
        assert!(ensure_positive_rate(Decimal::ZERO).is_err());
        assert!(ensure_positive_rate(Decimal::NEGATIVE_ONE).is_err());
        assert!(ensure_positive_rate(Decimal::ONE).is_ok());
    }
}
