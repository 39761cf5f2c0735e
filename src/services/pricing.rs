//! Material-rate driven pricing.
//!
//! Products made of a rated material carry `price = round(weight × rate)`.
//! Setting a daily rate records it in the rate history and, when the date is
//! not older than the rate currently applied, reprices every product of that
//! material together with its per-market prices. The whole cascade commits or
//! rolls back as one transaction.

use chrono::{NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cache::{paths, Revalidator};
use crate::entities::{
    daily_material_rate, market, material_rate, product, product_pricing, Material,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::tracing::with_metrics;

/// `round(weight × rate)`, half away from zero, whole units.
pub fn price_for_weight(weight: Decimal, rate_per_gram: Decimal) -> Decimal {
    (weight * rate_per_gram).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a base-currency price into a market's currency, whole units.
pub fn market_price(base_price: Decimal, exchange_rate: Decimal) -> Decimal {
    (base_price * exchange_rate).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Outcome of [`MaterialRateService::set_daily_rate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatePropagationReport {
    pub material: Material,
    pub rate_date: NaiveDate,
    pub rate_per_gram: Decimal,
    /// False when the date is older than the rate already applied
    pub applied_as_current: bool,
    pub products_repriced: u64,
    pub market_prices_updated: u64,
}

/// Writes the automatic price of `product_id` in `market`, leaving manual
/// overrides alone. Returns whether a row was written.
pub(crate) async fn upsert_market_price<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    market: &market::Model,
    base_price: Decimal,
) -> Result<bool, ServiceError> {
    let existing = product_pricing::Entity::find()
        .filter(product_pricing::Column::ProductId.eq(product_id))
        .filter(product_pricing::Column::MarketId.eq(market.id))
        .one(conn)
        .await?;

    if existing.as_ref().map(|row| row.is_manual).unwrap_or(false) {
        return Ok(false);
    }

    product_pricing::Entity::insert(product_pricing::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        market_id: Set(market.id),
        price: Set(market_price(base_price, market.exchange_rate)),
        is_manual: Set(false),
        updated_at: Set(Utc::now()),
    })
    .on_conflict(
        OnConflict::columns([
            product_pricing::Column::ProductId,
            product_pricing::Column::MarketId,
        ])
        .update_columns([
            product_pricing::Column::Price,
            product_pricing::Column::UpdatedAt,
        ])
        .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Ok(true)
}

/// Refreshes a product's automatic prices in every market.
pub(crate) async fn refresh_product_market_prices<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    base_price: Decimal,
) -> Result<u64, ServiceError> {
    let markets = market::Entity::find().all(conn).await?;
    let mut written = 0;
    for market in &markets {
        if upsert_market_price(conn, product_id, market, base_price).await? {
            written += 1;
        }
    }
    Ok(written)
}

/// Reprices all products of `material` at `rate_per_gram`.
/// Returns (products repriced, market price rows written).
async fn reprice_products<C: ConnectionTrait>(
    conn: &C,
    material: Material,
    rate_per_gram: Decimal,
) -> Result<(u64, u64), ServiceError> {
    let products = product::Entity::find()
        .filter(product::Column::Material.eq(material))
        .all(conn)
        .await?;
    let markets = market::Entity::find().all(conn).await?;
    let now = Utc::now();

    let mut repriced = 0;
    let mut market_rows = 0;
    for item in products {
        let new_price = price_for_weight(item.weight, rate_per_gram);
        let product_id = item.id;

        let mut active: product::ActiveModel = item.into();
        active.price = Set(new_price);
        active.updated_at = Set(now);
        active.update(conn).await?;
        repriced += 1;

        for market in &markets {
            if upsert_market_price(conn, product_id, market, new_price).await? {
                market_rows += 1;
            }
        }
    }

    Ok((repriced, market_rows))
}

#[derive(Clone)]
pub struct MaterialRateService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    revalidator: Arc<Revalidator>,
}

impl MaterialRateService {
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

    /// Records the rate for `(material, rate_date)` and propagates it.
    ///
    /// The history row is written with a single `INSERT .. ON CONFLICT DO
    /// UPDATE`, so concurrent or repeated calls for the same day update the
    /// row in place. When `rate_date` is on or after the current effective
    /// date the rate becomes current and every product of the material is
    /// repriced, along with its automatic market prices. Nothing is visible
    /// until the transaction commits.
    #[instrument(skip(self))]
    pub async fn set_daily_rate(
        &self,
        material: Material,
        rate_date: NaiveDate,
        rate_per_gram: Decimal,
    ) -> Result<RatePropagationReport, ServiceError> {
        if rate_per_gram <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "rate_per_gram must be greater than zero".to_string(),
            ));
        }

        let result = with_metrics("pricing.set_daily_rate", || {
            self.propagate(material, rate_date, rate_per_gram)
        })
        .await?;

        if result.applied_as_current {
            self.revalidator
                .revalidate(&[paths::PRODUCTS, paths::COLLECTIONS, paths::CATEGORIES])
                .await;
        }
        self.event_sender
            .send_or_log(Event::MaterialRateSet {
                material,
                rate_date,
                rate_per_gram,
                products_repriced: result.products_repriced,
            })
            .await;

        info!(
            %material,
            %rate_date,
            %rate_per_gram,
            applied = result.applied_as_current,
            products = result.products_repriced,
            market_prices = result.market_prices_updated,
            "Daily rate recorded"
        );
        Ok(result)
    }

    async fn propagate(
        &self,
        material: Material,
        rate_date: NaiveDate,
        rate_per_gram: Decimal,
    ) -> Result<RatePropagationReport, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        daily_material_rate::Entity::insert(daily_material_rate::ActiveModel {
            id: Set(Uuid::new_v4()),
            material: Set(material),
            rate_date: Set(rate_date),
            rate_per_gram: Set(rate_per_gram),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::columns([
                daily_material_rate::Column::Material,
                daily_material_rate::Column::RateDate,
            ])
            .update_columns([
                daily_material_rate::Column::RatePerGram,
                daily_material_rate::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        let current = material_rate::Entity::find()
            .filter(material_rate::Column::Material.eq(material))
            .one(&txn)
            .await?;
        let applied_as_current = current
            .map(|rate| rate_date >= rate.effective_date)
            .unwrap_or(true);

        let (products_repriced, market_prices_updated) = if applied_as_current {
            material_rate::Entity::insert(material_rate::ActiveModel {
                id: Set(Uuid::new_v4()),
                material: Set(material),
                rate_per_gram: Set(rate_per_gram),
                effective_date: Set(rate_date),
                updated_at: Set(now),
            })
            .on_conflict(
                OnConflict::column(material_rate::Column::Material)
                    .update_columns([
                        material_rate::Column::RatePerGram,
                        material_rate::Column::EffectiveDate,
                        material_rate::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

            reprice_products(&txn, material, rate_per_gram).await?
        } else {
            (0, 0)
        };

        txn.commit().await?;

        Ok(RatePropagationReport {
            material,
            rate_date,
            rate_per_gram,
            applied_as_current,
            products_repriced,
            market_prices_updated,
        })
    }

    /// Reprices products of `material` from its current rate.
    #[instrument(skip(self))]
    pub async fn reprice_material(
        &self,
        material: Material,
    ) -> Result<RatePropagationReport, ServiceError> {
        let current = self.current_rate(material).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("No current rate for material {}", material))
        })?;

        let txn = self.db.begin().await?;
        let (products_repriced, market_prices_updated) =
            reprice_products(&txn, material, current.rate_per_gram).await?;
        txn.commit().await?;

        self.revalidator
            .revalidate(&[paths::PRODUCTS, paths::COLLECTIONS, paths::CATEGORIES])
            .await;
        info!(%material, products_repriced, "Material repriced");

        Ok(RatePropagationReport {
            material,
            rate_date: current.effective_date,
            rate_per_gram: current.rate_per_gram,
            applied_as_current: true,
            products_repriced,
            market_prices_updated,
        })
    }

    pub async fn current_rate(
        &self,
        material: Material,
    ) -> Result<Option<material_rate::Model>, ServiceError> {
        Ok(material_rate::Entity::find()
            .filter(material_rate::Column::Material.eq(material))
            .one(&*self.db)
            .await?)
    }

    pub async fn list_current_rates(&self) -> Result<Vec<material_rate::Model>, ServiceError> {
        Ok(material_rate::Entity::find()
            .order_by_asc(material_rate::Column::Material)
            .all(&*self.db)
            .await?)
    }

    /// Rate history for a material, newest first, optionally bounded by dates (inclusive)
    pub async fn list_daily_rates(
        &self,
        material: Material,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<daily_material_rate::Model>, ServiceError> {
        let mut query = daily_material_rate::Entity::find()
            .filter(daily_material_rate::Column::Material.eq(material));
        if let Some(from) = from {
            query = query.filter(daily_material_rate::Column::RateDate.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(daily_material_rate::Column::RateDate.lte(to));
        }
        Ok(query
            .order_by_desc(daily_material_rate::Column::RateDate)
            .all(&*self.db)
            .await?)
    }

    /// Price for a new or edited product of `material`, if a rate is set.
    pub async fn quote(
        &self,
        material: Material,
        weight: Decimal,
    ) -> Result<Option<Decimal>, ServiceError> {
        Ok(self
            .current_rate(material)
            .await?
            .map(|rate| price_for_weight(weight, rate.rate_per_gram)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_rounds_half_away_from_zero() {
        assert_eq!(price_for_weight(dec!(2.5), dec!(6000)), dec!(15000));
        assert_eq!(price_for_weight(dec!(1.25), dec!(2)), dec!(3));
        assert_eq!(price_for_weight(dec!(1.2), dec!(2)), dec!(2));
        assert_eq!(price_for_weight(dec!(0), dec!(6000)), dec!(0));
    }

    #[test]
    fn market_price_converts_and_rounds() {
        assert_eq!(market_price(dec!(15000), dec!(0.012)), dec!(180));
        assert_eq!(market_price(dec!(101), dec!(0.5)), dec!(51));
    }
}
