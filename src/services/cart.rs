//! Server-side cart, one per user.

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

use crate::entities::{cart, cart_item, market, product, product::ProductImage, product_pricing};
use crate::errors::ServiceError;
use crate::services::pricing::market_price;

/// Upper bound on the quantity of a single cart line
pub const MAX_LINE_QUANTITY: i32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: Option<ProductImage>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// False when the product was deactivated or stock fell below the quantity
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub cart_id: Uuid,
    pub currency: String,
    pub items: Vec<CartLine>,
    pub item_count: i32,
    pub subtotal: Decimal,
}

/// Market a cart or order is priced in; `None` means the base currency.
pub(crate) async fn resolve_market<C: ConnectionTrait>(
    conn: &C,
    slug: Option<&str>,
) -> Result<Option<market::Model>, ServiceError> {
    let Some(slug) = slug.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    market::Entity::find()
        .filter(market::Column::Slug.eq(slug))
        .filter(market::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .map(Some)
        .ok_or_else(|| ServiceError::NotFound(format!("Market '{}' not found", slug)))
}

/// Unit price of `item` in `target`, or its base price.
pub(crate) async fn unit_price<C: ConnectionTrait>(
    conn: &C,
    item: &product::Model,
    target: Option<&market::Model>,
) -> Result<Decimal, ServiceError> {
    let Some(target) = target else {
        return Ok(item.price);
    };
    let row = product_pricing::Entity::find()
        .filter(product_pricing::Column::ProductId.eq(item.id))
        .filter(product_pricing::Column::MarketId.eq(target.id))
        .one(conn)
        .await?;
    Ok(row
        .map(|row| row.price)
        .unwrap_or_else(|| market_price(item.price, target.exchange_rate)))
}

/// Finds the user's cart, creating it on first use.
pub(crate) async fn cart_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<cart::Model, ServiceError> {
    let now = Utc::now();
    cart::Entity::insert(cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::column(cart::Column::UserId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::InternalError("Cart missing after upsert".to_string()))
}

fn check_quantity(quantity: i32) -> Result<(), ServiceError> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(ServiceError::ValidationError(format!(
            "quantity must be between 1 and {}",
            MAX_LINE_QUANTITY
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    default_currency: String,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, default_currency: impl Into<String>) -> Self {
        Self {
            db,
            default_currency: default_currency.into(),
        }
    }

    async fn sellable_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .filter(|item| item.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Cart contents priced in `market_slug`, or in the base currency.
    pub async fn view_cart(
        &self,
        user_id: Uuid,
        market_slug: Option<&str>,
    ) -> Result<CartView, ServiceError> {
        let target = resolve_market(&*self.db, market_slug).await?;
        let cart = cart_for_user(&*self.db, user_id).await?;
        let rows = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for (line, found) in rows {
            let Some(item) = found else { continue };
            let unit = unit_price(&*self.db, &item, target.as_ref()).await?;
            items.push(CartLine {
                product_id: item.id,
                name: item.name.clone(),
                slug: item.slug.clone(),
                image: item.image_list().into_iter().next(),
                quantity: line.quantity,
                unit_price: unit,
                line_total: unit * Decimal::from(line.quantity),
                available: item.is_active && item.stock >= line.quantity,
            });
        }

        Ok(CartView {
            cart_id: cart.id,
            currency: target
                .map(|m| m.currency)
                .unwrap_or_else(|| self.default_currency.clone()),
            item_count: items.iter().map(|line| line.quantity).sum(),
            subtotal: items.iter().map(|line| line.line_total).sum(),
            items,
        })
    }

    /// Adds `quantity` of a product; an existing line is incremented.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        check_quantity(quantity)?;
        let item = self.sellable_product(product_id).await?;

        let txn = self.db.begin().await?;
        let cart = cart_for_user(&txn, user_id).await?;
        let existing = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        let now = Utc::now();
        let new_quantity = existing.as_ref().map(|line| line.quantity).unwrap_or(0) + quantity;
        check_quantity(new_quantity)?;
        if new_quantity > item.stock {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} of {} in stock",
                item.stock, item.name
            )));
        }

        match existing {
            Some(line) => {
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(new_quantity);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(product_id),
                    quantity: Set(new_quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;
            }
        }
        txn.commit().await?;

        info!(%user_id, %product_id, quantity = new_quantity, "Cart line updated");
        self.view_cart(user_id, None).await
    }

    /// Sets a line's quantity; zero removes the line.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity == 0 {
            return self.remove_item(user_id, product_id).await;
        }
        check_quantity(quantity)?;
        let item = self.sellable_product(product_id).await?;
        if quantity > item.stock {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} of {} in stock",
                item.stock, item.name
            )));
        }

        let cart = cart_for_user(&*self.db, user_id).await?;
        let line = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} is not in the cart", product_id)))?;
        let mut active: cart_item::ActiveModel = line.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        self.view_cart(user_id, None).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let cart = cart_for_user(&*self.db, user_id).await?;
        let result = cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} is not in the cart",
                product_id
            )));
        }
        self.view_cart(user_id, None).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let cart = cart_for_user(&*self.db, user_id).await?;
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_bounds() {
        assert!(check_quantity(0).is_err());
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(check_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }
}
