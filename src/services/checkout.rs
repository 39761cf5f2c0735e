//! Turns a user's cart into an order.

use chrono::Utc;
use metrics::{counter, histogram};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{paths, Revalidator};
use crate::entities::{
    cart_item, order, order::OrderStatus, order_item, product, promotion, user,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::cart::{cart_for_user, resolve_market, unit_price};
use crate::services::orders::OrderWithItems;
use crate::services::promotions::apply_code;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 2, max = 20))]
    pub postal_code: String,
    /// ISO 3166-1 alpha-2
    #[validate(length(equal = 2))]
    pub country: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckoutInput {
    /// Defaults to the account email
    #[validate(email)]
    pub email: Option<String>,
    #[validate]
    pub shipping_address: ShippingAddress,
    pub promotion_code: Option<String>,
    /// Market slug to price the order in
    pub market: Option<String>,
}

/// `LUS-20260118-3F9A1C22D04E`. The suffix is the first 48 bits of the
/// order id, all random for v4 ids; the column is unique as well.
fn order_number(order_id: Uuid) -> String {
    let suffix: String = order_id
        .simple()
        .to_string()
        .chars()
        .take(12)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("LUS-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    revalidator: Arc<Revalidator>,
    default_currency: String,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        revalidator: Arc<Revalidator>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            db,
            event_sender,
            revalidator,
            default_currency: default_currency.into(),
        }
    }

    /// Prices the cart, applies the promotion, reserves stock, writes the
    /// order and empties the cart. Any failure rolls everything back.
    #[instrument(skip(self, input))]
    pub async fn checkout(
        &self,
        user_id: Uuid,
        input: CheckoutInput,
    ) -> Result<OrderWithItems, ServiceError> {
        input.validate()?;
        let result = self.place_order(user_id, input).await;
        if let Err(e) = &result {
            counter!("lustre_checkout_failures_total", 1);
            error!(%user_id, error = %e, "Checkout failed");
        }
        let placed = result?;

        counter!("lustre_orders_placed_total", 1, "currency" => placed.order.currency.clone());
        histogram!(
            "lustre_order_total",
            placed.order.total.to_f64().unwrap_or_default()
        );
        self.revalidator.revalidate(&[paths::PRODUCTS]).await;
        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id: placed.order.id,
                user_id,
                total: placed.order.total,
            })
            .await;
        info!(
            order_id = %placed.order.id,
            order_number = %placed.order.order_number,
            total = %placed.order.total,
            "Order placed"
        );
        Ok(placed)
    }

    async fn place_order(
        &self,
        user_id: Uuid,
        input: CheckoutInput,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;
        let account = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Unknown user".to_string()))?;
        let target = resolve_market(&txn, input.market.as_deref()).await?;
        let cart = cart_for_user(&txn, user_id).await?;
        let lines = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&txn)
            .await?;
        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }

        let order_id = Uuid::new_v4();
        let mut items = Vec::with_capacity(lines.len());
        let mut subtotal = Decimal::ZERO;
        for line in &lines {
            let item = product::Entity::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .filter(|item| item.is_active)
                .ok_or_else(|| {
                    ServiceError::InvalidOperation(format!(
                        "Product {} is no longer available",
                        line.product_id
                    ))
                })?;

            // Conditional decrement; zero rows means someone else took the stock.
            let reserved = product::Entity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(line.quantity),
                )
                .filter(product::Column::Id.eq(item.id))
                .filter(product::Column::Stock.gte(line.quantity))
                .exec(&txn)
                .await?;
            if reserved.rows_affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "Only {} of {} in stock",
                    item.stock, item.name
                )));
            }

            let unit = unit_price(&txn, &item, target.as_ref()).await?;
            let line_total = unit * Decimal::from(line.quantity);
            subtotal += line_total;
            items.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.id),
                product_name: Set(item.name.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(unit),
                line_total: Set(line_total),
            });
        }

        let now = Utc::now();
        let (discount, promotion_code) = match input
            .promotion_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
        {
            Some(code) => {
                let (promo, applied) = apply_code(&txn, code, subtotal, now).await?;
                let consumed = promotion::Entity::update_many()
                    .col_expr(
                        promotion::Column::TimesUsed,
                        Expr::col(promotion::Column::TimesUsed).add(1),
                    )
                    .filter(promotion::Column::Id.eq(promo.id))
                    .filter(
                        Condition::any()
                            .add(promotion::Column::UsageLimit.is_null())
                            .add(
                                Expr::col(promotion::Column::TimesUsed)
                                    .lt(Expr::col(promotion::Column::UsageLimit)),
                            ),
                    )
                    .exec(&txn)
                    .await?;
                if consumed.rows_affected == 0 {
                    return Err(ServiceError::ValidationError(format!(
                        "Promotion {} has reached its usage limit",
                        promo.code
                    )));
                }
                (applied.discount, Some(applied.code))
            }
            None => (Decimal::ZERO, None),
        };

        let created = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number(order_id)),
            user_id: Set(user_id),
            email: Set(input.email.unwrap_or(account.email)),
            status: Set(OrderStatus::Pending),
            currency: Set(target
                .as_ref()
                .map(|m| m.currency.clone())
                .unwrap_or_else(|| self.default_currency.clone())),
            market_id: Set(target.as_ref().map(|m| m.id)),
            subtotal: Set(subtotal),
            discount: Set(discount),
            total: Set(subtotal - discount),
            promotion_code: Set(promotion_code),
            shipping_address: Set(serde_json::to_value(&input.shipping_address)?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut saved_items = Vec::with_capacity(items.len());
        for item in items {
            saved_items.push(item.insert(&txn).await?);
        }
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        Ok(OrderWithItems {
            order: created,
            items: saved_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_carry_date_and_id_prefix() {
        let id = Uuid::parse_str("3f9a1c22-d04e-4000-8000-000000000000").unwrap();
        let number = order_number(id);
        assert!(number.starts_with("LUS-"));
        assert!(number.ends_with("-3F9A1C22D04E"));
        assert_eq!(number.len(), "LUS-20260118-3F9A1C22D04E".len());
    }

    #[test]
    fn ids_sharing_a_short_prefix_get_distinct_numbers() {
        let a = Uuid::parse_str("3f9a1c22-d04e-4000-8000-000000000000").unwrap();
        let b = Uuid::parse_str("3f9a1c99-aaaa-4000-8000-000000000000").unwrap();
        assert_ne!(order_number(a), order_number(b));
    }
}
