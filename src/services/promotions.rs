use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::promotion::{self, DiscountKind};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePromotionInput {
    #[validate(length(min = 3, max = 40))]
    pub code: String,
    #[validate(length(max = 300))]
    pub description: Option<String>,
    pub discount_kind: DiscountKind,
    pub value: Decimal,
    pub min_subtotal: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePromotionInput {
    #[validate(length(max = 300))]
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub min_subtotal: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
}

/// A code that passed validation and the discount it gives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedPromotion {
    pub code: String,
    pub discount: Decimal,
    pub subtotal_after_discount: Decimal,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn check_value(kind: DiscountKind, value: Decimal) -> Result<(), ServiceError> {
    let valid = match kind {
        DiscountKind::Percentage => value > Decimal::ZERO && value <= Decimal::ONE_HUNDRED,
        DiscountKind::Fixed => value > Decimal::ZERO,
    };
    if valid {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "Invalid discount value {} for a {:?} promotion",
            value, kind
        )))
    }
}

fn check_window(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), ServiceError> {
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if end <= start {
            return Err(ServiceError::ValidationError(
                "ends_at must be after starts_at".to_string(),
            ));
        }
    }
    Ok(())
}

/// Discount for `subtotal`, never more than the subtotal itself.
pub fn discount_for(promo: &promotion::Model, subtotal: Decimal) -> Decimal {
    let raw = match promo.discount_kind {
        DiscountKind::Percentage => (subtotal * promo.value / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        DiscountKind::Fixed => promo.value,
    };
    raw.min(subtotal).max(Decimal::ZERO)
}

/// Checks that `promo` can be used now for `subtotal`.
pub fn check_applicable(
    promo: &promotion::Model,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let reject = |reason: &str| {
        Err(ServiceError::ValidationError(format!(
            "Promotion {} {}",
            promo.code, reason
        )))
    };
    if !promo.is_active {
        return reject("is not active");
    }
    if promo.starts_at.map(|start| now < start).unwrap_or(false) {
        return reject("has not started");
    }
    if promo.ends_at.map(|end| now > end).unwrap_or(false) {
        return reject("has expired");
    }
    if promo
        .usage_limit
        .map(|limit| promo.times_used >= limit)
        .unwrap_or(false)
    {
        return reject("has reached its usage limit");
    }
    if let Some(min) = promo.min_subtotal {
        if subtotal < min {
            return Err(ServiceError::ValidationError(format!(
                "Promotion {} requires a subtotal of at least {}",
                promo.code, min
            )));
        }
    }
    Ok(())
}

/// Looks a code up on `conn` and applies it to `subtotal`.
pub(crate) async fn apply_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<(promotion::Model, AppliedPromotion), ServiceError> {
    let code = normalize_code(code);
    let promo = promotion::Entity::find()
        .filter(promotion::Column::Code.eq(code.as_str()))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown promotion code {}", code)))?;
    check_applicable(&promo, subtotal, now)?;
    let discount = discount_for(&promo, subtotal);
    let applied = AppliedPromotion {
        code: promo.code.clone(),
        discount,
        subtotal_after_discount: subtotal - discount,
    };
    Ok((promo, applied))
}

#[derive(Clone)]
pub struct PromotionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PromotionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_promotion(
        &self,
        input: CreatePromotionInput,
    ) -> Result<promotion::Model, ServiceError> {
        input.validate()?;
        check_value(input.discount_kind, input.value)?;
        check_window(input.starts_at, input.ends_at)?;
        let code = normalize_code(&input.code);
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ServiceError::ValidationError(
                "code may only contain letters, digits, '-' and '_'".to_string(),
            ));
        }
        if promotion::Entity::find()
            .filter(promotion::Column::Code.eq(code.as_str()))
            .one(&*self.db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Promotion code {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let created = promotion::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            description: Set(input.description),
            discount_kind: Set(input.discount_kind),
            value: Set(input.value),
            min_subtotal: Set(input.min_subtotal),
            starts_at: Set(input.starts_at),
            ends_at: Set(input.ends_at),
            usage_limit: Set(input.usage_limit),
            times_used: Set(0),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::PromotionChanged(created.id))
            .await;
        info!(promotion_id = %created.id, code = %created.code, "Promotion created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_promotion(
        &self,
        id: Uuid,
        input: UpdatePromotionInput,
    ) -> Result<promotion::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_promotion(id).await?;
        if let Some(value) = input.value {
            check_value(existing.discount_kind, value)?;
        }
        check_window(
            input.starts_at.or(existing.starts_at),
            input.ends_at.or(existing.ends_at),
        )?;

        let mut active: promotion::ActiveModel = existing.into();
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(value) = input.value {
            active.value = Set(value);
        }
        if let Some(min_subtotal) = input.min_subtotal {
            active.min_subtotal = Set(Some(min_subtotal));
        }
        if let Some(starts_at) = input.starts_at {
            active.starts_at = Set(Some(starts_at));
        }
        if let Some(ends_at) = input.ends_at {
            active.ends_at = Set(Some(ends_at));
        }
        if let Some(usage_limit) = input.usage_limit {
            active.usage_limit = Set(Some(usage_limit));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PromotionChanged(id))
            .await;
        Ok(updated)
    }

    pub async fn delete_promotion(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = promotion::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Promotion {} not found", id)));
        }
        self.event_sender
            .send_or_log(Event::PromotionChanged(id))
            .await;
        Ok(())
    }

    pub async fn get_promotion(&self, id: Uuid) -> Result<promotion::Model, ServiceError> {
        promotion::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Promotion {} not found", id)))
    }

    pub async fn list_promotions(&self) -> Result<Vec<promotion::Model>, ServiceError> {
        Ok(promotion::Entity::find()
            .order_by_desc(promotion::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Checks a code against `subtotal` at `now` without consuming it.
    pub async fn validate_code(
        &self,
        code: &str,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<AppliedPromotion, ServiceError> {
        let (_, applied) = apply_code(&*self.db, code, subtotal, now).await?;
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn promo(kind: DiscountKind, value: Decimal) -> promotion::Model {
        let now = Utc::now();
        promotion::Model {
            id: Uuid::new_v4(),
            code: "DIWALI10".into(),
            description: None,
            discount_kind: kind,
            value,
            min_subtotal: None,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            times_used: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percentage_discount_rounds_to_cents() {
        let p = promo(DiscountKind::Percentage, dec!(10));
        assert_eq!(discount_for(&p, dec!(1234.55)), dec!(123.46));
    }

    #[test]
    fn fixed_discount_is_capped_by_subtotal() {
        let p = promo(DiscountKind::Fixed, dec!(500));
        assert_eq!(discount_for(&p, dec!(300)), dec!(300));
        assert_eq!(discount_for(&p, dec!(800)), dec!(500));
    }

    #[test]
    fn applicability_rules() {
        let now = Utc::now();
        let mut p = promo(DiscountKind::Fixed, dec!(100));
        assert!(check_applicable(&p, dec!(50), now).is_ok());

        p.min_subtotal = Some(dec!(1000));
        assert!(check_applicable(&p, dec!(999), now).is_err());
        p.min_subtotal = None;

        p.starts_at = Some(now + Duration::days(1));
        assert!(check_applicable(&p, dec!(50), now).is_err());
        p.starts_at = None;

        p.ends_at = Some(now - Duration::seconds(1));
        assert!(check_applicable(&p, dec!(50), now).is_err());
        p.ends_at = None;

        p.usage_limit = Some(2);
        p.times_used = 2;
        assert!(check_applicable(&p, dec!(50), now).is_err());
        p.usage_limit = None;

        p.is_active = false;
        assert!(check_applicable(&p, dec!(50), now).is_err());
    }

    #[test]
    fn value_and_window_checks() {
        assert!(check_value(DiscountKind::Percentage, dec!(101)).is_err());
        assert!(check_value(DiscountKind::Percentage, dec!(100)).is_ok());
        assert!(check_value(DiscountKind::Fixed, dec!(0)).is_err());
        let now = Utc::now();
        assert!(check_window(Some(now), Some(now)).is_err());
        assert!(check_window(Some(now), None).is_ok());
    }

    #[test]
    fn codes_are_upper_cased() {
        assert_eq!(normalize_code("  diwali10 "), "DIWALI10");
    }
}
