use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{product, product::ProductImage, wishlist_item};
use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WishlistEntry {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: rust_decimal::Decimal,
    pub image: Option<ProductImage>,
    pub added_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Adding a product twice keeps a single entry.
    #[instrument(skip(self))]
    pub async fn add(&self, user_id: Uuid, product_id: Uuid) -> Result<Vec<WishlistEntry>, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .filter(|item| item.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        wishlist_item::Entity::insert(wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            created_at: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::columns([
                wishlist_item::Column::UserId,
                wishlist_item::Column::ProductId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&*self.db)
        .await?;

        self.list(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<Vec<WishlistEntry>, ServiceError> {
        let result = wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} is not in the wishlist",
                product_id
            )));
        }
        self.list(user_id).await
    }

    /// Newest first; deactivated products are hidden.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<WishlistEntry>, ServiceError> {
        let rows = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .order_by_desc(wishlist_item::Column::CreatedAt)
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(entry, found)| {
                found.filter(|item| item.is_active).map(|item| WishlistEntry {
                    product_id: item.id,
                    image: item.image_list().into_iter().next(),
                    name: item.name,
                    slug: item.slug,
                    price: item.price,
                    added_at: entry.created_at,
                })
            })
            .collect())
    }
}
