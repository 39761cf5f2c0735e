use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{paths, Revalidator};
use crate::entities::{category, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::slug::resolve_slug;

/// Shared create payload for categories and collections
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateGroupingInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub slug: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub rank: i32,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateGroupingInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub slug: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub rank: Option<i32>,
}

pub(crate) fn slug_for(explicit: Option<&str>, name: &str) -> Result<String, ServiceError> {
    resolve_slug(explicit, name)
        .ok_or_else(|| ServiceError::ValidationError("A valid slug could not be derived".into()))
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    revalidator: Arc<Revalidator>,
}

impl CategoryService {
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

    async fn ensure_unique_slug(&self, slug: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = category::Entity::find().filter(category::Column::Slug.eq(slug));
        if let Some(id) = except {
            query = query.filter(category::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category slug '{}' is already in use",
                slug
            )));
        }
        Ok(())
    }

    async fn changed(&self, id: Uuid) {
        self.revalidator
            .revalidate(&[paths::CATEGORIES, paths::PRODUCTS])
            .await;
        self.event_sender.send_or_log(Event::CategoryChanged(id)).await;
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: CreateGroupingInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let slug = slug_for(input.slug.as_deref(), &input.name)?;
        self.ensure_unique_slug(&slug, None).await?;

        let now = Utc::now();
        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            slug: Set(slug),
            description: Set(input.description),
            image_url: Set(input.image_url),
            is_active: Set(input.is_active),
            rank: Set(input.rank),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.changed(created.id).await;
        info!(category_id = %created.id, slug = %created.slug, "Category created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateGroupingInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_category(id).await?;
        let mut active: category::ActiveModel = existing.clone().into();

        if let Some(raw) = input.slug.as_deref() {
            let slug = slug_for(Some(raw), &existing.name)?;
            if slug != existing.slug {
                self.ensure_unique_slug(&slug, Some(id)).await?;
                active.slug = Set(slug);
            }
        }
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(rank) = input.rank {
            active.rank = Set(rank);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        self.changed(id).await;
        Ok(updated)
    }

    /// Deletes the category; its products stay and lose the assignment.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        if category::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Category {} not found", id)));
        }
        product::Entity::update_many()
            .col_expr(
                product::Column::CategoryId,
                sea_orm::sea_query::Expr::value(Option::<Uuid>::None),
            )
            .filter(product::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        category::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        self.revalidator
            .revalidate(&[paths::CATEGORIES, paths::PRODUCTS])
            .await;
        self.event_sender.send_or_log(Event::CategoryDeleted(id)).await;
        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<category::Model, ServiceError> {
        category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category '{}' not found", slug)))
    }

    /// Categories by rank, then name
    pub async fn list_categories(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<category::Model>, ServiceError> {
        let mut query = category::Entity::find();
        if !include_inactive {
            query = query.filter(category::Column::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(category::Column::Rank)
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_products(&self, id: Uuid) -> Result<Vec<product::Model>, ServiceError> {
        self.get_category(id).await?;
        Ok(product::Entity::find()
            .filter(product::Column::CategoryId.eq(id))
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await?)
    }
}
