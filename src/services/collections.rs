//! Curated collections. Membership is a composite-keyed join table whose
//! `rank` carries the display order.

use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{paths, Revalidator};
use crate::entities::{collection, collection_product, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::categories::{slug_for, CreateGroupingInput, UpdateGroupingInput};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionMember {
    pub rank: i32,
    #[schema(value_type = Object)]
    pub product: product::Model,
}

#[derive(Clone)]
pub struct CollectionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    revalidator: Arc<Revalidator>,
}

impl CollectionService {
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
        let mut query = collection::Entity::find().filter(collection::Column::Slug.eq(slug));
        if let Some(id) = except {
            query = query.filter(collection::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Collection slug '{}' is already in use",
                slug
            )));
        }
        Ok(())
    }

    async fn changed(&self, id: Uuid) {
        self.revalidator
            .revalidate(&[paths::COLLECTIONS, paths::PRODUCTS])
            .await;
        self.event_sender
            .send_or_log(Event::CollectionChanged(id))
            .await;
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_collection(
        &self,
        input: CreateGroupingInput,
    ) -> Result<collection::Model, ServiceError> {
        input.validate()?;
        let slug = slug_for(input.slug.as_deref(), &input.name)?;
        self.ensure_unique_slug(&slug, None).await?;

        let now = Utc::now();
        let created = collection::ActiveModel {
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
        info!(collection_id = %created.id, slug = %created.slug, "Collection created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_collection(
        &self,
        id: Uuid,
        input: UpdateGroupingInput,
    ) -> Result<collection::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_collection(id).await?;
        let mut active: collection::ActiveModel = existing.clone().into();

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

    #[instrument(skip(self))]
    pub async fn delete_collection(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        if collection::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Collection {} not found", id)));
        }
        collection_product::Entity::delete_many()
            .filter(collection_product::Column::CollectionId.eq(id))
            .exec(&txn)
            .await?;
        collection::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        self.revalidator
            .revalidate(&[paths::COLLECTIONS, paths::PRODUCTS])
            .await;
        self.event_sender
            .send_or_log(Event::CollectionDeleted(id))
            .await;
        info!(collection_id = %id, "Collection deleted");
        Ok(())
    }

    pub async fn get_collection(&self, id: Uuid) -> Result<collection::Model, ServiceError> {
        collection::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Collection {} not found", id)))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<collection::Model, ServiceError> {
        collection::Entity::find()
            .filter(collection::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Collection '{}' not found", slug)))
    }

    pub async fn list_collections(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<collection::Model>, ServiceError> {
        let mut query = collection::Entity::find();
        if !include_inactive {
            query = query.filter(collection::Column::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(collection::Column::Rank)
            .order_by_asc(collection::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Adds products after the current members. Products already in the
    /// collection are left where they are.
    #[instrument(skip(self, product_ids))]
    pub async fn add_products(
        &self,
        collection_id: Uuid,
        product_ids: Vec<Uuid>,
    ) -> Result<Vec<CollectionMember>, ServiceError> {
        self.get_collection(collection_id).await?;
        let txn = self.db.begin().await?;

        let found = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids.clone()))
            .all(&txn)
            .await?;
        if let Some(missing) = product_ids
            .iter()
            .find(|id| !found.iter().any(|item| item.id == **id))
        {
            return Err(ServiceError::NotFound(format!("Product {} not found", missing)));
        }

        let mut next_rank = collection_product::Entity::find()
            .filter(collection_product::Column::CollectionId.eq(collection_id))
            .order_by_desc(collection_product::Column::Rank)
            .one(&txn)
            .await?
            .map(|last| last.rank + 1)
            .unwrap_or(0);

        let now = Utc::now();
        for product_id in product_ids {
            let inserted = collection_product::Entity::insert(collection_product::ActiveModel {
                collection_id: Set(collection_id),
                product_id: Set(product_id),
                rank: Set(next_rank),
                created_at: Set(now),
            })
            .on_conflict(
                OnConflict::columns([
                    collection_product::Column::CollectionId,
                    collection_product::Column::ProductId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
            if inserted > 0 {
                next_rank += 1;
            }
        }
        txn.commit().await?;

        self.changed(collection_id).await;
        self.list_members(collection_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_product(
        &self,
        collection_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        let result = collection_product::Entity::delete_many()
            .filter(collection_product::Column::CollectionId.eq(collection_id))
            .filter(collection_product::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} is not in collection {}",
                product_id, collection_id
            )));
        }
        self.changed(collection_id).await;
        Ok(())
    }

    /// Rewrites member ranks to follow `product_ids`; members not listed
    /// keep their relative order after the listed ones.
    #[instrument(skip(self, product_ids))]
    pub async fn reorder_products(
        &self,
        collection_id: Uuid,
        product_ids: Vec<Uuid>,
    ) -> Result<Vec<CollectionMember>, ServiceError> {
        let txn = self.db.begin().await?;
        let members = collection_product::Entity::find()
            .filter(collection_product::Column::CollectionId.eq(collection_id))
            .order_by_asc(collection_product::Column::Rank)
            .all(&txn)
            .await?;

        for id in &product_ids {
            if !members.iter().any(|member| member.product_id == *id) {
                return Err(ServiceError::NotFound(format!(
                    "Product {} is not in collection {}",
                    id, collection_id
                )));
            }
        }

        let mut ordered: Vec<Uuid> = Vec::with_capacity(members.len());
        for id in product_ids.iter().chain(members.iter().map(|m| &m.product_id)) {
            if !ordered.contains(id) {
                ordered.push(*id);
            }
        }
        let by_product: HashMap<Uuid, collection_product::Model> = members
            .into_iter()
            .map(|member| (member.product_id, member))
            .collect();

        for (rank, product_id) in ordered.iter().enumerate() {
            if let Some(member) = by_product.get(product_id) {
                if member.rank != rank as i32 {
                    let mut active: collection_product::ActiveModel = member.clone().into();
                    active.rank = Set(rank as i32);
                    active.update(&txn).await?;
                }
            }
        }
        txn.commit().await?;

        self.changed(collection_id).await;
        self.list_members(collection_id).await
    }

    /// Members in rank order
    pub async fn list_members(
        &self,
        collection_id: Uuid,
    ) -> Result<Vec<CollectionMember>, ServiceError> {
        let rows = collection_product::Entity::find()
            .filter(collection_product::Column::CollectionId.eq(collection_id))
            .order_by_asc(collection_product::Column::Rank)
            .order_by_asc(collection_product::Column::CreatedAt)
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(member, item)| {
                item.map(|product| CollectionMember {
                    rank: member.rank,
                    product,
                })
            })
            .collect())
    }
}
