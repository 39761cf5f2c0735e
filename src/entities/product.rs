use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog product. `images` and `attributes` are ordered JSON arrays whose
/// order is carried by each element's `rank`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub material: Material,
    pub gender: Gender,
    /// Weight in grams
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
    pub is_active: bool,
    #[sea_orm(nullable)]
    pub category_id: Option<Uuid>,
    #[sea_orm(column_type = "Json")]
    pub images: Json,
    #[sea_orm(column_type = "Json")]
    pub attributes: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(has_many = "super::product_pricing::Entity")]
    Pricing,
    #[sea_orm(has_many = "super::collection_product::Entity")]
    CollectionProducts,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::product_pricing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pricing.def()
    }
}

impl Related<super::collection_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CollectionProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Images in display order. A null column is an empty list; anything
    /// else that is not an image array is an error.
    pub fn try_image_list(&self) -> Result<Vec<ProductImage>, serde_json::Error> {
        let mut images: Vec<ProductImage> = decode_list(&self.images)?;
        images.sort_by_key(|img| img.rank);
        Ok(images)
    }

    /// Lenient read for display paths. Malformed JSON is logged and shown
    /// as no images.
    pub fn image_list(&self) -> Vec<ProductImage> {
        self.try_image_list().unwrap_or_else(|e| {
            warn!(product_id = %self.id, error = %e, "Malformed images column");
            Vec::new()
        })
    }

    pub fn try_attribute_list(&self) -> Result<Vec<ProductAttribute>, serde_json::Error> {
        let mut attributes: Vec<ProductAttribute> = decode_list(&self.attributes)?;
        attributes.sort_by_key(|attr| attr.rank);
        Ok(attributes)
    }

    /// Attributes in display order.
    pub fn attribute_list(&self) -> Vec<ProductAttribute> {
        self.try_attribute_list().unwrap_or_else(|e| {
            warn!(product_id = %self.id, error = %e, "Malformed attributes column");
            Vec::new()
        })
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(raw: &Json) -> Result<Vec<T>, serde_json::Error> {
    match raw {
        Json::Null => Ok(Vec::new()),
        other => serde_json::from_value(other.clone()),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    pub rank: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductAttribute {
    pub id: Uuid,
    pub name: String,
    pub value: String,
    pub rank: i32,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Material {
    #[sea_orm(string_value = "gold")]
    Gold,
    #[sea_orm(string_value = "silver")]
    Silver,
    #[sea_orm(string_value = "platinum")]
    Platinum,
    #[sea_orm(string_value = "diamond")]
    Diamond,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Gender {
    #[sea_orm(string_value = "men")]
    Men,
    #[sea_orm(string_value = "women")]
    Women,
    #[sea_orm(string_value = "unisex")]
    Unisex,
    #[sea_orm(string_value = "kids")]
    Kids,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn material_parses_case_insensitively() {
        assert_eq!(Material::from_str("Gold").unwrap(), Material::Gold);
        assert_eq!(Material::Platinum.to_string(), "platinum");
        assert!(Material::from_str("copper").is_err());
    }

    #[test]
    fn null_and_malformed_lists() {
        let now = Utc::now();
        let product = Model {
            id: Uuid::new_v4(),
            name: "Band".into(),
            slug: "band".into(),
            description: None,
            material: Material::Gold,
            gender: Gender::Unisex,
            weight: Decimal::ONE,
            price: Decimal::ONE,
            compare_at_price: None,
            stock: 1,
            is_active: true,
            category_id: None,
            images: Json::Null,
            attributes: serde_json::json!([
                {"id": Uuid::nil(), "name": "b", "value": "2", "rank": 1},
                {"id": Uuid::nil(), "name": "a", "value": "1", "rank": 0}
            ]),
            created_at: now,
            updated_at: now,
        };
        assert!(product.image_list().is_empty());
        let names: Vec<_> = product.attribute_list().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        let broken = Model {
            images: serde_json::json!({ "url": "/a.png" }),
            attributes: serde_json::json!("oops"),
            ..product
        };
        assert!(broken.try_image_list().is_err());
        assert!(broken.image_list().is_empty());
        assert!(broken.try_attribute_list().is_err());
    }
}
