//! Storefront filtering and sorting over an already fetched product list.
//!
//! The filter state round-trips through a URL query string so a front end can
//! mirror the selection into its address bar:
//! `material=gold,silver&gender=women&min_price=1000&max_price=50000&sort=price-asc`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use url::form_urlencoded;
use utoipa::{IntoParams, ToSchema};

use crate::entities::{product, Gender, Material};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Source order (collection rank, or catalog order)
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    Newest,
    Oldest,
}

impl SortOrder {
    /// Unknown keys fall back to `Featured`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "price-asc" => SortOrder::PriceAsc,
            "price-desc" => SortOrder::PriceDesc,
            "newest" => SortOrder::Newest,
            "oldest" => SortOrder::Oldest,
            _ => SortOrder::Featured,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Featured => "featured",
            SortOrder::PriceAsc => "price-asc",
            SortOrder::PriceDesc => "price-desc",
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
        }
    }
}

/// Raw storefront query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    /// Comma-separated materials, e.g. `gold,silver`
    pub material: Option<String>,
    /// Comma-separated genders, e.g. `women,unisex`
    pub gender: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Case-insensitive name search
    pub q: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Collection slug
    pub collection: Option<String>,
    /// `featured`, `price-asc`, `price-desc`, `newest`, `oldest`
    pub sort: Option<String>,
    /// Market slug used to project prices
    pub market: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductFilter {
    pub materials: Vec<Material>,
    pub genders: Vec<Gender>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub collection: Option<String>,
}

/// Parses a comma-separated list, keeping the first occurrence of each value.
fn split_list<T: FromStr + PartialEq>(raw: Option<&str>) -> Vec<T> {
    let mut values = Vec::new();
    for part in raw.unwrap_or_default().split(',') {
        if let Ok(value) = part.trim().parse::<T>() {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

fn non_empty(raw: Option<&String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl ProductFilter {
    /// Builds the filter from raw query parameters. Unknown materials and
    /// genders are dropped rather than rejected.
    pub fn from_query(query: &CatalogQuery) -> (Self, SortOrder) {
        let filter = Self {
            materials: split_list(query.material.as_deref()),
            genders: split_list(query.gender.as_deref()),
            min_price: query.min_price,
            max_price: query.max_price,
            search: non_empty(query.q.as_ref()),
            category: non_empty(query.category.as_ref()),
            collection: non_empty(query.collection.as_ref()),
        };
        let sort = query
            .sort
            .as_deref()
            .map(SortOrder::parse)
            .unwrap_or_default();
        (filter, sort)
    }

    /// Parses a raw `a=b&c=d` query string
    pub fn from_query_string(raw: &str) -> (Self, SortOrder) {
        let pairs: HashMap<String, String> =
            form_urlencoded::parse(raw.trim_start_matches('?').as_bytes())
                .into_owned()
                .collect();

        let query = CatalogQuery {
            material: pairs.get("material").cloned(),
            gender: pairs.get("gender").cloned(),
            min_price: pairs.get("min_price").and_then(|v| v.parse().ok()),
            max_price: pairs.get("max_price").and_then(|v| v.parse().ok()),
            q: pairs.get("q").cloned(),
            category: pairs.get("category").cloned(),
            collection: pairs.get("collection").cloned(),
            sort: pairs.get("sort").cloned(),
            ..Default::default()
        };
        Self::from_query(&query)
    }

    /// Serializes the filter back into query-string form. Empty parts are
    /// omitted and `featured` is the implicit default.
    pub fn to_query_string(&self, sort: SortOrder) -> String {
        let mut parts = Vec::new();
        if !self.materials.is_empty() {
            let joined: Vec<String> = self.materials.iter().map(|m| m.to_string()).collect();
            parts.push(format!("material={}", joined.join(",")));
        }
        if !self.genders.is_empty() {
            let joined: Vec<String> = self.genders.iter().map(|g| g.to_string()).collect();
            parts.push(format!("gender={}", joined.join(",")));
        }
        if let Some(min) = self.min_price {
            parts.push(format!("min_price={}", min));
        }
        if let Some(max) = self.max_price {
            parts.push(format!("max_price={}", max));
        }
        if let Some(search) = &self.search {
            parts.push(format!("q={}", encode_component(search)));
        }
        if let Some(category) = &self.category {
            parts.push(format!("category={}", encode_component(category)));
        }
        if let Some(collection) = &self.collection {
            parts.push(format!("collection={}", encode_component(collection)));
        }
        if sort != SortOrder::Featured {
            parts.push(format!("sort={}", sort.as_str()));
        }
        parts.join("&")
    }

    pub fn matches(&self, item: &product::Model) -> bool {
        if !self.materials.is_empty() && !self.materials.contains(&item.material) {
            return false;
        }
        if !self.genders.is_empty() && !self.genders.contains(&item.gender) {
            return false;
        }
        if self.min_price.map(|min| item.price < min).unwrap_or(false) {
            return false;
        }
        if self.max_price.map(|max| item.price > max).unwrap_or(false) {
            return false;
        }
        if let Some(search) = &self.search {
            if !item.name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Filters then sorts. Sorting is stable, so ties keep their source order.
pub fn apply(
    products: Vec<product::Model>,
    filter: &ProductFilter,
    sort: SortOrder,
) -> Vec<product::Model> {
    let mut selected: Vec<product::Model> =
        products.into_iter().filter(|p| filter.matches(p)).collect();

    match sort {
        SortOrder::Featured => {}
        SortOrder::PriceAsc => selected.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::PriceDesc => selected.sort_by(|a, b| b.price.cmp(&a.price)),
        SortOrder::Newest => selected.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => selected.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
    selected
}

fn encode_component(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn item(name: &str, material: Material, gender: Gender, price: Decimal, age: i64) -> product::Model {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(age);
        product::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: None,
            material,
            gender,
            weight: dec!(1),
            price,
            compare_at_price: None,
            stock: 5,
            is_active: true,
            category_id: None,
            images: serde_json::json!([]),
            attributes: serde_json::json!([]),
            created_at: created,
            updated_at: created,
        }
    }

    fn catalog() -> Vec<product::Model> {
        vec![
            item("Rose Ring", Material::Gold, Gender::Women, dec!(15000), 3),
            item("Silver Chain", Material::Silver, Gender::Men, dec!(2500), 1),
            item("Kids Bangle", Material::Gold, Gender::Kids, dec!(8000), 2),
            item("Solitaire", Material::Diamond, Gender::Women, dec!(90000), 0),
            item("Gold Hoops", Material::Gold, Gender::Women, dec!(15000), 4),
        ]
    }

    #[test]
    fn filters_intersect() {
        let (filter, sort) =
            ProductFilter::from_query_string("material=gold&gender=women&max_price=20000");
        let names: Vec<_> = apply(catalog(), &filter, sort)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Rose Ring", "Gold Hoops"]);
    }

    #[test]
    fn price_range_is_inclusive() {
        let filter = ProductFilter {
            min_price: Some(dec!(2500)),
            max_price: Some(dec!(8000)),
            ..Default::default()
        };
        assert_eq!(apply(catalog(), &filter, SortOrder::Featured).len(), 2);
    }

    #[test]
    fn price_sort_is_stable_for_ties() {
        let filter = ProductFilter::default();
        let names: Vec<_> = apply(catalog(), &filter, SortOrder::PriceDesc)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(
            names,
            vec!["Solitaire", "Rose Ring", "Gold Hoops", "Kids Bangle", "Silver Chain"]
        );
    }

    #[test]
    fn newest_and_oldest_follow_created_at() {
        let filter = ProductFilter::default();
        let newest = apply(catalog(), &filter, SortOrder::Newest);
        assert_eq!(newest[0].name, "Gold Hoops");
        let oldest = apply(catalog(), &filter, SortOrder::Oldest);
        assert_eq!(oldest[0].name, "Solitaire");
    }

    #[test]
    fn unknown_sort_keeps_source_order() {
        assert_eq!(SortOrder::parse("popularity"), SortOrder::Featured);
        let (filter, sort) = ProductFilter::from_query_string("sort=popularity");
        let names: Vec<_> = apply(catalog(), &filter, sort)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names[0], "Rose Ring");
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn search_is_case_insensitive() {
        let (filter, sort) = ProductFilter::from_query_string("q=GOLD");
        let result = apply(catalog(), &filter, sort);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Gold Hoops");
    }

    #[test]
    fn query_string_round_trips() {
        let raw = "material=gold,silver&gender=women&min_price=100&q=rose+ring&sort=price-asc";
        let (filter, sort) = ProductFilter::from_query_string(raw);
        assert_eq!(filter.materials, vec![Material::Gold, Material::Silver]);
        assert_eq!(filter.search.as_deref(), Some("rose ring"));
        assert_eq!(sort, SortOrder::PriceAsc);
        assert_eq!(filter.to_query_string(sort), raw);
    }

    #[test]
    fn unknown_list_values_are_dropped() {
        let (filter, _) = ProductFilter::from_query_string("material=gold,copper&gender=robots");
        assert_eq!(filter.materials, vec![Material::Gold]);
        assert!(filter.genders.is_empty());
        assert_eq!(filter.to_query_string(SortOrder::Featured), "material=gold");
    }

    #[test]
    fn repeated_list_values_keep_first_occurrence() {
        let (filter, _) =
            ProductFilter::from_query_string("material=gold,silver,gold&gender=men,women,men");
        assert_eq!(filter.materials, vec![Material::Gold, Material::Silver]);
        assert_eq!(filter.genders, vec![Gender::Men, Gender::Women]);
        assert_eq!(
            filter.to_query_string(SortOrder::Featured),
            "material=gold,silver&gender=men,women"
        );
    }

    #[test]
    fn malformed_escapes_stay_literal() {
        let (filter, _) = ProductFilter::from_query_string("q=%+1ring");
        assert_eq!(filter.search.as_deref(), Some("% 1ring"));
    }

    #[test]
    fn reserved_characters_in_search_are_escaped() {
        let filter = ProductFilter {
            search: Some("rings & bands=new".to_string()),
            ..ProductFilter::default()
        };
        let encoded = filter.to_query_string(SortOrder::Featured);
        assert_eq!(encoded, "q=rings+%26+bands%3Dnew");
        let (decoded, _) = ProductFilter::from_query_string(&encoded);
        assert_eq!(decoded, filter);
    }
}
