//! Property-based tests for storefront filtering and pricing.

use chrono::{Duration, TimeZone, Utc};
use lustre_api::entities::{product, Gender, Material};
use lustre_api::services::catalog_filter::{apply, ProductFilter, SortOrder};
use lustre_api::services::pricing::{market_price, price_for_weight};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn material_strategy() -> impl Strategy<Value = Material> {
    prop_oneof![Just(Material::Gold), Just(Material::Silver)]
}

fn gender_strategy() -> impl Strategy<Value = Gender> {
    prop_oneof![
        Just(Gender::Men),
        Just(Gender::Women),
        Just(Gender::Unisex),
        Just(Gender::Kids)
    ]
}

fn product_strategy() -> impl Strategy<Value = product::Model> {
    (
        "[a-z]{3,12}",
        material_strategy(),
        gender_strategy(),
        0i64..500_000,
        0i64..10_000,
    )
        .prop_map(|(name, material, gender, price, age_minutes)| {
            let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(age_minutes);
            product::Model {
                id: Uuid::new_v4(),
                slug: name.clone(),
                name,
                description: None,
                material,
                gender,
                weight: Decimal::ONE,
                price: Decimal::from(price),
                compare_at_price: None,
                stock: 1,
                is_active: true,
                category_id: None,
                images: serde_json::json!([]),
                attributes: serde_json::json!([]),
                created_at: created,
                updated_at: created,
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn price_ascending_is_ordered_and_bounded(
        products in prop::collection::vec(product_strategy(), 0..40),
        min in 0i64..250_000,
        span in 0i64..250_000,
    ) {
        let filter = ProductFilter {
            min_price: Some(Decimal::from(min)),
            max_price: Some(Decimal::from(min + span)),
            ..ProductFilter::default()
        };
        let selected = apply(products.clone(), &filter, SortOrder::PriceAsc);

        for pair in selected.windows(2) {
            prop_assert!(pair[0].price <= pair[1].price);
        }
        for item in &selected {
            prop_assert!(item.price >= Decimal::from(min));
            prop_assert!(item.price <= Decimal::from(min + span));
        }
        let expected = products.iter().filter(|p| filter.matches(p)).count();
        prop_assert_eq!(selected.len(), expected);
    }

    #[test]
    fn material_filter_keeps_only_requested_materials(
        products in prop::collection::vec(product_strategy(), 0..40),
        material in material_strategy(),
    ) {
        let filter = ProductFilter {
            materials: vec![material],
            ..ProductFilter::default()
        };
        let selected = apply(products.clone(), &filter, SortOrder::Featured);

        prop_assert!(selected.iter().all(|p| p.material == material));
        let source_order: Vec<Uuid> = products
            .iter()
            .filter(|p| p.material == material)
            .map(|p| p.id)
            .collect();
        let kept: Vec<Uuid> = selected.iter().map(|p| p.id).collect();
        prop_assert_eq!(kept, source_order);
    }

    #[test]
    fn newest_first_orders_by_creation(
        products in prop::collection::vec(product_strategy(), 0..40),
    ) {
        let selected = apply(products, &ProductFilter::default(), SortOrder::Newest);
        for pair in selected.windows(2) {
            prop_assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn filter_survives_the_query_string(
        materials in prop::collection::vec(material_strategy(), 0..2),
        search in proptest::option::of("[a-z]{1,8}( [a-z]{1,8})?"),
        min in proptest::option::of(0i64..100_000),
    ) {
        let mut materials = materials;
        materials.dedup();
        let filter = ProductFilter {
            materials,
            min_price: min.map(Decimal::from),
            search,
            ..ProductFilter::default()
        };
        let encoded = filter.to_query_string(SortOrder::PriceDesc);
        let (decoded, sort) = ProductFilter::from_query_string(&encoded);
        prop_assert_eq!(sort, SortOrder::PriceDesc);
        prop_assert_eq!(decoded, filter);
    }

    #[test]
    fn weight_pricing_is_whole_units(
        weight_hundredths in 0i64..100_000,
        rate in 1i64..20_000,
    ) {
        let weight = Decimal::new(weight_hundredths, 2);
        let price = price_for_weight(weight, Decimal::from(rate));
        prop_assert_eq!(price.fract(), Decimal::ZERO);
        let exact = weight * Decimal::from(rate);
        prop_assert!((price - exact).abs() <= Decimal::new(5, 1));
    }

    #[test]
    fn market_price_tracks_the_exchange_rate(
        base in 0i64..1_000_000,
        rate_thousandths in 1i64..50_000,
    ) {
        let exchange = Decimal::new(rate_thousandths, 3);
        let converted = market_price(Decimal::from(base), exchange);
        prop_assert_eq!(converted.fract(), Decimal::ZERO);
        prop_assert!((converted - Decimal::from(base) * exchange).abs() <= Decimal::new(5, 1));
    }
}
