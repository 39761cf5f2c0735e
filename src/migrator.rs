use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_catalog_tables::Migration),
            Box::new(m20260101_000002_create_pricing_tables::Migration),
            Box::new(m20260101_000003_create_account_tables::Migration),
            Box::new(m20260101_000004_create_commerce_tables::Migration),
            Box::new(m20260101_000005_create_cms_pages_table::Migration),
        ]
    }
}

fn decimal(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col).decimal_len(16, 4).not_null().to_owned()
}

fn timestamp(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

mod m20260101_000001_create_catalog_tables {
    use super::{decimal, timestamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Categories::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(
                            ColumnDef::new(Categories::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Categories::Description).text().null())
                        .col(ColumnDef::new(Categories::ImageUrl).string().null())
                        .col(
                            ColumnDef::new(Categories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Categories::Rank)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(timestamp(Categories::CreatedAt))
                        .col(timestamp(Categories::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Collections::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Collections::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Collections::Name).string().not_null())
                        .col(
                            ColumnDef::new(Collections::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Collections::Description).text().null())
                        .col(ColumnDef::new(Collections::ImageUrl).string().null())
                        .col(
                            ColumnDef::new(Collections::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Collections::Rank)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(timestamp(Collections::CreatedAt))
                        .col(timestamp(Collections::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Material).string_len(20).not_null())
                        .col(ColumnDef::new(Products::Gender).string_len(20).not_null())
                        .col(decimal(Products::Weight))
                        .col(decimal(Products::Price))
                        .col(
                            ColumnDef::new(Products::CompareAtPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Products::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CategoryId).uuid().null())
                        .col(ColumnDef::new(Products::Images).json().not_null())
                        .col(ColumnDef::new(Products::Attributes).json().not_null())
                        .col(timestamp(Products::CreatedAt))
                        .col(timestamp(Products::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_material")
                        .table(Products::Table)
                        .col(Products::Material)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductSlugRedirects::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductSlugRedirects::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ProductSlugRedirects::OldSlug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ProductSlugRedirects::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(timestamp(ProductSlugRedirects::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_slug_redirects_product")
                                .from(ProductSlugRedirects::Table, ProductSlugRedirects::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CollectionProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CollectionProducts::CollectionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionProducts::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionProducts::Rank)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(timestamp(CollectionProducts::CreatedAt))
                        .primary_key(
                            Index::create()
                                .col(CollectionProducts::CollectionId)
                                .col(CollectionProducts::ProductId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_collection_products_collection")
                                .from(CollectionProducts::Table, CollectionProducts::CollectionId)
                                .to(Collections::Table, Collections::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_collection_products_product")
                                .from(CollectionProducts::Table, CollectionProducts::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CollectionProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductSlugRedirects::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Collections::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Categories {
        Table,
        Id,
        Name,
        Slug,
        Description,
        ImageUrl,
        IsActive,
        Rank,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Collections {
        Table,
        Id,
        Name,
        Slug,
        Description,
        ImageUrl,
        IsActive,
        Rank,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        Slug,
        Description,
        Material,
        Gender,
        Weight,
        Price,
        CompareAtPrice,
        Stock,
        IsActive,
        CategoryId,
        Images,
        Attributes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductSlugRedirects {
        Table,
        Id,
        OldSlug,
        ProductId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum CollectionProducts {
        Table,
        CollectionId,
        ProductId,
        Rank,
        CreatedAt,
    }
}

mod m20260101_000002_create_pricing_tables {
    use super::m20260101_000001_create_catalog_tables::Products;
    use super::{decimal, timestamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_pricing_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Markets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Markets::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Markets::Name).string().not_null())
                        .col(ColumnDef::new(Markets::Slug).string().not_null().unique_key())
                        .col(ColumnDef::new(Markets::Currency).string_len(3).not_null())
                        .col(
                            ColumnDef::new(Markets::ExchangeRate)
                                .decimal_len(16, 6)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Markets::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(timestamp(Markets::CreatedAt))
                        .col(timestamp(Markets::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductPricing::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductPricing::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductPricing::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductPricing::MarketId).uuid().not_null())
                        .col(decimal(ProductPricing::Price))
                        .col(
                            ColumnDef::new(ProductPricing::IsManual)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(timestamp(ProductPricing::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_pricing_product")
                                .from(ProductPricing::Table, ProductPricing::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_pricing_market")
                                .from(ProductPricing::Table, ProductPricing::MarketId)
                                .to(Markets::Table, Markets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_product_pricing_product_market")
                        .table(ProductPricing::Table)
                        .col(ProductPricing::ProductId)
                        .col(ProductPricing::MarketId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MaterialRates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaterialRates::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MaterialRates::Material)
                                .string_len(20)
                                .not_null()
                                .unique_key(),
                        )
                        .col(decimal(MaterialRates::RatePerGram))
                        .col(ColumnDef::new(MaterialRates::EffectiveDate).date().not_null())
                        .col(timestamp(MaterialRates::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DailyMaterialRates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DailyMaterialRates::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(DailyMaterialRates::Material)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DailyMaterialRates::RateDate).date().not_null())
                        .col(decimal(DailyMaterialRates::RatePerGram))
                        .col(timestamp(DailyMaterialRates::CreatedAt))
                        .col(timestamp(DailyMaterialRates::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_daily_material_rates_material_date")
                        .table(DailyMaterialRates::Table)
                        .col(DailyMaterialRates::Material)
                        .col(DailyMaterialRates::RateDate)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DailyMaterialRates::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MaterialRates::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductPricing::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Markets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Markets {
        Table,
        Id,
        Name,
        Slug,
        Currency,
        ExchangeRate,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductPricing {
        Table,
        Id,
        ProductId,
        MarketId,
        Price,
        IsManual,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum MaterialRates {
        Table,
        Id,
        Material,
        RatePerGram,
        EffectiveDate,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DailyMaterialRates {
        Table,
        Id,
        Material,
        RateDate,
        RatePerGram,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000003_create_account_tables {
    use super::timestamp;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_account_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                        .col(timestamp(Users::CreatedAt))
                        .col(timestamp(Users::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sessions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sessions::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Sessions::UserId).uuid().not_null())
                        .col(timestamp(Sessions::ExpiresAt))
                        .col(timestamp(Sessions::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sessions_user")
                                .from(Sessions::Table, Sessions::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sessions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Email,
        Name,
        PasswordHash,
        Role,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Sessions {
        Table,
        Id,
        UserId,
        ExpiresAt,
        CreatedAt,
    }
}

mod m20260101_000004_create_commerce_tables {
    use super::m20260101_000001_create_catalog_tables::Products;
    use super::m20260101_000003_create_account_tables::Users;
    use super::{decimal, timestamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_commerce_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Carts::UserId).uuid().not_null().unique_key())
                        .col(timestamp(Carts::CreatedAt))
                        .col(timestamp(Carts::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_carts_user")
                                .from(Carts::Table, Carts::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CartItems::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(timestamp(CartItems::CreatedAt))
                        .col(timestamp(CartItems::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_cart")
                                .from(CartItems::Table, CartItems::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_product")
                                .from(CartItems::Table, CartItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_cart_items_cart_product")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .col(CartItems::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WishlistItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WishlistItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(WishlistItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(WishlistItems::ProductId).uuid().not_null())
                        .col(timestamp(WishlistItems::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_wishlist_items_user")
                                .from(WishlistItems::Table, WishlistItems::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_wishlist_items_product")
                                .from(WishlistItems::Table, WishlistItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_wishlist_items_user_product")
                        .table(WishlistItems::Table)
                        .col(WishlistItems::UserId)
                        .col(WishlistItems::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Promotions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Promotions::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Promotions::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Promotions::Description).string().null())
                        .col(
                            ColumnDef::new(Promotions::DiscountKind)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(decimal(Promotions::Value))
                        .col(
                            ColumnDef::new(Promotions::MinSubtotal)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::StartsAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::EndsAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Promotions::UsageLimit).integer().null())
                        .col(
                            ColumnDef::new(Promotions::TimesUsed)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Promotions::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(timestamp(Promotions::CreatedAt))
                        .col(timestamp(Promotions::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Email).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::Currency).string_len(3).not_null())
                        .col(ColumnDef::new(Orders::MarketId).uuid().null())
                        .col(decimal(Orders::Subtotal))
                        .col(decimal(Orders::Discount))
                        .col(decimal(Orders::Total))
                        .col(ColumnDef::new(Orders::PromotionCode).string().null())
                        .col(ColumnDef::new(Orders::ShippingAddress).json().not_null())
                        .col(timestamp(Orders::CreatedAt))
                        .col(timestamp(Orders::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(decimal(OrderItems::UnitPrice))
                        .col(decimal(OrderItems::LineTotal))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                OrderItems::Table.into_iden(),
                Orders::Table.into_iden(),
                Promotions::Table.into_iden(),
                WishlistItems::Table.into_iden(),
                CartItems::Table.into_iden(),
                Carts::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        UserId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        CartId,
        ProductId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WishlistItems {
        Table,
        Id,
        UserId,
        ProductId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Promotions {
        Table,
        Id,
        Code,
        Description,
        DiscountKind,
        Value,
        MinSubtotal,
        StartsAt,
        EndsAt,
        UsageLimit,
        TimesUsed,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        UserId,
        Email,
        Status,
        Currency,
        MarketId,
        Subtotal,
        Discount,
        Total,
        PromotionCode,
        ShippingAddress,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        ProductName,
        Quantity,
        UnitPrice,
        LineTotal,
    }
}

mod m20260101_000005_create_cms_pages_table {
    use super::timestamp;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_cms_pages_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CmsPages::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CmsPages::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(CmsPages::Slug).string().not_null().unique_key())
                        .col(ColumnDef::new(CmsPages::Title).string().not_null())
                        .col(ColumnDef::new(CmsPages::Description).text().null())
                        .col(
                            ColumnDef::new(CmsPages::IsPublished)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(CmsPages::Blocks).json().not_null())
                        .col(timestamp(CmsPages::CreatedAt))
                        .col(timestamp(CmsPages::UpdatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CmsPages::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CmsPages {
        Table,
        Id,
        Slug,
        Title,
        Description,
        IsPublished,
        Blocks,
        CreatedAt,
        UpdatedAt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered_by_name() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
