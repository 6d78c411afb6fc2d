use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_account_tables::Migration),
            Box::new(m20240301_000002_create_catalog_tables::Migration),
            Box::new(m20240301_000003_create_order_tables::Migration),
        ]
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    Company,
    Position,
    Role,
    IsActive,
    ConfirmationToken,
    CreatedAt,
}

mod m20240301_000001_create_account_tables {
    use super::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_account_tables"
        }
    }

    #[derive(DeriveIden)]
    enum AuthTokens {
        Table,
        Id,
        UserId,
        Token,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PasswordResetTokens {
        Table,
        Id,
        UserId,
        Token,
        ExpiresAt,
        CreatedAt,
        UsedAt,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::FirstName).string().not_null().default(""))
                        .col(ColumnDef::new(Users::LastName).string().not_null().default(""))
                        .col(ColumnDef::new(Users::Company).string().not_null().default(""))
                        .col(ColumnDef::new(Users::Position).string().not_null().default(""))
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(10)
                                .not_null()
                                .default("buyer"),
                        )
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::ConfirmationToken).string().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AuthTokens::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AuthTokens::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(AuthTokens::UserId)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(AuthTokens::Token)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(AuthTokens::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_auth_tokens_user_id")
                                .from(AuthTokens::Table, AuthTokens::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PasswordResetTokens::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PasswordResetTokens::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::UserId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::Token)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::UsedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_password_reset_tokens_user_id")
                                .from(PasswordResetTokens::Table, PasswordResetTokens::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PasswordResetTokens::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AuthTokens::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }
}

#[derive(DeriveIden)]
enum ProductInfos {
    Table,
    Id,
    ProductId,
    ShopId,
    ExternalId,
    Model,
    Quantity,
    Price,
    PriceRrc,
}

mod m20240301_000002_create_catalog_tables {
    use super::{ProductInfos, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_catalog_tables"
        }
    }

    #[derive(DeriveIden)]
    enum Shops {
        Table,
        Id,
        Name,
        Url,
        UserId,
        State,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    enum ShopCategories {
        Table,
        Id,
        ShopId,
        CategoryId,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        CategoryId,
    }

    #[derive(DeriveIden)]
    enum Parameters {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    enum ProductParameters {
        Table,
        Id,
        ProductInfoId,
        ParameterId,
        Value,
    }

    fn id_column<T: IntoIden>(column: T) -> ColumnDef {
        ColumnDef::new(column)
            .integer()
            .not_null()
            .auto_increment()
            .primary_key()
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shops::Table)
                        .if_not_exists()
                        .col(id_column(Shops::Id))
                        .col(ColumnDef::new(Shops::Name).string_len(50).not_null().unique_key())
                        .col(ColumnDef::new(Shops::Url).string().null())
                        .col(ColumnDef::new(Shops::UserId).integer().null())
                        .col(ColumnDef::new(Shops::State).boolean().not_null().default(true))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shops_user_id")
                                .from(Shops::Table, Shops::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Category ids come from partner documents, so no auto-increment here.
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Categories::Name).string_len(40).not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShopCategories::Table)
                        .if_not_exists()
                        .col(id_column(ShopCategories::Id))
                        .col(ColumnDef::new(ShopCategories::ShopId).integer().not_null())
                        .col(ColumnDef::new(ShopCategories::CategoryId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shop_categories_shop_id")
                                .from(ShopCategories::Table, ShopCategories::ShopId)
                                .to(Shops::Table, Shops::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shop_categories_category_id")
                                .from(ShopCategories::Table, ShopCategories::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shop_categories_unique")
                        .table(ShopCategories::Table)
                        .col(ShopCategories::ShopId)
                        .col(ShopCategories::CategoryId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(id_column(Products::Id))
                        .col(ColumnDef::new(Products::Name).string_len(80).not_null())
                        .col(ColumnDef::new(Products::CategoryId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category_id")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_name_category")
                        .table(Products::Table)
                        .col(Products::Name)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductInfos::Table)
                        .if_not_exists()
                        .col(id_column(ProductInfos::Id))
                        .col(ColumnDef::new(ProductInfos::ProductId).integer().not_null())
                        .col(ColumnDef::new(ProductInfos::ShopId).integer().not_null())
                        .col(ColumnDef::new(ProductInfos::ExternalId).big_integer().null())
                        .col(
                            ColumnDef::new(ProductInfos::Model)
                                .string_len(80)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(ProductInfos::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductInfos::Price)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductInfos::PriceRrc)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_infos_product_id")
                                .from(ProductInfos::Table, ProductInfos::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_infos_shop_id")
                                .from(ProductInfos::Table, ProductInfos::ShopId)
                                .to(Shops::Table, Shops::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_infos_unique_listing")
                        .table(ProductInfos::Table)
                        .col(ProductInfos::ProductId)
                        .col(ProductInfos::ShopId)
                        .col(ProductInfos::Model)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Parameters::Table)
                        .if_not_exists()
                        .col(id_column(Parameters::Id))
                        .col(
                            ColumnDef::new(Parameters::Name)
                                .string_len(40)
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductParameters::Table)
                        .if_not_exists()
                        .col(id_column(ProductParameters::Id))
                        .col(
                            ColumnDef::new(ProductParameters::ProductInfoId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductParameters::ParameterId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductParameters::Value).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_parameters_product_info_id")
                                .from(ProductParameters::Table, ProductParameters::ProductInfoId)
                                .to(ProductInfos::Table, ProductInfos::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_parameters_parameter_id")
                                .from(ProductParameters::Table, ProductParameters::ParameterId)
                                .to(Parameters::Table, Parameters::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_parameters_unique")
                        .table(ProductParameters::Table)
                        .col(ProductParameters::ProductInfoId)
                        .col(ProductParameters::ParameterId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductParameters::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Parameters::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductInfos::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ShopCategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Shops::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000003_create_order_tables {
    use super::{ProductInfos, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_order_tables"
        }
    }

    #[derive(DeriveIden)]
    enum Contacts {
        Table,
        Id,
        UserId,
        City,
        Street,
        House,
        Structure,
        Building,
        Apartment,
        Phone,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        UserId,
        Dt,
        State,
        ContactId,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductInfoId,
        Quantity,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Contacts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Contacts::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Contacts::UserId).integer().not_null())
                        .col(ColumnDef::new(Contacts::City).string_len(50).not_null())
                        .col(ColumnDef::new(Contacts::Street).string_len(100).not_null())
                        .col(ColumnDef::new(Contacts::House).string_len(15).not_null())
                        .col(
                            ColumnDef::new(Contacts::Structure)
                                .string_len(15)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Contacts::Building)
                                .string_len(15)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Contacts::Apartment)
                                .string_len(15)
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Contacts::Phone).string_len(20).not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_contacts_user_id")
                                .from(Contacts::Table, Contacts::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::UserId).integer().not_null())
                        .col(
                            ColumnDef::new(Orders::Dt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::State).string_len(15).not_null())
                        .col(ColumnDef::new(Orders::ContactId).integer().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_user_id")
                                .from(Orders::Table, Orders::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_contact_id")
                                .from(Orders::Table, Orders::ContactId)
                                .to(Contacts::Table, Contacts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_state")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .col(Orders::State)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ProductInfoId).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_product_info_id")
                                .from(OrderItems::Table, OrderItems::ProductInfoId)
                                .to(ProductInfos::Table, ProductInfos::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_unique_line")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .col(OrderItems::ProductInfoId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Contacts::Table).to_owned())
                .await
        }
    }
}
