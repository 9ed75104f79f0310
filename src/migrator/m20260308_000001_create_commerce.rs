use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::TenantId).integer().not_null())
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::Sku).string())
                    .col(ColumnDef::new(Products::Category).string())
                    .col(ColumnDef::new(Products::PriceCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(Products::CostCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::StockQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::MinStock)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Products::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Products::UpdatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_tenant")
                            .from(Products::Table, Products::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sales::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sales::TenantId).integer().not_null())
                    .col(ColumnDef::new(Sales::CustomerId).integer())
                    .col(ColumnDef::new(Sales::TotalCents).big_integer().not_null())
                    .col(ColumnDef::new(Sales::PaymentMethod).string().not_null())
                    .col(ColumnDef::new(Sales::SoldAt).date_time().not_null())
                    .col(ColumnDef::new(Sales::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_tenant")
                            .from(Sales::Table, Sales::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SaleItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SaleItems::SaleId).integer().not_null())
                    .col(ColumnDef::new(SaleItems::ProductId).integer().not_null())
                    .col(ColumnDef::new(SaleItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(SaleItems::UnitPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_items_sale")
                            .from(SaleItems::Table, SaleItems::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_items_product")
                            .from(SaleItems::Table, SaleItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FinancialTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FinancialTransactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FinancialTransactions::TenantId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FinancialTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(FinancialTransactions::Category)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FinancialTransactions::Description).text())
                    .col(
                        ColumnDef::new(FinancialTransactions::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FinancialTransactions::DueDate).date())
                    .col(ColumnDef::new(FinancialTransactions::PaidAt).date_time())
                    .col(ColumnDef::new(FinancialTransactions::SaleId).integer())
                    .col(
                        ColumnDef::new(FinancialTransactions::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FinancialTransactions::UpdatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_financial_transactions_sale")
                            .from(FinancialTransactions::Table, FinancialTransactions::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_financial_transactions_tenant_paid_at")
                    .table(FinancialTransactions::Table)
                    .col(FinancialTransactions::TenantId)
                    .col(FinancialTransactions::PaidAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FinancialTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaleItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    TenantId,
    Name,
    Sku,
    Category,
    PriceCents,
    CostCents,
    StockQuantity,
    MinStock,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Sales {
    Table,
    Id,
    TenantId,
    CustomerId,
    TotalCents,
    PaymentMethod,
    SoldAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SaleItems {
    Table,
    Id,
    SaleId,
    ProductId,
    Quantity,
    UnitPriceCents,
}

#[derive(DeriveIden)]
enum FinancialTransactions {
    Table,
    Id,
    TenantId,
    Kind,
    Category,
    Description,
    AmountCents,
    DueDate,
    PaidAt,
    SaleId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
