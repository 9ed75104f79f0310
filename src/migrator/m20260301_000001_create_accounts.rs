use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

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
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tenants::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tenants::Name).string().not_null())
                    .col(
                        ColumnDef::new(Tenants::BusinessType)
                            .string()
                            .not_null()
                            .default("clinic"),
                    )
                    .col(ColumnDef::new(Tenants::Phone).string())
                    .col(ColumnDef::new(Tenants::Address).text())
                    .col(ColumnDef::new(Tenants::OpensAt).time().not_null())
                    .col(ColumnDef::new(Tenants::ClosesAt).time().not_null())
                    .col(
                        ColumnDef::new(Tenants::SlotMinutes)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(ColumnDef::new(Tenants::WebhookUrl).string())
                    .col(
                        ColumnDef::new(Tenants::Onboarded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Tenants::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Tenants::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TenantMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TenantMembers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TenantMembers::TenantId).integer().not_null())
                    .col(ColumnDef::new(TenantMembers::UserId).integer().not_null())
                    .col(ColumnDef::new(TenantMembers::Role).string().not_null())
                    .col(
                        ColumnDef::new(TenantMembers::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tenant_members_tenant")
                            .from(TenantMembers::Table, TenantMembers::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tenant_members_user")
                            .from(TenantMembers::Table, TenantMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tenant_members_tenant_user")
                    .table(TenantMembers::Table)
                    .col(TenantMembers::TenantId)
                    .col(TenantMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TenantMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    Name,
    BusinessType,
    Phone,
    Address,
    OpensAt,
    ClosesAt,
    SlotMinutes,
    WebhookUrl,
    Onboarded,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TenantMembers {
    Table,
    Id,
    TenantId,
    UserId,
    Role,
    CreatedAt,
}
