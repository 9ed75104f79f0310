use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TransportRoutes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransportRoutes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TransportRoutes::TenantId).integer().not_null())
                    .col(ColumnDef::new(TransportRoutes::RouteDate).date().not_null())
                    .col(ColumnDef::new(TransportRoutes::Driver).string().not_null())
                    .col(ColumnDef::new(TransportRoutes::Vehicle).string().not_null())
                    .col(ColumnDef::new(TransportRoutes::StartsAt).date_time().not_null())
                    .col(ColumnDef::new(TransportRoutes::EndsAt).date_time().not_null())
                    .col(
                        ColumnDef::new(TransportRoutes::Status)
                            .string()
                            .not_null()
                            .default("planned"),
                    )
                    .col(ColumnDef::new(TransportRoutes::Notes).text())
                    .col(ColumnDef::new(TransportRoutes::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(TransportRoutes::UpdatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transport_routes_tenant")
                            .from(TransportRoutes::Table, TransportRoutes::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transport_routes_tenant_date")
                    .table(TransportRoutes::Table)
                    .col(TransportRoutes::TenantId)
                    .col(TransportRoutes::RouteDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransportStops::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransportStops::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TransportStops::TenantId).integer().not_null())
                    .col(ColumnDef::new(TransportStops::RouteId).integer().not_null())
                    .col(ColumnDef::new(TransportStops::CustomerId).integer().not_null())
                    .col(ColumnDef::new(TransportStops::PetId).integer())
                    .col(ColumnDef::new(TransportStops::Kind).string().not_null())
                    .col(ColumnDef::new(TransportStops::Address).text().not_null())
                    .col(ColumnDef::new(TransportStops::ScheduledAt).date_time().not_null())
                    .col(
                        ColumnDef::new(TransportStops::Completed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(TransportStops::CompletedAt).date_time())
                    .col(ColumnDef::new(TransportStops::Notes).text())
                    .col(ColumnDef::new(TransportStops::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transport_stops_route")
                            .from(TransportStops::Table, TransportStops::RouteId)
                            .to(TransportRoutes::Table, TransportRoutes::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransportStops::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TransportRoutes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TransportRoutes {
    Table,
    Id,
    TenantId,
    RouteDate,
    Driver,
    Vehicle,
    StartsAt,
    EndsAt,
    Status,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TransportStops {
    Table,
    Id,
    TenantId,
    RouteId,
    CustomerId,
    PetId,
    Kind,
    Address,
    ScheduledAt,
    Completed,
    CompletedAt,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
