use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::TenantId).integer().not_null())
                    .col(ColumnDef::new(Customers::Name).string().not_null())
                    .col(ColumnDef::new(Customers::Cpf).string_len(11))
                    .col(ColumnDef::new(Customers::Email).string())
                    .col(ColumnDef::new(Customers::Phone).string())
                    .col(ColumnDef::new(Customers::Address).text())
                    .col(ColumnDef::new(Customers::Notes).text())
                    .col(ColumnDef::new(Customers::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Customers::UpdatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customers_tenant")
                            .from(Customers::Table, Customers::TenantId)
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
                    .name("idx_customers_tenant_cpf")
                    .table(Customers::Table)
                    .col(Customers::TenantId)
                    .col(Customers::Cpf)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Pets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Pets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Pets::TenantId).integer().not_null())
                    .col(ColumnDef::new(Pets::CustomerId).integer().not_null())
                    .col(ColumnDef::new(Pets::Name).string().not_null())
                    .col(ColumnDef::new(Pets::Species).string().not_null())
                    .col(ColumnDef::new(Pets::Breed).string())
                    .col(ColumnDef::new(Pets::Sex).string())
                    .col(ColumnDef::new(Pets::BirthDate).date())
                    .col(ColumnDef::new(Pets::WeightGrams).integer())
                    .col(ColumnDef::new(Pets::Notes).text())
                    .col(ColumnDef::new(Pets::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Pets::UpdatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pets_customer")
                            .from(Pets::Table, Pets::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pets_tenant_customer")
                    .table(Pets::Table)
                    .col(Pets::TenantId)
                    .col(Pets::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Appointments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Appointments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Appointments::TenantId).integer().not_null())
                    .col(ColumnDef::new(Appointments::CustomerId).integer().not_null())
                    .col(ColumnDef::new(Appointments::PetId).integer().not_null())
                    .col(ColumnDef::new(Appointments::Veterinarian).string().not_null())
                    .col(ColumnDef::new(Appointments::Service).string().not_null())
                    .col(ColumnDef::new(Appointments::StartsAt).date_time().not_null())
                    .col(ColumnDef::new(Appointments::EndsAt).date_time().not_null())
                    .col(
                        ColumnDef::new(Appointments::Status)
                            .string()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(ColumnDef::new(Appointments::Notes).text())
                    .col(ColumnDef::new(Appointments::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Appointments::UpdatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointments_pet")
                            .from(Appointments::Table, Appointments::PetId)
                            .to(Pets::Table, Pets::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointments_customer")
                            .from(Appointments::Table, Appointments::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_appointments_tenant_starts_at")
                    .table(Appointments::Table)
                    .col(Appointments::TenantId)
                    .col(Appointments::StartsAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MedicalRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MedicalRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MedicalRecords::TenantId).integer().not_null())
                    .col(ColumnDef::new(MedicalRecords::PetId).integer().not_null())
                    .col(ColumnDef::new(MedicalRecords::AppointmentId).integer())
                    .col(ColumnDef::new(MedicalRecords::RecordType).string().not_null())
                    .col(ColumnDef::new(MedicalRecords::Title).string().not_null())
                    .col(ColumnDef::new(MedicalRecords::Description).text())
                    .col(ColumnDef::new(MedicalRecords::Diagnosis).text())
                    .col(ColumnDef::new(MedicalRecords::Prescription).text())
                    .col(ColumnDef::new(MedicalRecords::Veterinarian).string())
                    .col(ColumnDef::new(MedicalRecords::RecordedAt).date_time().not_null())
                    .col(ColumnDef::new(MedicalRecords::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_medical_records_pet")
                            .from(MedicalRecords::Table, MedicalRecords::PetId)
                            .to(Pets::Table, Pets::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Hospitalizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Hospitalizations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Hospitalizations::TenantId).integer().not_null())
                    .col(ColumnDef::new(Hospitalizations::PetId).integer().not_null())
                    .col(ColumnDef::new(Hospitalizations::Reason).text().not_null())
                    .col(ColumnDef::new(Hospitalizations::Ward).string())
                    .col(
                        ColumnDef::new(Hospitalizations::DailyRateCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Hospitalizations::Status).string().not_null())
                    .col(ColumnDef::new(Hospitalizations::AdmittedAt).date_time().not_null())
                    .col(ColumnDef::new(Hospitalizations::DischargedAt).date_time())
                    .col(ColumnDef::new(Hospitalizations::Notes).text())
                    .col(ColumnDef::new(Hospitalizations::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Hospitalizations::UpdatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_hospitalizations_pet")
                            .from(Hospitalizations::Table, Hospitalizations::PetId)
                            .to(Pets::Table, Pets::Id)
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
            .drop_table(Table::drop().table(Hospitalizations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MedicalRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Appointments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    TenantId,
    Name,
    Cpf,
    Email,
    Phone,
    Address,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Pets {
    Table,
    Id,
    TenantId,
    CustomerId,
    Name,
    Species,
    Breed,
    Sex,
    BirthDate,
    WeightGrams,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Appointments {
    Table,
    Id,
    TenantId,
    CustomerId,
    PetId,
    Veterinarian,
    Service,
    StartsAt,
    EndsAt,
    Status,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MedicalRecords {
    Table,
    Id,
    TenantId,
    PetId,
    AppointmentId,
    RecordType,
    Title,
    Description,
    Diagnosis,
    Prescription,
    Veterinarian,
    RecordedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Hospitalizations {
    Table,
    Id,
    TenantId,
    PetId,
    Reason,
    Ward,
    DailyRateCents,
    Status,
    AdmittedAt,
    DischargedAt,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
