use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_ADMITTED: &str = "admitted";
pub const STATUS_DISCHARGED: &str = "discharged";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "hospitalizations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub pet_id: i32,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    pub ward: Option<String>,
    pub daily_rate_cents: i64,
    pub status: String,
    pub admitted_at: DateTime,
    pub discharged_at: Option<DateTime>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pet::Entity",
        from = "Column::PetId",
        to = "super::pet::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Pet,
}

impl Related<super::pet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pet.def()
    }
}

impl super::TenantScoped for Entity {
    fn tenant_column() -> Column {
        Column::TenantId
    }
    fn id_column() -> Column {
        Column::Id
    }
}

impl ActiveModelBehavior for ActiveModel {}
