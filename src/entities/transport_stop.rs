use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "transport_stops")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub route_id: i32,
    pub customer_id: i32,
    pub pet_id: Option<i32>,
    pub kind: String,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    pub scheduled_at: DateTime,
    pub completed: bool,
    pub completed_at: Option<DateTime>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transport_route::Entity",
        from = "Column::RouteId",
        to = "super::transport_route::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    TransportRoute,
}

impl Related<super::transport_route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransportRoute.def()
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
