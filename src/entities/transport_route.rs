use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calendar::{Interval, Scheduled};

pub const STATUS_PLANNED: &str = "planned";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELED: &str = "canceled";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "transport_routes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub route_date: Date,
    pub driver: String,
    pub vehicle: String,
    pub starts_at: DateTime,
    pub ends_at: DateTime,
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    pub fn window(&self) -> Interval {
        Interval {
            start: self.starts_at,
            end: self.ends_at,
        }
    }
}

/// Books the route against its vehicle.
impl Scheduled for Model {
    fn id(&self) -> i32 {
        self.id
    }

    fn interval(&self) -> Interval {
        self.window()
    }

    fn resource(&self) -> &str {
        &self.vehicle
    }

    fn is_active(&self) -> bool {
        self.status != STATUS_CANCELED
    }
}

/// Books the route against its driver.
pub struct ByDriver<'a>(pub &'a Model);

impl Scheduled for ByDriver<'_> {
    fn id(&self) -> i32 {
        self.0.id
    }

    fn interval(&self) -> Interval {
        self.0.window()
    }

    fn resource(&self) -> &str {
        &self.0.driver
    }

    fn is_active(&self) -> bool {
        self.0.is_active()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transport_stop::Entity")]
    TransportStop,
}

impl Related<super::transport_stop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransportStop.def()
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
