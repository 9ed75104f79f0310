use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calendar::BusinessHours;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub business_type: String,
    pub phone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,
    pub opens_at: Time,
    pub closes_at: Time,
    pub slot_minutes: i32,
    pub webhook_url: Option<String>,
    pub onboarded: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    pub fn business_hours(&self) -> BusinessHours {
        BusinessHours {
            opens_at: self.opens_at,
            closes_at: self.closes_at,
            slot_minutes: self.slot_minutes.max(0) as u32,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tenant_member::Entity")]
    TenantMember,
}

impl Related<super::tenant_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TenantMember.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
