use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::TenantContext;
use crate::calendar::BusinessHours;
use crate::entities::{tenant, tenant_member, user, Tenant, TenantMember, User};
use crate::error::{ApiError, ApiResult};
use crate::validation::Validator;

pub const BUSINESS_TYPES: [&str; 2] = ["clinic", "petshop"];

#[derive(Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub business_type: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub business_type: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
    pub slot_minutes: Option<i32>,
    pub webhook_url: Option<String>,
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct MemberResponse {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
}

// POST /tenants - Create a tenant owned by the caller
pub async fn create_tenant(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<CreateTenantRequest>,
) -> ApiResult<impl IntoResponse> {
    let business_type = payload
        .business_type
        .unwrap_or_else(|| BUSINESS_TYPES[0].to_string());
    Validator::new()
        .required("name", &payload.name)
        .one_of("business_type", &business_type, &BUSINESS_TYPES)
        .finish()?;

    let hours = BusinessHours::default();
    let now = chrono::Utc::now().naive_utc();

    let txn = db.begin().await?;
    let created = tenant::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        business_type: Set(business_type),
        phone: Set(None),
        address: Set(None),
        opens_at: Set(hours.opens_at),
        closes_at: Set(hours.closes_at),
        slot_minutes: Set(hours.slot_minutes as i32),
        webhook_url: Set(None),
        onboarded: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    tenant_member::ActiveModel {
        tenant_id: Set(created.id),
        user_id: Set(user_id),
        role: Set(tenant_member::ROLE_OWNER.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "tenants")
        .record("action", "create_tenant")
        .record("tenant_id", created.id)
        .record("business_event", "Tenant created");
    crate::metrics::increment_tenants();

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /tenants - Tenants the caller belongs to
pub async fn list_tenants(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> ApiResult<Json<Vec<tenant::Model>>> {
    let tenants = Tenant::find()
        .inner_join(TenantMember)
        .filter(tenant_member::Column::UserId.eq(user_id))
        .order_by_asc(tenant::Column::Id)
        .all(&db)
        .await?;
    Ok(Json(tenants))
}

// GET /tenant - The active tenant
pub async fn get_tenant(Extension(ctx): Extension<TenantContext>) -> Json<tenant::Model> {
    Json(ctx.tenant)
}

// PATCH /tenant
pub async fn update_tenant(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<UpdateTenantRequest>,
) -> ApiResult<Json<tenant::Model>> {
    ctx.require_owner()?;

    let opens_at = payload.opens_at.unwrap_or(ctx.tenant.opens_at);
    let closes_at = payload.closes_at.unwrap_or(ctx.tenant.closes_at);
    let mut v = Validator::new();
    v.required_opt("name", payload.name.as_deref())
        .check(closes_at > opens_at, "closes_at", "must be after opens_at");
    if let Some(business_type) = payload.business_type.as_deref() {
        v.one_of("business_type", business_type, &BUSINESS_TYPES);
    }
    if let Some(minutes) = payload.slot_minutes {
        v.check((5..=240).contains(&minutes), "slot_minutes", "must be between 5 and 240");
    }
    if let Some(url) = payload.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
        v.check(
            url.starts_with("http://") || url.starts_with("https://"),
            "webhook_url",
            "must be an http(s) URL",
        );
    }
    v.finish()?;

    let mut active = ctx.tenant.into_active_model();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(business_type) = payload.business_type {
        active.business_type = Set(business_type);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(crate::api::crud::non_blank(Some(phone)));
    }
    if let Some(address) = payload.address {
        active.address = Set(crate::api::crud::non_blank(Some(address)));
    }
    if let Some(minutes) = payload.slot_minutes {
        active.slot_minutes = Set(minutes);
    }
    if let Some(url) = payload.webhook_url {
        active.webhook_url = Set(crate::api::crud::non_blank(Some(url)));
    }
    active.opens_at = Set(opens_at);
    active.closes_at = Set(closes_at);
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    let updated = active.update(&db).await?;
    tracing::Span::current()
        .record("table", "tenants")
        .record("action", "update_tenant");
    Ok(Json(updated))
}

// GET /tenant/members
pub async fn list_members(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let rows = TenantMember::find()
        .filter(tenant_member::Column::TenantId.eq(ctx.tenant_id()))
        .find_also_related(User)
        .order_by_asc(tenant_member::Column::Id)
        .all(&db)
        .await?;

    let members = rows
        .into_iter()
        .filter_map(|(member, user)| {
            user.map(|u| MemberResponse {
                user_id: u.id,
                name: u.name,
                email: u.email,
                role: member.role,
            })
        })
        .collect();
    Ok(Json(members))
}

// POST /tenant/members - Add an existing user to the active tenant
pub async fn add_member(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<AddMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_owner()?;

    let role = payload
        .role
        .unwrap_or_else(|| tenant_member::ROLE_STAFF.to_string());
    Validator::new()
        .email("email", Some(payload.email.as_str()))
        .one_of(
            "role",
            &role,
            &[tenant_member::ROLE_OWNER, tenant_member::ROLE_STAFF],
        )
        .finish()?;

    let user = User::find()
        .filter(user::Column::Email.eq(payload.email.trim().to_lowercase()))
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let member = tenant_member::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        user_id: Set(user.id),
        role: Set(role),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    tracing::Span::current()
        .record("table", "tenant_members")
        .record("action", "add_member")
        .record("business_event", "Member added to tenant");

    Ok((
        StatusCode::CREATED,
        Json(MemberResponse {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: member.role,
        }),
    ))
}
