use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::api::crud::{self, non_blank, Page};
use crate::api::middleware::TenantContext;
use crate::entities::hospitalization::{self, STATUS_ADMITTED, STATUS_DISCHARGED};
use crate::entities::{Hospitalization, Pet};
use crate::error::{ApiError, ApiResult};
use crate::finance;
use crate::validation::Validator;

#[derive(Deserialize)]
pub struct StayFilter {
    pub pet_id: Option<i32>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct AdmitRequest {
    pub pet_id: i32,
    pub reason: String,
    pub ward: Option<String>,
    pub daily_rate_cents: i64,
    pub admitted_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStayRequest {
    pub reason: Option<String>,
    pub ward: Option<String>,
    pub daily_rate_cents: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct DischargeRequest {
    pub discharged_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

/// A stay with its bill so far (or final bill once discharged).
#[derive(Serialize)]
pub struct StayResponse {
    #[serde(flatten)]
    pub stay: hospitalization::Model,
    pub days_charged: i64,
    pub total_cents: i64,
}

impl StayResponse {
    fn new(stay: hospitalization::Model, now: NaiveDateTime) -> Self {
        let until = stay.discharged_at.unwrap_or(now);
        Self {
            days_charged: finance::days_charged(stay.admitted_at, until),
            total_cents: finance::stay_total_cents(stay.admitted_at, until, stay.daily_rate_cents),
            stay,
        }
    }
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

// GET /hospitalizations
pub async fn list_stays(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<StayFilter>,
) -> ApiResult<Json<Vec<StayResponse>>> {
    let mut select = crud::scoped::<Hospitalization>(ctx.tenant_id());
    if let Some(pet_id) = filter.pet_id {
        select = select.filter(hospitalization::Column::PetId.eq(pet_id));
    }
    if let Some(status) = non_blank(filter.status) {
        select = select.filter(hospitalization::Column::Status.eq(status));
    }
    let at = now();
    let stays = crud::list(&db, select, &page)
        .await?
        .into_iter()
        .map(|s| StayResponse::new(s, at))
        .collect();
    Ok(Json(stays))
}

// POST /hospitalizations - Admit a pet
pub async fn admit(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<AdmitRequest>,
) -> ApiResult<impl IntoResponse> {
    Validator::new()
        .required("reason", &payload.reason)
        .money("daily_rate_cents", payload.daily_rate_cents)
        .finish()?;

    let txn = db.begin().await?;
    let pet = crud::scoped::<Pet>(ctx.tenant_id())
        .filter(crate::entities::pet::Column::Id.eq(payload.pet_id))
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::invalid_field("pet_id", "unknown pet"))?;

    crud::lock_tenant(&txn, ctx.tenant_id()).await?;
    let already_admitted = crud::scoped::<Hospitalization>(ctx.tenant_id())
        .filter(hospitalization::Column::PetId.eq(pet.id))
        .filter(hospitalization::Column::Status.eq(STATUS_ADMITTED))
        .one(&txn)
        .await?;
    if already_admitted.is_some() {
        return Err(ApiError::Conflict(format!("{} is already hospitalized", pet.name)));
    }

    let at = now();
    let created = hospitalization::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        pet_id: Set(pet.id),
        reason: Set(payload.reason.trim().to_string()),
        ward: Set(non_blank(payload.ward)),
        daily_rate_cents: Set(payload.daily_rate_cents),
        status: Set(STATUS_ADMITTED.to_string()),
        admitted_at: Set(payload.admitted_at.unwrap_or(at)),
        discharged_at: Set(None),
        notes: Set(non_blank(payload.notes)),
        created_at: Set(at),
        updated_at: Set(at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "hospitalizations")
        .record("action", "admit")
        .record("business_event", "Pet admitted");

    Ok((StatusCode::CREATED, Json(StayResponse::new(created, at))))
}

// GET /hospitalizations/:id
pub async fn get_stay(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(stay_id): Path<i32>,
) -> ApiResult<Json<StayResponse>> {
    let stay =
        crud::get::<Hospitalization, _>(&db, ctx.tenant_id(), stay_id, "Hospitalization").await?;
    Ok(Json(StayResponse::new(stay, now())))
}

// PATCH /hospitalizations/:id
pub async fn update_stay(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(stay_id): Path<i32>,
    Json(payload): Json<UpdateStayRequest>,
) -> ApiResult<Json<StayResponse>> {
    let mut v = Validator::new();
    v.required_opt("reason", payload.reason.as_deref());
    if let Some(rate) = payload.daily_rate_cents {
        v.money("daily_rate_cents", rate);
    }
    v.finish()?;

    let stay =
        crud::get::<Hospitalization, _>(&db, ctx.tenant_id(), stay_id, "Hospitalization").await?;
    let mut active = stay.into_active_model();
    if let Some(reason) = payload.reason {
        active.reason = Set(reason.trim().to_string());
    }
    if let Some(ward) = payload.ward {
        active.ward = Set(non_blank(Some(ward)));
    }
    if let Some(rate) = payload.daily_rate_cents {
        active.daily_rate_cents = Set(rate);
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(non_blank(Some(notes)));
    }
    let at = now();
    active.updated_at = Set(at);

    Ok(Json(StayResponse::new(active.update(&db).await?, at)))
}

// POST /hospitalizations/:id/discharge
pub async fn discharge(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(stay_id): Path<i32>,
    payload: Option<Json<DischargeRequest>>,
) -> ApiResult<Json<StayResponse>> {
    let Json(payload) = payload.unwrap_or_default();
    let stay =
        crud::get::<Hospitalization, _>(&db, ctx.tenant_id(), stay_id, "Hospitalization").await?;
    if stay.status == STATUS_DISCHARGED {
        return Err(ApiError::Conflict("Hospitalization already discharged".to_string()));
    }

    let at = now();
    let discharged_at = payload.discharged_at.unwrap_or(at);
    if discharged_at < stay.admitted_at {
        return Err(ApiError::invalid_field(
            "discharged_at",
            "must not be before admitted_at",
        ));
    }

    let mut active = stay.into_active_model();
    active.status = Set(STATUS_DISCHARGED.to_string());
    active.discharged_at = Set(Some(discharged_at));
    if let Some(notes) = payload.notes {
        active.notes = Set(non_blank(Some(notes)));
    }
    active.updated_at = Set(at);
    let updated = active.update(&db).await?;

    tracing::Span::current()
        .record("table", "hospitalizations")
        .record("action", "discharge")
        .record("business_event", "Pet discharged");

    Ok(Json(StayResponse::new(updated, at)))
}
