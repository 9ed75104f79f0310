use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, IntoActiveModel, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::crud::{self, non_blank, Page};
use crate::api::middleware::TenantContext;
use crate::entities::medical_record::{self, RECORD_TYPES};
use crate::entities::{Appointment, MedicalRecord, Pet};
use crate::error::{ApiError, ApiResult};
use crate::validation::Validator;

#[derive(Deserialize)]
pub struct RecordFilter {
    pub pet_id: Option<i32>,
    pub record_type: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateRecordRequest {
    pub pet_id: i32,
    pub appointment_id: Option<i32>,
    pub record_type: String,
    pub title: String,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub veterinarian: Option<String>,
    pub recorded_at: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
pub struct UpdateRecordRequest {
    pub record_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub veterinarian: Option<String>,
    pub recorded_at: Option<NaiveDateTime>,
}

// GET /medical-records - Newest first
pub async fn list_records(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<RecordFilter>,
) -> ApiResult<Json<Vec<medical_record::Model>>> {
    let mut select = crud::scoped::<MedicalRecord>(ctx.tenant_id());
    if let Some(pet_id) = filter.pet_id {
        select = select.filter(medical_record::Column::PetId.eq(pet_id));
    }
    if let Some(record_type) = non_blank(filter.record_type) {
        select = select.filter(medical_record::Column::RecordType.eq(record_type));
    }
    let records = page
        .apply(
            select
                .order_by_desc(medical_record::Column::RecordedAt)
                .order_by_desc(medical_record::Column::Id),
        )
        .all(&db)
        .await?;
    Ok(Json(records))
}

// POST /medical-records
pub async fn create_record(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<CreateRecordRequest>,
) -> ApiResult<impl IntoResponse> {
    Validator::new()
        .required("title", &payload.title)
        .one_of("record_type", &payload.record_type, &RECORD_TYPES)
        .finish()?;

    let pet = crud::scoped::<Pet>(ctx.tenant_id())
        .filter(crate::entities::pet::Column::Id.eq(payload.pet_id))
        .one(&db)
        .await?
        .ok_or_else(|| ApiError::invalid_field("pet_id", "unknown pet"))?;

    if let Some(appointment_id) = payload.appointment_id {
        let appointment =
            crud::get::<Appointment, _>(&db, ctx.tenant_id(), appointment_id, "Appointment")
                .await?;
        if appointment.pet_id != pet.id {
            return Err(ApiError::invalid_field(
                "appointment_id",
                "appointment is for another pet",
            ));
        }
    }

    let now = chrono::Utc::now().naive_utc();
    let created = medical_record::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        pet_id: Set(pet.id),
        appointment_id: Set(payload.appointment_id),
        record_type: Set(payload.record_type),
        title: Set(payload.title.trim().to_string()),
        description: Set(non_blank(payload.description)),
        diagnosis: Set(non_blank(payload.diagnosis)),
        prescription: Set(non_blank(payload.prescription)),
        veterinarian: Set(non_blank(payload.veterinarian)),
        recorded_at: Set(payload.recorded_at.unwrap_or(now)),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    tracing::Span::current()
        .record("table", "medical_records")
        .record("action", "create_record")
        .record("business_event", "Medical record added");

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /medical-records/:id
pub async fn get_record(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(record_id): Path<i32>,
) -> ApiResult<Json<medical_record::Model>> {
    Ok(Json(
        crud::get::<MedicalRecord, _>(&db, ctx.tenant_id(), record_id, "Medical record").await?,
    ))
}

// PATCH /medical-records/:id
pub async fn update_record(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(record_id): Path<i32>,
    Json(payload): Json<UpdateRecordRequest>,
) -> ApiResult<Json<medical_record::Model>> {
    let mut v = Validator::new();
    v.required_opt("title", payload.title.as_deref());
    if let Some(record_type) = payload.record_type.as_deref() {
        v.one_of("record_type", record_type, &RECORD_TYPES);
    }
    v.finish()?;

    let record =
        crud::get::<MedicalRecord, _>(&db, ctx.tenant_id(), record_id, "Medical record").await?;
    let mut active = record.into_active_model();
    if let Some(record_type) = payload.record_type {
        active.record_type = Set(record_type);
    }
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(non_blank(Some(description)));
    }
    if let Some(diagnosis) = payload.diagnosis {
        active.diagnosis = Set(non_blank(Some(diagnosis)));
    }
    if let Some(prescription) = payload.prescription {
        active.prescription = Set(non_blank(Some(prescription)));
    }
    if let Some(veterinarian) = payload.veterinarian {
        active.veterinarian = Set(non_blank(Some(veterinarian)));
    }
    if let Some(recorded_at) = payload.recorded_at {
        active.recorded_at = Set(recorded_at);
    }

    Ok(Json(active.update(&db).await?))
}

// DELETE /medical-records/:id
pub async fn delete_record(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(record_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    crud::delete::<MedicalRecord, _>(&db, ctx.tenant_id(), record_id, "Medical record").await?;
    Ok(Json(json!({"message": "Medical record deleted"})))
}
