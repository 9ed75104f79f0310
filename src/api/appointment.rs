use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, IntoActiveModel,
    QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::crud::{self, non_blank, Page};
use crate::api::middleware::TenantContext;
use crate::calendar::{self, Interval};
use crate::entities::appointment::{self, AppointmentStatus};
use crate::entities::{Appointment, Customer, Pet};
use crate::error::{ApiError, ApiResult};
use crate::integrations::{IntegrationEvent, WebhookDispatcher};
use crate::validation::Validator;

#[derive(Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<String>,
    pub veterinarian: Option<String>,
    pub pet_id: Option<i32>,
    pub customer_id: Option<i32>,
    /// First day (inclusive) of the start date range.
    pub from: Option<NaiveDate>,
    /// Last day (inclusive) of the start date range.
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub customer_id: i32,
    pub pet_id: i32,
    pub veterinarian: String,
    pub service: String,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAppointmentRequest {
    pub customer_id: Option<i32>,
    pub pet_id: Option<i32>,
    pub veterinarian: Option<String>,
    pub service: Option<String>,
    pub starts_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

fn parse_status(value: &str) -> ApiResult<AppointmentStatus> {
    AppointmentStatus::parse(value).ok_or_else(|| {
        ApiError::invalid_field(
            "status",
            &format!("must be one of: {}", AppointmentStatus::ALL.join(", ")),
        )
    })
}

fn check_completion(status: AppointmentStatus, starts_at: NaiveDateTime) -> ApiResult<()> {
    if status == AppointmentStatus::Completed && starts_at > chrono::Utc::now().naive_utc() {
        return Err(ApiError::invalid_field(
            "status",
            "cannot complete an appointment that has not started",
        ));
    }
    Ok(())
}

/// The pet must exist in the tenant and belong to the customer.
async fn check_pet_owner<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    customer_id: i32,
    pet_id: i32,
) -> ApiResult<()> {
    crud::scoped::<Customer>(tenant_id)
        .filter(crate::entities::customer::Column::Id.eq(customer_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::invalid_field("customer_id", "unknown customer"))?;

    let pet = crud::scoped::<Pet>(tenant_id)
        .filter(crate::entities::pet::Column::Id.eq(pet_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::invalid_field("pet_id", "unknown pet"))?;

    if pet.customer_id != customer_id {
        return Err(ApiError::invalid_field(
            "pet_id",
            "pet does not belong to this customer",
        ));
    }
    Ok(())
}

/// Rejects `interval` when the veterinarian already has an active booking overlapping it.
async fn ensure_free<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    veterinarian: &str,
    interval: &Interval,
    exclude_id: Option<i32>,
) -> ApiResult<()> {
    let nearby = crud::scoped::<Appointment>(tenant_id)
        .filter(appointment::Column::StartsAt.lt(interval.end))
        .filter(appointment::Column::EndsAt.gt(interval.start))
        .all(db)
        .await?;

    if let Some(clash) = calendar::conflicts(interval, veterinarian, exclude_id, &nearby).first() {
        return Err(ApiError::Conflict(format!(
            "{} is already booked from {} to {}",
            clash.veterinarian, clash.starts_at, clash.ends_at
        )));
    }
    Ok(())
}

fn interval_of(starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> ApiResult<Interval> {
    Interval::new(starts_at, ends_at)
        .ok_or_else(|| ApiError::invalid_field("ends_at", "must be after starts_at"))
}

// GET /appointments
pub async fn list_appointments(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<AppointmentFilter>,
) -> ApiResult<Json<Vec<appointment::Model>>> {
    let mut select = crud::scoped::<Appointment>(ctx.tenant_id());
    if let Some(status) = non_blank(filter.status) {
        select = select.filter(appointment::Column::Status.eq(parse_status(&status)?.as_str()));
    }
    if let Some(vet) = non_blank(filter.veterinarian) {
        select = select.filter(appointment::Column::Veterinarian.eq(vet));
    }
    if let Some(pet_id) = filter.pet_id {
        select = select.filter(appointment::Column::PetId.eq(pet_id));
    }
    if let Some(customer_id) = filter.customer_id {
        select = select.filter(appointment::Column::CustomerId.eq(customer_id));
    }
    if let Some(from) = filter.from {
        select = select.filter(appointment::Column::StartsAt.gte(Interval::whole_day(from).start));
    }
    if let Some(to) = filter.to {
        select = select.filter(appointment::Column::StartsAt.lt(Interval::whole_day(to).end));
    }
    Ok(Json(crud::list(&db, select, &page).await?))
}

// POST /appointments
pub async fn create_appointment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Extension(dispatcher): Extension<WebhookDispatcher>,
    Json(payload): Json<CreateAppointmentRequest>,
) -> ApiResult<impl IntoResponse> {
    Validator::new()
        .required("veterinarian", &payload.veterinarian)
        .required("service", &payload.service)
        .finish()?;
    let status = match payload.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => AppointmentStatus::Scheduled,
    };
    let interval = interval_of(payload.starts_at, payload.ends_at)?;
    check_completion(status, payload.starts_at)?;

    let txn = db.begin().await?;
    check_pet_owner(&txn, ctx.tenant_id(), payload.customer_id, payload.pet_id).await?;

    let veterinarian = payload.veterinarian.trim().to_string();
    if status.is_active() {
        crud::lock_tenant(&txn, ctx.tenant_id()).await?;
        ensure_free(&txn, ctx.tenant_id(), &veterinarian, &interval, None).await?;
    }

    let now = chrono::Utc::now().naive_utc();
    let created = appointment::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        customer_id: Set(payload.customer_id),
        pet_id: Set(payload.pet_id),
        veterinarian: Set(veterinarian),
        service: Set(payload.service.trim().to_string()),
        starts_at: Set(interval.start),
        ends_at: Set(interval.end),
        status: Set(status.as_str().to_string()),
        notes: Set(non_blank(payload.notes)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "appointments")
        .record("action", "create_appointment")
        .record("business_event", "Appointment booked");
    crate::metrics::record_appointment_status(status.as_str());
    dispatcher.dispatch(
        ctx.tenant.webhook_url.as_deref(),
        IntegrationEvent::appointment_created(&created),
    );

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /appointments/:id
pub async fn get_appointment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(appointment_id): Path<i32>,
) -> ApiResult<Json<appointment::Model>> {
    Ok(Json(
        crud::get::<Appointment, _>(&db, ctx.tenant_id(), appointment_id, "Appointment").await?,
    ))
}

// PATCH /appointments/:id - Reschedule or edit details
pub async fn update_appointment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(appointment_id): Path<i32>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> ApiResult<Json<appointment::Model>> {
    Validator::new()
        .required_opt("veterinarian", payload.veterinarian.as_deref())
        .required_opt("service", payload.service.as_deref())
        .finish()?;

    let txn = db.begin().await?;
    let existing =
        crud::get::<Appointment, _>(&txn, ctx.tenant_id(), appointment_id, "Appointment").await?;

    let customer_id = payload.customer_id.unwrap_or(existing.customer_id);
    let pet_id = payload.pet_id.unwrap_or(existing.pet_id);
    if payload.customer_id.is_some() || payload.pet_id.is_some() {
        check_pet_owner(&txn, ctx.tenant_id(), customer_id, pet_id).await?;
    }

    let veterinarian = payload
        .veterinarian
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| existing.veterinarian.clone());
    let interval = interval_of(
        payload.starts_at.unwrap_or(existing.starts_at),
        payload.ends_at.unwrap_or(existing.ends_at),
    )?;
    let status = parse_status(&existing.status)?;
    check_completion(status, interval.start)?;
    if status.is_active() {
        crud::lock_tenant(&txn, ctx.tenant_id()).await?;
        ensure_free(&txn, ctx.tenant_id(), &veterinarian, &interval, Some(existing.id)).await?;
    }

    let mut active = existing.into_active_model();
    active.customer_id = Set(customer_id);
    active.pet_id = Set(pet_id);
    active.veterinarian = Set(veterinarian);
    active.starts_at = Set(interval.start);
    active.ends_at = Set(interval.end);
    if let Some(service) = payload.service {
        active.service = Set(service.trim().to_string());
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(non_blank(Some(notes)));
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    let updated = active.update(&txn).await?;
    txn.commit().await?;
    tracing::Span::current()
        .record("table", "appointments")
        .record("action", "update_appointment");
    Ok(Json(updated))
}

// POST /appointments/:id/status
pub async fn set_appointment_status(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Extension(dispatcher): Extension<WebhookDispatcher>,
    Path(appointment_id): Path<i32>,
    Json(payload): Json<StatusRequest>,
) -> ApiResult<Json<appointment::Model>> {
    let status = parse_status(payload.status.trim())?;
    let txn = db.begin().await?;
    let existing =
        crud::get::<Appointment, _>(&txn, ctx.tenant_id(), appointment_id, "Appointment").await?;
    check_completion(status, existing.starts_at)?;

    let was_active = AppointmentStatus::parse(&existing.status).map_or(true, |s| s.is_active());
    if status.is_active() && !was_active {
        // Reactivating takes the slot back
        let interval = interval_of(existing.starts_at, existing.ends_at)?;
        crud::lock_tenant(&txn, ctx.tenant_id()).await?;
        ensure_free(
            &txn,
            ctx.tenant_id(),
            &existing.veterinarian,
            &interval,
            Some(existing.id),
        )
        .await?;
    }

    let mut active = existing.into_active_model();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "appointments")
        .record("action", "set_appointment_status")
        .record("business_event", status.as_str());
    crate::metrics::record_appointment_status(status.as_str());
    dispatcher.dispatch(
        ctx.tenant.webhook_url.as_deref(),
        IntegrationEvent::appointment_status_changed(&updated),
    );

    Ok(Json(updated))
}

// DELETE /appointments/:id
pub async fn delete_appointment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(appointment_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    crud::delete::<Appointment, _>(&db, ctx.tenant_id(), appointment_id, "Appointment").await?;
    tracing::Span::current()
        .record("table", "appointments")
        .record("action", "delete_appointment");
    Ok(Json(json!({"message": "Appointment deleted"})))
}
