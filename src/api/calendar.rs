use axum::{
    extract::{Extension, Json, Query},
    response::{IntoResponse, Response},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sea_orm::{ColumnTrait, DatabaseConnection, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::api::crud::{self, non_blank};
use crate::api::middleware::TenantContext;
use crate::calendar::{self, BusinessHours, DayView, Interval};
use crate::entities::{appointment, Appointment};
use crate::error::ApiResult;

#[derive(Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
    pub veterinarian: Option<String>,
}

#[derive(Deserialize)]
pub struct WeekQuery {
    /// First day of the week shown.
    pub start: NaiveDate,
    pub veterinarian: Option<String>,
}

#[derive(Serialize)]
struct DayResponse<'a> {
    business_hours: HoursResponse,
    #[serde(flatten)]
    view: DayView<'a, appointment::Model>,
    appointments: &'a [appointment::Model],
}

#[derive(Serialize)]
struct WeekResponse<'a> {
    business_hours: HoursResponse,
    days: Vec<DayView<'a, appointment::Model>>,
}

#[derive(Serialize)]
struct HoursResponse {
    opens_at: chrono::NaiveTime,
    closes_at: chrono::NaiveTime,
    slot_minutes: u32,
}

impl From<&BusinessHours> for HoursResponse {
    fn from(hours: &BusinessHours) -> Self {
        Self {
            opens_at: hours.opens_at,
            closes_at: hours.closes_at,
            slot_minutes: hours.slot_minutes,
        }
    }
}

/// Appointments of the tenant overlapping `range`, earliest first.
async fn appointments_in(
    db: &DatabaseConnection,
    tenant_id: i32,
    range: Interval,
    veterinarian: Option<String>,
) -> ApiResult<Vec<appointment::Model>> {
    let mut select = crud::scoped::<Appointment>(tenant_id)
        .filter(appointment::Column::StartsAt.lt(range.end))
        .filter(appointment::Column::EndsAt.gt(range.start))
        .order_by_asc(appointment::Column::StartsAt);
    if let Some(vet) = non_blank(veterinarian) {
        select = select.filter(appointment::Column::Veterinarian.eq(vet));
    }
    Ok(select.all(db).await?)
}

// GET /calendar/day?date=YYYY-MM-DD
pub async fn day(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<DayQuery>,
) -> ApiResult<Response> {
    let hours = ctx.tenant.business_hours();
    let appointments = appointments_in(
        &db,
        ctx.tenant_id(),
        Interval::whole_day(query.date),
        query.veterinarian,
    )
    .await?;

    tracing::Span::current()
        .record("table", "appointments")
        .record("action", "calendar_day");

    let body = DayResponse {
        business_hours: HoursResponse::from(&hours),
        view: calendar::day_view(query.date, &hours, &appointments),
        appointments: &appointments,
    };
    Ok(Json(body).into_response())
}

// GET /calendar/week?start=YYYY-MM-DD
pub async fn week(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<WeekQuery>,
) -> ApiResult<Response> {
    let hours = ctx.tenant.business_hours();
    let first = Interval::whole_day(query.start);
    let range = Interval {
        start: first.start,
        end: first
            .start
            .checked_add_signed(Duration::days(7))
            .unwrap_or(NaiveDateTime::MAX),
    };
    let appointments = appointments_in(&db, ctx.tenant_id(), range, query.veterinarian).await?;

    tracing::Span::current()
        .record("table", "appointments")
        .record("action", "calendar_week");

    let body = WeekResponse {
        business_hours: HoursResponse::from(&hours),
        days: calendar::week_view(query.start, &hours, &appointments),
    };
    Ok(Json(body).into_response())
}

// GET /calendar/free-slots?date=YYYY-MM-DD&veterinarian=...
pub async fn free_slots(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<DayQuery>,
) -> ApiResult<Json<Vec<Interval>>> {
    let hours = ctx.tenant.business_hours();
    let appointments =
        appointments_in(&db, ctx.tenant_id(), Interval::whole_day(query.date), None).await?;
    let veterinarian = non_blank(query.veterinarian);
    Ok(Json(calendar::free_slots(
        query.date,
        &hours,
        &appointments,
        veterinarian.as_deref(),
    )))
}
