use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::crud::{self, non_blank, Page};
use crate::api::middleware::TenantContext;
use crate::calendar::{self, Interval};
use crate::entities::transport_route::{
    self, ByDriver, STATUS_CANCELED, STATUS_COMPLETED, STATUS_IN_PROGRESS, STATUS_PLANNED,
};
use crate::entities::{customer, pet, transport_stop, Customer, Pet, TransportRoute, TransportStop};
use crate::error::{ApiError, ApiResult};
use crate::validation::Validator;

pub const ROUTE_STATUSES: [&str; 4] = [
    STATUS_PLANNED,
    STATUS_IN_PROGRESS,
    STATUS_COMPLETED,
    STATUS_CANCELED,
];
pub const STOP_KINDS: [&str; 2] = ["pickup", "dropoff"];

#[derive(Deserialize)]
pub struct RouteFilter {
    pub date: Option<NaiveDate>,
    pub driver: Option<String>,
    pub vehicle: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct StopRequest {
    pub customer_id: i32,
    pub pet_id: Option<i32>,
    pub kind: String,
    pub address: String,
    pub scheduled_at: NaiveDateTime,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateRouteRequest {
    pub driver: String,
    pub vehicle: String,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub notes: Option<String>,
    #[serde(default)]
    pub stops: Vec<StopRequest>,
}

#[derive(Deserialize)]
pub struct UpdateRouteRequest {
    pub driver: Option<String>,
    pub vehicle: Option<String>,
    pub starts_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct RouteDetail {
    #[serde(flatten)]
    pub route: transport_route::Model,
    pub stops: Vec<transport_stop::Model>,
}

#[derive(Serialize)]
pub struct StopCompletion {
    pub stop: transport_stop::Model,
    pub route: transport_route::Model,
}

/// Refuses a window that double-books the driver or the vehicle.
async fn ensure_route_free<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    driver: &str,
    vehicle: &str,
    window: &Interval,
    exclude_id: Option<i32>,
) -> ApiResult<()> {
    let nearby = crud::scoped::<TransportRoute>(tenant_id)
        .filter(transport_route::Column::StartsAt.lt(window.end))
        .filter(transport_route::Column::EndsAt.gt(window.start))
        .all(db)
        .await?;

    if let Some(clash) = calendar::conflicts(window, vehicle, exclude_id, &nearby).first() {
        return Err(ApiError::Conflict(format!(
            "Vehicle {} is already on route #{} from {} to {}",
            clash.vehicle, clash.id, clash.starts_at, clash.ends_at
        )));
    }

    let by_driver: Vec<ByDriver> = nearby.iter().map(ByDriver).collect();
    if let Some(clash) = calendar::conflicts(window, driver, exclude_id, &by_driver).first() {
        return Err(ApiError::Conflict(format!(
            "Driver {} is already on route #{} from {} to {}",
            clash.0.driver, clash.0.id, clash.0.starts_at, clash.0.ends_at
        )));
    }
    Ok(())
}

fn window_of(starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> ApiResult<Interval> {
    let window = Interval::new(starts_at, ends_at)
        .ok_or_else(|| ApiError::invalid_field("ends_at", "must be after starts_at"))?;
    // route_date is the start's date, so a route stays within one day (ending
    // at the following midnight at the latest)
    let day = Interval::whole_day(window.start.date());
    if !day.contains(&window) {
        return Err(ApiError::invalid_field("ends_at", "must be on the same day as starts_at"));
    }
    Ok(window)
}

/// Status of a route after its stops changed: `completed` once nothing is
/// pending, `in_progress` while some are done. Canceled routes and routes with
/// no completed stop keep their status.
async fn settle_route<C: ConnectionTrait>(
    db: &C,
    route: transport_route::Model,
    now: NaiveDateTime,
) -> ApiResult<transport_route::Model> {
    if route.status == STATUS_CANCELED {
        return Ok(route);
    }
    let stops = stops_of(db, route.id).await?;
    let pending = stops.iter().filter(|s| !s.completed).count();
    if pending == stops.len() {
        return Ok(route);
    }
    let next_status = if pending == 0 {
        STATUS_COMPLETED
    } else {
        STATUS_IN_PROGRESS
    };
    if route.status == next_status {
        return Ok(route);
    }
    let mut active = route.into_active_model();
    active.status = Set(next_status.to_string());
    active.updated_at = Set(now);
    Ok(active.update(db).await?)
}

fn check_in_window(window: &Interval, scheduled_at: NaiveDateTime) -> ApiResult<()> {
    if scheduled_at < window.start || scheduled_at > window.end {
        return Err(ApiError::invalid_field(
            "scheduled_at",
            &format!("must be between {} and {}", window.start, window.end),
        ));
    }
    Ok(())
}

async fn insert_stop<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    route_id: i32,
    window: &Interval,
    stop: StopRequest,
) -> ApiResult<transport_stop::Model> {
    Validator::new()
        .required("address", &stop.address)
        .one_of("kind", &stop.kind, &STOP_KINDS)
        .finish()?;
    check_in_window(window, stop.scheduled_at)?;

    crud::scoped::<Customer>(tenant_id)
        .filter(customer::Column::Id.eq(stop.customer_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::invalid_field("customer_id", "unknown customer"))?;
    if let Some(pet_id) = stop.pet_id {
        let pet = crud::scoped::<Pet>(tenant_id)
            .filter(pet::Column::Id.eq(pet_id))
            .one(db)
            .await?
            .ok_or_else(|| ApiError::invalid_field("pet_id", "unknown pet"))?;
        if pet.customer_id != stop.customer_id {
            return Err(ApiError::invalid_field(
                "pet_id",
                "pet does not belong to this customer",
            ));
        }
    }

    Ok(transport_stop::ActiveModel {
        tenant_id: Set(tenant_id),
        route_id: Set(route_id),
        customer_id: Set(stop.customer_id),
        pet_id: Set(stop.pet_id),
        kind: Set(stop.kind),
        address: Set(stop.address.trim().to_string()),
        scheduled_at: Set(stop.scheduled_at),
        completed: Set(false),
        completed_at: Set(None),
        notes: Set(non_blank(stop.notes)),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn stops_of<C: ConnectionTrait>(
    db: &C,
    route_id: i32,
) -> ApiResult<Vec<transport_stop::Model>> {
    Ok(TransportStop::find()
        .filter(transport_stop::Column::RouteId.eq(route_id))
        .order_by_asc(transport_stop::Column::ScheduledAt)
        .order_by_asc(transport_stop::Column::Id)
        .all(db)
        .await?)
}

// GET /transport/routes
pub async fn list_routes(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<RouteFilter>,
) -> ApiResult<Json<Vec<transport_route::Model>>> {
    let mut select = crud::scoped::<TransportRoute>(ctx.tenant_id());
    if let Some(date) = filter.date {
        select = select.filter(transport_route::Column::RouteDate.eq(date));
    }
    if let Some(driver) = non_blank(filter.driver) {
        select = select.filter(transport_route::Column::Driver.eq(driver));
    }
    if let Some(vehicle) = non_blank(filter.vehicle) {
        select = select.filter(transport_route::Column::Vehicle.eq(vehicle));
    }
    if let Some(status) = non_blank(filter.status) {
        select = select.filter(transport_route::Column::Status.eq(status));
    }
    Ok(Json(crud::list(&db, select, &page).await?))
}

// POST /transport/routes - A route and its initial stops
pub async fn create_route(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<CreateRouteRequest>,
) -> ApiResult<impl IntoResponse> {
    Validator::new()
        .required("driver", &payload.driver)
        .required("vehicle", &payload.vehicle)
        .finish()?;
    let window = window_of(payload.starts_at, payload.ends_at)?;
    let driver = payload.driver.trim().to_string();
    let vehicle = payload.vehicle.trim().to_string();

    let txn = db.begin().await?;
    crud::lock_tenant(&txn, ctx.tenant_id()).await?;
    ensure_route_free(&txn, ctx.tenant_id(), &driver, &vehicle, &window, None).await?;

    let now = chrono::Utc::now().naive_utc();
    let route = transport_route::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        route_date: Set(window.start.date()),
        driver: Set(driver),
        vehicle: Set(vehicle),
        starts_at: Set(window.start),
        ends_at: Set(window.end),
        status: Set(STATUS_PLANNED.to_string()),
        notes: Set(non_blank(payload.notes)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for stop in payload.stops {
        insert_stop(&txn, ctx.tenant_id(), route.id, &window, stop).await?;
    }
    let stops = stops_of(&txn, route.id).await?;
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "transport_routes")
        .record("action", "create_route")
        .record("business_event", "Transport route planned");

    Ok((StatusCode::CREATED, Json(RouteDetail { route, stops })))
}

// GET /transport/routes/:id
pub async fn get_route(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(route_id): Path<i32>,
) -> ApiResult<Json<RouteDetail>> {
    let route = crud::get::<TransportRoute, _>(&db, ctx.tenant_id(), route_id, "Route").await?;
    let stops = stops_of(&db, route.id).await?;
    Ok(Json(RouteDetail { route, stops }))
}

// PATCH /transport/routes/:id
pub async fn update_route(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(route_id): Path<i32>,
    Json(payload): Json<UpdateRouteRequest>,
) -> ApiResult<Json<RouteDetail>> {
    let mut v = Validator::new();
    v.required_opt("driver", payload.driver.as_deref())
        .required_opt("vehicle", payload.vehicle.as_deref());
    if let Some(status) = payload.status.as_deref() {
        v.one_of("status", status, &ROUTE_STATUSES);
    }
    v.finish()?;

    let txn = db.begin().await?;
    let route = crud::get::<TransportRoute, _>(&txn, ctx.tenant_id(), route_id, "Route").await?;
    let driver = payload
        .driver
        .map(|d| d.trim().to_string())
        .unwrap_or_else(|| route.driver.clone());
    let vehicle = payload
        .vehicle
        .map(|d| d.trim().to_string())
        .unwrap_or_else(|| route.vehicle.clone());
    let window = window_of(
        payload.starts_at.unwrap_or(route.starts_at),
        payload.ends_at.unwrap_or(route.ends_at),
    )?;
    let status = payload.status.unwrap_or_else(|| route.status.clone());

    let stops = stops_of(&txn, route.id).await?;
    for stop in &stops {
        check_in_window(&window, stop.scheduled_at)?;
    }
    if status != STATUS_CANCELED {
        crud::lock_tenant(&txn, ctx.tenant_id()).await?;
        ensure_route_free(&txn, ctx.tenant_id(), &driver, &vehicle, &window, Some(route.id))
            .await?;
    }

    let mut active = route.into_active_model();
    active.driver = Set(driver);
    active.vehicle = Set(vehicle);
    active.route_date = Set(window.start.date());
    active.starts_at = Set(window.start);
    active.ends_at = Set(window.end);
    active.status = Set(status);
    if let Some(notes) = payload.notes {
        active.notes = Set(non_blank(Some(notes)));
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let route = active.update(&txn).await?;
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "transport_routes")
        .record("action", "update_route");

    Ok(Json(RouteDetail { route, stops }))
}

// DELETE /transport/routes/:id
pub async fn delete_route(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(route_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    crud::delete::<TransportRoute, _>(&db, ctx.tenant_id(), route_id, "Route").await?;
    Ok(Json(json!({"message": "Route deleted"})))
}

// POST /transport/routes/:id/stops
pub async fn add_stop(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(route_id): Path<i32>,
    Json(payload): Json<StopRequest>,
) -> ApiResult<impl IntoResponse> {
    let route = crud::get::<TransportRoute, _>(&db, ctx.tenant_id(), route_id, "Route").await?;
    if route.status == STATUS_COMPLETED || route.status == STATUS_CANCELED {
        return Err(ApiError::Conflict(format!("Route is {}", route.status)));
    }
    let stop = insert_stop(&db, ctx.tenant_id(), route.id, &route.window(), payload).await?;

    tracing::Span::current()
        .record("table", "transport_stops")
        .record("action", "add_stop");

    Ok((StatusCode::CREATED, Json(stop)))
}

// POST /transport/stops/:id/complete - Finishing the last stop completes the route
pub async fn complete_stop(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(stop_id): Path<i32>,
) -> ApiResult<Json<StopCompletion>> {
    let txn = db.begin().await?;
    let stop = crud::get::<TransportStop, _>(&txn, ctx.tenant_id(), stop_id, "Stop").await?;
    if stop.completed {
        return Err(ApiError::Conflict("Stop already completed".to_string()));
    }
    let route =
        crud::get::<TransportRoute, _>(&txn, ctx.tenant_id(), stop.route_id, "Route").await?;
    if route.status == STATUS_CANCELED {
        return Err(ApiError::Conflict("Route is canceled".to_string()));
    }

    let now = chrono::Utc::now().naive_utc();
    let mut active_stop = stop.into_active_model();
    active_stop.completed = Set(true);
    active_stop.completed_at = Set(Some(now));
    let stop = active_stop.update(&txn).await?;

    let route = settle_route(&txn, route, now).await?;
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "transport_stops")
        .record("action", "complete_stop")
        .record("business_event", "Transport stop completed");

    Ok(Json(StopCompletion { stop, route }))
}

// DELETE /transport/stops/:id
pub async fn delete_stop(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(stop_id): Path<i32>,
) -> ApiResult<Json<transport_route::Model>> {
    let txn = db.begin().await?;
    let stop = crud::get::<TransportStop, _>(&txn, ctx.tenant_id(), stop_id, "Stop").await?;
    let route =
        crud::get::<TransportRoute, _>(&txn, ctx.tenant_id(), stop.route_id, "Route").await?;
    crud::delete::<TransportStop, _>(&txn, ctx.tenant_id(), stop.id, "Stop").await?;

    // The remaining stops may all be done now
    let route = settle_route(&txn, route, chrono::Utc::now().naive_utc()).await?;
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "transport_stops")
        .record("action", "delete_stop");

    Ok(Json(route))
}
