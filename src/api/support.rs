use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, IntoActiveModel, QueryFilter, Set};
use serde::Deserialize;

use crate::api::crud::{self, non_blank, Page};
use crate::api::middleware::TenantContext;
use crate::entities::support_ticket::{self, PRIORITIES, STATUSES};
use crate::entities::SupportTicket;
use crate::error::ApiResult;
use crate::validation::Validator;

#[derive(Deserialize)]
pub struct TicketFilter {
    status: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    subject: String,
    message: String,
    category: Option<String>,
    priority: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTicketRequest {
    status: Option<String>,
    priority: Option<String>,
}

pub async fn list_tickets(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<TicketFilter>,
) -> ApiResult<Json<Vec<support_ticket::Model>>> {
    let mut select = crud::scoped::<SupportTicket>(ctx.tenant_id());
    if let Some(status) = non_blank(filter.status) {
        select = select.filter(support_ticket::Column::Status.eq(status));
    }
    Ok(Json(crud::list(&db, select, &page).await?))
}

pub async fn create_ticket(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<CreateTicketRequest>,
) -> ApiResult<impl IntoResponse> {
    let priority = payload.priority.unwrap_or_else(|| "normal".to_string());
    Validator::new()
        .required("subject", &payload.subject)
        .required("message", &payload.message)
        .one_of("priority", &priority, &PRIORITIES)
        .finish()?;

    let now = chrono::Utc::now().naive_utc();
    let ticket = support_ticket::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        created_by: Set(ctx.user_id),
        subject: Set(payload.subject.trim().to_string()),
        message: Set(payload.message.trim().to_string()),
        category: Set(non_blank(payload.category).unwrap_or_else(|| "general".to_string())),
        priority: Set(priority),
        status: Set(STATUSES[0].to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    tracing::Span::current()
        .record("table", "support_tickets")
        .record("action", "create_ticket")
        .record("business_event", "Support ticket opened");

    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn get_ticket(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(ticket_id): Path<i32>,
) -> ApiResult<Json<support_ticket::Model>> {
    Ok(Json(
        crud::get::<SupportTicket, _>(&db, ctx.tenant_id(), ticket_id, "Ticket").await?,
    ))
}

pub async fn update_ticket(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(ticket_id): Path<i32>,
    Json(payload): Json<UpdateTicketRequest>,
) -> ApiResult<Json<support_ticket::Model>> {
    let mut v = Validator::new();
    if let Some(status) = payload.status.as_deref() {
        v.one_of("status", status, &STATUSES);
    }
    if let Some(priority) = payload.priority.as_deref() {
        v.one_of("priority", priority, &PRIORITIES);
    }
    v.finish()?;

    let ticket = crud::get::<SupportTicket, _>(&db, ctx.tenant_id(), ticket_id, "Ticket").await?;
    let mut active = ticket.into_active_model();
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(priority) = payload.priority {
        active.priority = Set(priority);
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(Json(active.update(&db).await?))
}
