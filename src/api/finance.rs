use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, IntoActiveModel, QueryFilter,
    Set,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::crud::{self, non_blank, Page};
use crate::api::middleware::TenantContext;
use crate::calendar::Interval;
use crate::entities::{financial_transaction, FinancialTransaction};
use crate::error::{ApiError, ApiResult};
use crate::finance::{self, FinanceSummary, LedgerEntry, TransactionKind};
use crate::validation::{Validator, MAX_CENTS};

#[derive(Deserialize)]
pub struct TransactionFilter {
    pub kind: Option<String>,
    pub category: Option<String>,
    pub paid: Option<bool>,
    /// Due date range, inclusive.
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct CreateTransactionRequest {
    pub kind: String,
    pub category: String,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
pub struct UpdateTransactionRequest {
    pub kind: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Deserialize, Default)]
pub struct PayRequest {
    pub paid_at: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

// GET /transactions
pub async fn list_transactions(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<TransactionFilter>,
) -> ApiResult<Json<Vec<financial_transaction::Model>>> {
    let mut select = crud::scoped::<FinancialTransaction>(ctx.tenant_id());
    if let Some(kind) = non_blank(filter.kind) {
        let kind = TransactionKind::parse(&kind)
            .ok_or_else(|| ApiError::invalid_field("kind", "must be one of: income, expense"))?;
        select = select.filter(financial_transaction::Column::Kind.eq(kind.as_str()));
    }
    if let Some(category) = non_blank(filter.category) {
        select = select.filter(financial_transaction::Column::Category.eq(category));
    }
    match filter.paid {
        Some(true) => select = select.filter(financial_transaction::Column::PaidAt.is_not_null()),
        Some(false) => select = select.filter(financial_transaction::Column::PaidAt.is_null()),
        None => {}
    }
    if let Some(from) = filter.due_from {
        select = select.filter(financial_transaction::Column::DueDate.gte(from));
    }
    if let Some(to) = filter.due_to {
        select = select.filter(financial_transaction::Column::DueDate.lte(to));
    }
    Ok(Json(crud::list(&db, select, &page).await?))
}

// POST /transactions
pub async fn create_transaction(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<CreateTransactionRequest>,
) -> ApiResult<impl IntoResponse> {
    Validator::new()
        .one_of("kind", &payload.kind, &TransactionKind::ALL)
        .required("category", &payload.category)
        .positive("amount_cents", payload.amount_cents)
        .at_most("amount_cents", payload.amount_cents, MAX_CENTS)
        .finish()?;

    let now = chrono::Utc::now().naive_utc();
    let created = financial_transaction::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        kind: Set(payload.kind),
        category: Set(payload.category.trim().to_lowercase()),
        description: Set(non_blank(payload.description)),
        amount_cents: Set(payload.amount_cents),
        due_date: Set(payload.due_date),
        paid_at: Set(payload.paid_at),
        sale_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    tracing::Span::current()
        .record("table", "financial_transactions")
        .record("action", "create_transaction");

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /transactions/:id
pub async fn get_transaction(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(transaction_id): Path<i32>,
) -> ApiResult<Json<financial_transaction::Model>> {
    Ok(Json(
        crud::get::<FinancialTransaction, _>(&db, ctx.tenant_id(), transaction_id, "Transaction")
            .await?,
    ))
}

// PATCH /transactions/:id
pub async fn update_transaction(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(transaction_id): Path<i32>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> ApiResult<Json<financial_transaction::Model>> {
    let mut v = Validator::new();
    v.required_opt("category", payload.category.as_deref());
    if let Some(kind) = payload.kind.as_deref() {
        v.one_of("kind", kind, &TransactionKind::ALL);
    }
    if let Some(amount) = payload.amount_cents {
        v.positive("amount_cents", amount)
            .at_most("amount_cents", amount, MAX_CENTS);
    }
    v.finish()?;

    let existing =
        crud::get::<FinancialTransaction, _>(&db, ctx.tenant_id(), transaction_id, "Transaction")
            .await?;
    let mut active = existing.into_active_model();
    if let Some(kind) = payload.kind {
        active.kind = Set(kind);
    }
    if let Some(category) = payload.category {
        active.category = Set(category.trim().to_lowercase());
    }
    if let Some(description) = payload.description {
        active.description = Set(non_blank(Some(description)));
    }
    if let Some(amount) = payload.amount_cents {
        active.amount_cents = Set(amount);
    }
    if let Some(due_date) = payload.due_date {
        active.due_date = Set(Some(due_date));
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(Json(active.update(&db).await?))
}

// POST /transactions/:id/pay
pub async fn pay_transaction(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(transaction_id): Path<i32>,
    payload: Option<Json<PayRequest>>,
) -> ApiResult<Json<financial_transaction::Model>> {
    let Json(payload) = payload.unwrap_or_default();
    let existing =
        crud::get::<FinancialTransaction, _>(&db, ctx.tenant_id(), transaction_id, "Transaction")
            .await?;
    if existing.paid_at.is_some() {
        return Err(ApiError::Conflict("Transaction already paid".to_string()));
    }

    let now = chrono::Utc::now().naive_utc();
    let mut active = existing.into_active_model();
    active.paid_at = Set(Some(payload.paid_at.unwrap_or(now)));
    active.updated_at = Set(now);
    let updated = active.update(&db).await?;

    tracing::Span::current()
        .record("table", "financial_transactions")
        .record("action", "pay_transaction")
        .record("business_event", "Transaction paid");

    Ok(Json(updated))
}

// DELETE /transactions/:id
pub async fn delete_transaction(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(transaction_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    crud::delete::<FinancialTransaction, _>(&db, ctx.tenant_id(), transaction_id, "Transaction")
        .await?;
    Ok(Json(json!({"message": "Transaction deleted"})))
}

// GET /finance/summary?from=YYYY-MM-DD&to=YYYY-MM-DD
pub async fn summary(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<FinanceSummary>> {
    if query.to < query.from {
        return Err(ApiError::invalid_field("to", "must not be before from"));
    }

    let today = chrono::Utc::now().date_naive();
    let window = Interval {
        start: Interval::whole_day(query.from).start,
        end: Interval::whole_day(query.to).end,
    };

    // Paid inside the window, or still open (pending and overdue counts need those)
    let rows = crud::scoped::<FinancialTransaction>(ctx.tenant_id())
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(financial_transaction::Column::PaidAt.gte(window.start))
                        .add(financial_transaction::Column::PaidAt.lt(window.end)),
                )
                .add(financial_transaction::Column::PaidAt.is_null()),
        )
        .all(&db)
        .await?;

    let entries: Vec<LedgerEntry> = rows.iter().filter_map(LedgerEntry::from_model).collect();
    Ok(Json(finance::summarize(&entries, query.from, query.to, today)))
}
