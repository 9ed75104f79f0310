use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, IntoActiveModel, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::crud::{self, non_blank, Page};
use crate::api::middleware::TenantContext;
use crate::cpf;
use crate::entities::{customer, pet, Customer, Pet};
use crate::error::ApiResult;
use crate::validation::Validator;

#[derive(Deserialize)]
pub struct CustomerFilter {
    /// Substring of the customer name.
    pub q: Option<String>,
    pub cpf: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub cpf: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

// GET /customers
pub async fn list_customers(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<CustomerFilter>,
) -> ApiResult<Json<Vec<customer::Model>>> {
    let mut select = crud::scoped::<Customer>(ctx.tenant_id());
    if let Some(q) = non_blank(filter.q) {
        select = select.filter(customer::Column::Name.contains(q.as_str()));
    }
    if let Some(raw) = non_blank(filter.cpf) {
        // An unparseable CPF can't match a stored (normalized) one
        let normalized = cpf::normalize(&raw).unwrap_or(raw);
        select = select.filter(customer::Column::Cpf.eq(normalized));
    }
    Ok(Json(crud::list(&db, select, &page).await?))
}

// POST /customers
pub async fn create_customer(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<CreateCustomerRequest>,
) -> ApiResult<impl IntoResponse> {
    let cpf_input = non_blank(payload.cpf);
    let email = non_blank(payload.email);
    Validator::new()
        .required("name", &payload.name)
        .cpf("cpf", cpf_input.as_deref())
        .email("email", email.as_deref())
        .finish()?;

    let now = chrono::Utc::now().naive_utc();
    let created = customer::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        name: Set(payload.name.trim().to_string()),
        cpf: Set(cpf_input.as_deref().and_then(cpf::normalize)),
        email: Set(email),
        phone: Set(non_blank(payload.phone)),
        address: Set(non_blank(payload.address)),
        notes: Set(non_blank(payload.notes)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    tracing::Span::current()
        .record("table", "customers")
        .record("action", "create_customer")
        .record("business_event", "Customer registered");
    crate::metrics::increment_customers();

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /customers/:id
pub async fn get_customer(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(customer_id): Path<i32>,
) -> ApiResult<Json<customer::Model>> {
    Ok(Json(
        crud::get::<Customer, _>(&db, ctx.tenant_id(), customer_id, "Customer").await?,
    ))
}

// PATCH /customers/:id
pub async fn update_customer(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(customer_id): Path<i32>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> ApiResult<Json<customer::Model>> {
    let cpf_input = payload.cpf.map(|c| c.trim().to_string());
    Validator::new()
        .required_opt("name", payload.name.as_deref())
        .cpf("cpf", cpf_input.as_deref().filter(|c| !c.is_empty()))
        .email("email", payload.email.as_deref().filter(|e| !e.trim().is_empty()))
        .finish()?;

    let existing = crud::get::<Customer, _>(&db, ctx.tenant_id(), customer_id, "Customer").await?;
    let mut active = existing.into_active_model();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    // An empty string clears the CPF
    if let Some(c) = cpf_input {
        active.cpf = Set(cpf::normalize(&c));
    }
    if let Some(email) = payload.email {
        active.email = Set(non_blank(Some(email)));
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(non_blank(Some(phone)));
    }
    if let Some(address) = payload.address {
        active.address = Set(non_blank(Some(address)));
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(non_blank(Some(notes)));
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(Json(active.update(&db).await?))
}

// DELETE /customers/:id
pub async fn delete_customer(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(customer_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    let pets = crud::scoped::<Pet>(ctx.tenant_id())
        .filter(pet::Column::CustomerId.eq(customer_id))
        .count(&txn)
        .await?;
    crud::delete::<Customer, _>(&txn, ctx.tenant_id(), customer_id, "Customer").await?;
    txn.commit().await?;

    crate::metrics::decrement_customers(pets);
    tracing::Span::current()
        .record("table", "customers")
        .record("action", "delete_customer");
    Ok(Json(json!({"message": "Customer deleted"})))
}

// GET /customers/:id/pets
pub async fn list_customer_pets(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(customer_id): Path<i32>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<pet::Model>>> {
    crud::get::<Customer, _>(&db, ctx.tenant_id(), customer_id, "Customer").await?;
    let select = crud::scoped::<Pet>(ctx.tenant_id()).filter(pet::Column::CustomerId.eq(customer_id));
    Ok(Json(crud::list(&db, select, &page).await?))
}
