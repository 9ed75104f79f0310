use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, IntoActiveModel, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::crud::{self, non_blank, Page};
use crate::api::middleware::TenantContext;
use crate::entities::{product, Product};
use crate::error::ApiResult;
use crate::validation::Validator;

#[derive(Deserialize)]
pub struct ProductFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub min_stock: i32,
}

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub stock_quantity: Option<i32>,
    pub min_stock: Option<i32>,
    pub active: Option<bool>,
}

// GET /products
pub async fn list_products(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Json<Vec<product::Model>>> {
    let mut select = crud::scoped::<Product>(ctx.tenant_id());
    if let Some(q) = non_blank(filter.q) {
        select = select.filter(product::Column::Name.contains(q.as_str()));
    }
    if let Some(category) = non_blank(filter.category) {
        select = select.filter(product::Column::Category.eq(category));
    }
    if let Some(active) = filter.active {
        select = select.filter(product::Column::Active.eq(active));
    }
    Ok(Json(crud::list(&db, select, &page).await?))
}

// GET /products/low-stock
pub async fn low_stock(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Json<Vec<product::Model>>> {
    let products = crud::scoped::<Product>(ctx.tenant_id())
        .filter(product::Column::Active.eq(true))
        .order_by_asc(product::Column::StockQuantity)
        .order_by_asc(product::Column::Id)
        .all(&db)
        .await?
        .into_iter()
        .filter(product::Model::is_low_stock)
        .collect();
    Ok(Json(products))
}

// POST /products
pub async fn create_product(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<CreateProductRequest>,
) -> ApiResult<impl IntoResponse> {
    Validator::new()
        .required("name", &payload.name)
        .money("price_cents", payload.price_cents)
        .money("cost_cents", payload.cost_cents)
        .non_negative("stock_quantity", payload.stock_quantity as i64)
        .non_negative("min_stock", payload.min_stock as i64)
        .finish()?;

    let now = chrono::Utc::now().naive_utc();
    let created = product::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        name: Set(payload.name.trim().to_string()),
        sku: Set(non_blank(payload.sku)),
        category: Set(non_blank(payload.category)),
        price_cents: Set(payload.price_cents),
        cost_cents: Set(payload.cost_cents),
        stock_quantity: Set(payload.stock_quantity),
        min_stock: Set(payload.min_stock),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    tracing::Span::current()
        .record("table", "products")
        .record("action", "create_product");

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /products/:id
pub async fn get_product(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(product_id): Path<i32>,
) -> ApiResult<Json<product::Model>> {
    Ok(Json(
        crud::get::<Product, _>(&db, ctx.tenant_id(), product_id, "Product").await?,
    ))
}

// PATCH /products/:id
pub async fn update_product(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(product_id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<Json<product::Model>> {
    let mut v = Validator::new();
    v.required_opt("name", payload.name.as_deref());
    if let Some(price) = payload.price_cents {
        v.money("price_cents", price);
    }
    if let Some(cost) = payload.cost_cents {
        v.money("cost_cents", cost);
    }
    for (field, value) in [
        ("stock_quantity", payload.stock_quantity.map(i64::from)),
        ("min_stock", payload.min_stock.map(i64::from)),
    ] {
        if let Some(value) = value {
            v.non_negative(field, value);
        }
    }
    v.finish()?;

    let existing = crud::get::<Product, _>(&db, ctx.tenant_id(), product_id, "Product").await?;
    let mut active = existing.into_active_model();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(sku) = payload.sku {
        active.sku = Set(non_blank(Some(sku)));
    }
    if let Some(category) = payload.category {
        active.category = Set(non_blank(Some(category)));
    }
    if let Some(price) = payload.price_cents {
        active.price_cents = Set(price);
    }
    if let Some(cost) = payload.cost_cents {
        active.cost_cents = Set(cost);
    }
    if let Some(stock) = payload.stock_quantity {
        active.stock_quantity = Set(stock);
    }
    if let Some(min_stock) = payload.min_stock {
        active.min_stock = Set(min_stock);
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(Json(active.update(&db).await?))
}

// DELETE /products/:id
pub async fn delete_product(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(product_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    crud::delete::<Product, _>(&db, ctx.tenant_id(), product_id, "Product").await?;
    Ok(Json(json!({"message": "Product deleted"})))
}
