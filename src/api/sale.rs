use std::collections::BTreeMap;

use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::api::crud::{self, Page};
use crate::api::middleware::TenantContext;
use crate::calendar::Interval;
use crate::entities::{
    customer, financial_transaction, product, sale, sale_item, Customer, Product, Sale, SaleItem,
};
use crate::error::{ApiError, ApiResult};
use crate::finance::TransactionKind;
use crate::validation::Validator;

pub const PAYMENT_METHODS: [&str; 4] = ["cash", "card", "pix", "other"];
pub const SALE_CATEGORY: &str = "sale";

#[derive(Deserialize)]
pub struct SaleFilter {
    pub customer_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct SaleLine {
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct CreateSaleRequest {
    pub customer_id: Option<i32>,
    pub payment_method: Option<String>,
    pub items: Vec<SaleLine>,
}

#[derive(Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: sale::Model,
    pub items: Vec<sale_item::Model>,
}

// GET /sales
pub async fn list_sales(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<SaleFilter>,
) -> ApiResult<Json<Vec<sale::Model>>> {
    let mut select = crud::scoped::<Sale>(ctx.tenant_id());
    if let Some(customer_id) = filter.customer_id {
        select = select.filter(sale::Column::CustomerId.eq(customer_id));
    }
    if let Some(from) = filter.from {
        select = select.filter(sale::Column::SoldAt.gte(Interval::whole_day(from).start));
    }
    if let Some(to) = filter.to {
        select = select.filter(sale::Column::SoldAt.lt(Interval::whole_day(to).end));
    }
    Ok(Json(crud::list(&db, select, &page).await?))
}

// POST /sales - Checkout: stock, sale, items and ledger entry in one transaction
pub async fn create_sale(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<CreateSaleRequest>,
) -> ApiResult<impl IntoResponse> {
    let payment_method = payload
        .payment_method
        .unwrap_or_else(|| PAYMENT_METHODS[0].to_string());
    let mut v = Validator::new();
    v.one_of("payment_method", &payment_method, &PAYMENT_METHODS)
        .check(!payload.items.is_empty(), "items", "must contain at least one item");
    for line in &payload.items {
        v.positive("quantity", line.quantity as i64);
    }
    v.finish()?;

    // Repeated lines for one product are sold as one
    let mut quantities: BTreeMap<i32, i32> = BTreeMap::new();
    for line in &payload.items {
        let entry = quantities.entry(line.product_id).or_default();
        *entry = entry
            .checked_add(line.quantity)
            .ok_or_else(|| ApiError::invalid_field("items", "quantity is too large"))?;
    }

    let txn = db.begin().await?;

    if let Some(customer_id) = payload.customer_id {
        crud::scoped::<Customer>(ctx.tenant_id())
            .filter(customer::Column::Id.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ApiError::invalid_field("customer_id", "unknown customer"))?;
    }

    let mut lines = Vec::with_capacity(quantities.len());
    let mut total_cents: i64 = 0;
    for (product_id, quantity) in quantities {
        let item = crud::scoped::<Product>(ctx.tenant_id())
            .filter(product::Column::Id.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ApiError::invalid_field("items", &format!("unknown product {}", product_id))
            })?;
        if !item.active {
            return Err(ApiError::invalid_field(
                "items",
                &format!("{} is not for sale", item.name),
            ));
        }
        if item.stock_quantity < quantity {
            return Err(ApiError::Conflict(format!(
                "Insufficient stock for {}: {} available, {} requested",
                item.name, item.stock_quantity, quantity
            )));
        }

        total_cents = item
            .price_cents
            .checked_mul(i64::from(quantity))
            .and_then(|line_total| total_cents.checked_add(line_total))
            .ok_or_else(|| ApiError::invalid_field("items", "sale total is too large"))?;
        lines.push((product_id, quantity, item.price_cents));

        // Decrement in the database so a concurrent sale can't oversell
        let decremented = Product::update_many()
            .col_expr(
                product::Column::StockQuantity,
                Expr::col(product::Column::StockQuantity).sub(quantity),
            )
            .col_expr(
                product::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().naive_utc()),
            )
            .filter(product::Column::TenantId.eq(ctx.tenant_id()))
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::StockQuantity.gte(quantity))
            .exec(&txn)
            .await?;
        if decremented.rows_affected == 0 {
            return Err(ApiError::Conflict(format!(
                "Insufficient stock for {}",
                item.name
            )));
        }
    }

    let now = chrono::Utc::now().naive_utc();
    let created = sale::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        customer_id: Set(payload.customer_id),
        total_cents: Set(total_cents),
        payment_method: Set(payment_method),
        sold_at: Set(now),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (product_id, quantity, unit_price_cents) in lines {
        let item = sale_item::ActiveModel {
            sale_id: Set(created.id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            unit_price_cents: Set(unit_price_cents),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(item);
    }

    financial_transaction::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        kind: Set(TransactionKind::Income.as_str().to_string()),
        category: Set(SALE_CATEGORY.to_string()),
        description: Set(Some(format!("Sale #{}", created.id))),
        amount_cents: Set(total_cents),
        due_date: Set(Some(now.date())),
        paid_at: Set(Some(now)),
        sale_id: Set(Some(created.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::Span::current()
        .record("table", "sales")
        .record("action", "create_sale")
        .record("business_event", "Sale completed");
    crate::metrics::record_sale(total_cents);

    Ok((
        StatusCode::CREATED,
        Json(SaleDetail {
            sale: created,
            items,
        }),
    ))
}

// GET /sales/:id
pub async fn get_sale(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(sale_id): Path<i32>,
) -> ApiResult<Json<SaleDetail>> {
    let sale = crud::get::<Sale, _>(&db, ctx.tenant_id(), sale_id, "Sale").await?;
    let items = SaleItem::find()
        .filter(sale_item::Column::SaleId.eq(sale.id))
        .order_by_asc(sale_item::Column::Id)
        .all(&db)
        .await?;
    Ok(Json(SaleDetail { sale, items }))
}
