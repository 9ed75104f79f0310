//! Tenant-scoped helpers shared by every entity handler.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde::Deserialize;

use crate::entities::{Tenant, TenantScoped};
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_PER_PAGE: u64 = 50;
pub const MAX_PER_PAGE: u64 = 200;

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Page {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Page {
    pub fn limit(&self) -> u64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Saturates at `i64::MAX`, the largest offset SQL accepts.
    pub fn offset(&self) -> u64 {
        (self.page.unwrap_or(1).max(1) - 1)
            .saturating_mul(self.limit())
            .min(i64::MAX as u64)
    }

    pub fn apply<E: EntityTrait>(&self, select: Select<E>) -> Select<E> {
        select.limit(self.limit()).offset(self.offset())
    }
}

pub fn scoped<E: TenantScoped>(tenant_id: i32) -> Select<E> {
    E::find().filter(E::tenant_column().eq(tenant_id))
}

/// Rows of `select`, oldest first, one page at a time.
pub async fn list<E, C>(db: &C, select: Select<E>, page: &Page) -> ApiResult<Vec<E::Model>>
where
    E: TenantScoped,
    C: ConnectionTrait,
{
    Ok(page
        .apply(select.order_by_asc(E::id_column()))
        .all(db)
        .await?)
}

/// A row by id, or `NotFound` when it is missing or belongs to another tenant.
pub async fn get<E, C>(db: &C, tenant_id: i32, id: i32, label: &'static str) -> ApiResult<E::Model>
where
    E: TenantScoped,
    C: ConnectionTrait,
{
    scoped::<E>(tenant_id)
        .filter(E::id_column().eq(id))
        .one(db)
        .await?
        .ok_or(ApiError::NotFound(label))
}

pub async fn delete<E, C>(db: &C, tenant_id: i32, id: i32, label: &'static str) -> ApiResult<()>
where
    E: TenantScoped,
    C: ConnectionTrait,
{
    let res = E::delete_many()
        .filter(E::tenant_column().eq(tenant_id))
        .filter(E::id_column().eq(id))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(ApiError::NotFound(label));
    }
    Ok(())
}

/// Locks the tenant row until the surrounding transaction ends, so that
/// check-then-insert rules (double booking, one active stay) run one at a time
/// per tenant.
pub async fn lock_tenant<C: ConnectionTrait>(txn: &C, tenant_id: i32) -> ApiResult<()> {
    Tenant::find_by_id(tenant_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(ApiError::NotFound("Tenant"))?;
    Ok(())
}

/// Treats blank optional strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::default();
        assert_eq!(page.limit(), DEFAULT_PER_PAGE);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_clamps() {
        let page = Page {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(page.limit(), MAX_PER_PAGE);
        assert_eq!(page.offset(), 0);

        let page = Page {
            page: Some(3),
            per_page: Some(20),
        };
        assert_eq!(page.offset(), 40);

        let page = Page {
            page: Some(u64::MAX),
            per_page: None,
        };
        assert_eq!(page.offset(), i64::MAX as u64);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" x ".into())).as_deref(), Some("x"));
        assert_eq!(non_blank(None), None);
    }
}
