use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tower_cookies::Cookies;

use crate::entities::{tenant, tenant_member, Tenant, TenantMember};
use crate::error::{ApiError, ApiResult};

pub const SESSION_COOKIE: &str = "vetdesk_user";
pub const TENANT_HEADER: &str = "x-tenant-id";

/// The active tenant of a request and the member acting on it.
#[derive(Clone, Debug)]
pub struct TenantContext {
    pub tenant: tenant::Model,
    pub user_id: i32,
    pub role: String,
}

impl TenantContext {
    pub fn tenant_id(&self) -> i32 {
        self.tenant.id
    }

    pub fn require_owner(&self) -> ApiResult<()> {
        if self.role == tenant_member::ROLE_OWNER {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Only tenant owners can do this".to_string()))
        }
    }
}

pub async fn auth_middleware(cookies: Cookies, mut request: Request, next: Next) -> Response {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if let Ok(user_id) = cookie.value().parse::<i32>() {
            tracing::Span::current().record("user_id", user_id);
            request.extensions_mut().insert(user_id);
            return next.run(request).await;
        }
    }
    ApiError::Unauthorized.into_response()
}

/// Resolves `X-Tenant-Id` and checks the caller belongs to that tenant.
pub async fn tenant_middleware(
    Extension(db): Extension<DatabaseConnection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = *request
        .extensions()
        .get::<i32>()
        .ok_or(ApiError::Unauthorized)?;

    let tenant_id = request
        .headers()
        .get(TENANT_HEADER)
        .ok_or_else(|| ApiError::BadRequest("Missing X-Tenant-Id header".to_string()))?
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i32>().ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid X-Tenant-Id header".to_string()))?;

    let membership = TenantMember::find()
        .filter(tenant_member::Column::TenantId.eq(tenant_id))
        .filter(tenant_member::Column::UserId.eq(user_id))
        .one(&db)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not a member of this tenant".to_string()))?;

    let tenant = Tenant::find_by_id(tenant_id)
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("Tenant"))?;

    tracing::Span::current().record("tenant_id", tenant_id);
    request.extensions_mut().insert(TenantContext {
        tenant,
        user_id,
        role: membership.role,
    });

    Ok(next.run(request).await)
}
