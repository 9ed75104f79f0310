use axum::extract::{Extension, Json};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};

use crate::api::middleware::TenantContext;
use crate::entities::{onboarding_progress, OnboardingProgress};
use crate::error::{ApiError, ApiResult};
use crate::onboarding::{Answers, Screen, Wizard, WizardError, WizardState};

async fn load<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
) -> ApiResult<(Option<onboarding_progress::Model>, Wizard)> {
    let row = OnboardingProgress::find()
        .filter(onboarding_progress::Column::TenantId.eq(tenant_id))
        .one(db)
        .await?;

    let wizard = match &row {
        Some(progress) => Wizard {
            current: Screen::from_key(&progress.current_step).unwrap_or(Screen::Welcome),
            answers: serde_json::from_str(&progress.answers).map_err(|e| {
                ApiError::Internal(format!("Corrupt onboarding answers: {}", e))
            })?,
            completed: progress.completed,
        },
        None => Wizard::new(),
    };
    Ok((row, wizard))
}

async fn save<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    row: Option<onboarding_progress::Model>,
    wizard: &Wizard,
) -> ApiResult<()> {
    let answers = serde_json::to_string(&wizard.answers)
        .map_err(|e| ApiError::Internal(format!("Failed to encode answers: {}", e)))?;
    let now = chrono::Utc::now().naive_utc();

    match row {
        Some(progress) => {
            let mut active = progress.into_active_model();
            active.current_step = Set(wizard.current.key().to_string());
            active.answers = Set(answers);
            active.completed = Set(wizard.completed);
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            onboarding_progress::ActiveModel {
                tenant_id: Set(tenant_id),
                current_step: Set(wizard.current.key().to_string()),
                answers: Set(answers),
                completed: Set(wizard.completed),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

// GET /onboarding
pub async fn get_state(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Json<WizardState>> {
    let (_, wizard) = load(&db, ctx.tenant_id()).await?;
    Ok(Json(wizard.state()))
}

// POST /onboarding/answers - Answers for the current screen
pub async fn submit(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(input): Json<Answers>,
) -> ApiResult<Json<WizardState>> {
    let tenant_id = ctx.tenant_id();
    let txn = db.begin().await?;
    let (row, mut wizard) = load(&txn, tenant_id).await?;

    wizard.submit(input).map_err(|e| match e {
        WizardError::AlreadyCompleted => ApiError::Conflict(e.to_string()),
        WizardError::Invalid(fields) => ApiError::Validation(fields),
    })?;
    save(&txn, tenant_id, row, &wizard).await?;

    if wizard.completed {
        let profile = wizard
            .profile()
            .ok_or_else(|| ApiError::Internal("Incomplete onboarding profile".to_string()))?;
        let mut tenant = ctx.tenant.into_active_model();
        tenant.name = Set(profile.name);
        tenant.business_type = Set(profile.business_type);
        tenant.phone = Set(Some(profile.phone));
        tenant.address = Set(profile.address);
        tenant.opens_at = Set(profile.opens_at);
        tenant.closes_at = Set(profile.closes_at);
        tenant.slot_minutes = Set(profile.slot_minutes);
        tenant.onboarded = Set(true);
        tenant.updated_at = Set(chrono::Utc::now().naive_utc());
        tenant.update(&txn).await?;

        tracing::Span::current().record("business_event", "Onboarding completed");
    }
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "onboarding_progress")
        .record("action", "submit_onboarding");

    Ok(Json(wizard.state()))
}

// POST /onboarding/back
pub async fn back(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Json<WizardState>> {
    let (row, mut wizard) = load(&db, ctx.tenant_id()).await?;
    if wizard.completed {
        return Err(ApiError::Conflict(WizardError::AlreadyCompleted.to_string()));
    }
    // Already on the first screen: nothing to undo
    if wizard.back() {
        save(&db, ctx.tenant_id(), row, &wizard).await?;
    }
    Ok(Json(wizard.state()))
}
