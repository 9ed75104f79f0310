//! Periodic housekeeping run by the `worker` binary.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDateTime;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect,
};

use crate::entities::appointment::{self, AppointmentStatus};
use crate::entities::{product, tenant, Appointment, Product, Tenant};

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub interval: Duration,
    /// How long after its end a still-open appointment becomes a no-show.
    pub no_show_grace: chrono::Duration,
}

/// Marks scheduled/confirmed appointments that ended more than `grace` before `now` as no-shows.
pub async fn mark_no_shows(
    db: &DatabaseConnection,
    now: NaiveDateTime,
    grace: chrono::Duration,
) -> Result<u64, DbErr> {
    let cutoff = now - grace;
    let res = Appointment::update_many()
        .col_expr(
            appointment::Column::Status,
            Expr::value(AppointmentStatus::NoShow.as_str()),
        )
        .col_expr(appointment::Column::UpdatedAt, Expr::value(now))
        .filter(appointment::Column::Status.is_in([
            AppointmentStatus::Scheduled.as_str(),
            AppointmentStatus::Confirmed.as_str(),
        ]))
        .filter(appointment::Column::EndsAt.lt(cutoff))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Low-stock product count per tenant. Tenants with none are reported as zero.
pub async fn low_stock_counts(db: &DatabaseConnection) -> Result<BTreeMap<i32, usize>, DbErr> {
    let tenant_ids: Vec<i32> = Tenant::find()
        .select_only()
        .column(tenant::Column::Id)
        .into_tuple()
        .all(db)
        .await?;
    let mut counts: BTreeMap<i32, usize> = tenant_ids.into_iter().map(|id| (id, 0)).collect();

    let products = Product::find()
        .filter(product::Column::Active.eq(true))
        .all(db)
        .await?;
    for item in products.iter().filter(|p| p.is_low_stock()) {
        *counts.entry(item.tenant_id).or_default() += 1;
    }
    Ok(counts)
}

async fn tick(db: &DatabaseConnection, config: &WorkerConfig) {
    let now = chrono::Utc::now().naive_utc();
    match mark_no_shows(db, now, config.no_show_grace).await {
        Ok(0) => tracing::debug!("No-show sweep: nothing to mark"),
        Ok(marked) => {
            tracing::info!("No-show sweep: marked {} appointments", marked);
            crate::metrics::record_no_show_sweep(marked);
        }
        Err(e) => tracing::error!("No-show sweep failed: {}", e),
    }

    match low_stock_counts(db).await {
        Ok(counts) => {
            for (tenant_id, count) in counts {
                crate::metrics::set_low_stock(tenant_id, count);
            }
        }
        Err(e) => tracing::error!("Low-stock refresh failed: {}", e),
    }
}

/// Runs the sweeps every `config.interval` until the process exits.
pub async fn run(db: DatabaseConnection, config: WorkerConfig) {
    tracing::info!(
        "Worker started: interval={:?}, no-show grace={} min",
        config.interval,
        config.no_show_grace.num_minutes()
    );
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        tick(&db, &config).await;
    }
}
