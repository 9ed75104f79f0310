use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

use crate::entities::{Customer, Pet, Tenant};

pub async fn init_metrics(db: &DatabaseConnection) {
    let tenant_count = Tenant::find().count(db).await.unwrap_or(0);
    metrics::gauge!("vetdesk_tenants_total").set(tenant_count as f64);

    let customer_count = Customer::find().count(db).await.unwrap_or(0);
    metrics::gauge!("vetdesk_customers_total").set(customer_count as f64);

    let pet_count = Pet::find().count(db).await.unwrap_or(0);
    metrics::gauge!("vetdesk_pets_total").set(pet_count as f64);

    tracing::info!(
        "Initialized metrics: Tenants={}, Customers={}, Pets={}",
        tenant_count,
        customer_count,
        pet_count
    );
}

pub fn increment_tenants() {
    metrics::counter!("vetdesk_tenants_created_total").increment(1);
    metrics::gauge!("vetdesk_tenants_total").increment(1.0);
}

pub fn increment_customers() {
    metrics::gauge!("vetdesk_customers_total").increment(1.0);
}

pub fn increment_pets() {
    metrics::gauge!("vetdesk_pets_total").increment(1.0);
}

/// A deleted customer takes its pets with it.
pub fn decrement_customers(pets_removed: u64) {
    metrics::gauge!("vetdesk_customers_total").decrement(1.0);
    decrement_pets(pets_removed);
}

pub fn decrement_pets(count: u64) {
    metrics::gauge!("vetdesk_pets_total").decrement(count as f64);
}

pub fn record_appointment_status(status: &str) {
    metrics::counter!("vetdesk_appointments_total", "status" => status.to_string()).increment(1);
}

pub fn record_sale(total_cents: i64) {
    metrics::counter!("vetdesk_sales_total").increment(1);
    metrics::counter!("vetdesk_revenue_cents_total").increment(total_cents.max(0) as u64);
}

pub fn increment_webhook_deliveries(event: &str) {
    metrics::counter!("vetdesk_webhook_deliveries_total", "event" => event.to_string()).increment(1);
}

pub fn increment_webhook_failures(event: &str) {
    metrics::counter!("vetdesk_webhook_failures_total", "event" => event.to_string()).increment(1);
}

pub fn record_no_show_sweep(marked: u64) {
    metrics::counter!("vetdesk_no_shows_marked_total").increment(marked);
}

pub fn set_low_stock(tenant_id: i32, count: usize) {
    metrics::gauge!("vetdesk_low_stock_products", "tenant_id" => tenant_id.to_string())
        .set(count as f64);
}
