use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{header, HeaderName, HeaderValue, Method, Request, Response},
    middleware::from_fn,
    routing::{get, post},
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::{self, middleware::TENANT_HEADER};
use crate::integrations::WebhookDispatcher;

async fn health_check() -> &'static str {
    "OK"
}

/// Every API route with its auth layers, shared state and request tracing.
/// The Prometheus layer and `/metrics` are added by the server binary.
pub fn router(
    db: DatabaseConnection,
    dispatcher: WebhookDispatcher,
    cors_origin: HeaderValue,
) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login))
        .route("/logout", post(api::auth::logout));

    let account_routes = Router::new()
        .route(
            "/users/me",
            get(api::user::get_user).patch(api::user::update_user),
        )
        .route(
            "/tenants",
            get(api::tenant::list_tenants).post(api::tenant::create_tenant),
        )
        .route_layer(from_fn(api::middleware::auth_middleware));

    let tenant_routes = Router::new()
        .route(
            "/tenant",
            get(api::tenant::get_tenant).patch(api::tenant::update_tenant),
        )
        .route(
            "/tenant/members",
            get(api::tenant::list_members).post(api::tenant::add_member),
        )
        // Customers & pets
        .route(
            "/customers",
            get(api::customer::list_customers).post(api::customer::create_customer),
        )
        .route(
            "/customers/:id",
            get(api::customer::get_customer)
                .patch(api::customer::update_customer)
                .delete(api::customer::delete_customer),
        )
        .route("/customers/:id/pets", get(api::customer::list_customer_pets))
        .route("/pets", get(api::pet::list_pets).post(api::pet::create_pet))
        .route(
            "/pets/:id",
            get(api::pet::get_pet)
                .patch(api::pet::update_pet)
                .delete(api::pet::delete_pet),
        )
        // Scheduling
        .route(
            "/appointments",
            get(api::appointment::list_appointments).post(api::appointment::create_appointment),
        )
        .route(
            "/appointments/:id",
            get(api::appointment::get_appointment)
                .patch(api::appointment::update_appointment)
                .delete(api::appointment::delete_appointment),
        )
        .route(
            "/appointments/:id/status",
            post(api::appointment::set_appointment_status),
        )
        .route("/calendar/day", get(api::calendar::day))
        .route("/calendar/week", get(api::calendar::week))
        .route("/calendar/free-slots", get(api::calendar::free_slots))
        // Clinical
        .route(
            "/medical-records",
            get(api::medical_record::list_records).post(api::medical_record::create_record),
        )
        .route(
            "/medical-records/:id",
            get(api::medical_record::get_record)
                .patch(api::medical_record::update_record)
                .delete(api::medical_record::delete_record),
        )
        .route(
            "/hospitalizations",
            get(api::hospitalization::list_stays).post(api::hospitalization::admit),
        )
        .route(
            "/hospitalizations/:id",
            get(api::hospitalization::get_stay).patch(api::hospitalization::update_stay),
        )
        .route(
            "/hospitalizations/:id/discharge",
            post(api::hospitalization::discharge),
        )
        // Inventory & sales
        .route(
            "/products",
            get(api::product::list_products).post(api::product::create_product),
        )
        .route("/products/low-stock", get(api::product::low_stock))
        .route(
            "/products/:id",
            get(api::product::get_product)
                .patch(api::product::update_product)
                .delete(api::product::delete_product),
        )
        .route("/sales", get(api::sale::list_sales).post(api::sale::create_sale))
        .route("/sales/:id", get(api::sale::get_sale))
        // Finance
        .route(
            "/transactions",
            get(api::finance::list_transactions).post(api::finance::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(api::finance::get_transaction)
                .patch(api::finance::update_transaction)
                .delete(api::finance::delete_transaction),
        )
        .route("/transactions/:id/pay", post(api::finance::pay_transaction))
        .route("/finance/summary", get(api::finance::summary))
        // Transport
        .route(
            "/transport/routes",
            get(api::transport::list_routes).post(api::transport::create_route),
        )
        .route(
            "/transport/routes/:id",
            get(api::transport::get_route)
                .patch(api::transport::update_route)
                .delete(api::transport::delete_route),
        )
        .route("/transport/routes/:id/stops", post(api::transport::add_stop))
        .route(
            "/transport/stops/:id",
            axum::routing::delete(api::transport::delete_stop),
        )
        .route(
            "/transport/stops/:id/complete",
            post(api::transport::complete_stop),
        )
        // Support & onboarding
        .route(
            "/support/tickets",
            get(api::support::list_tickets).post(api::support::create_ticket),
        )
        .route(
            "/support/tickets/:id",
            get(api::support::get_ticket).patch(api::support::update_ticket),
        )
        .route("/onboarding", get(api::onboarding::get_state))
        .route("/onboarding/answers", post(api::onboarding::submit))
        .route("/onboarding/back", post(api::onboarding::back))
        // Outermost runs first: auth, then tenant resolution
        .route_layer(from_fn(api::middleware::tenant_middleware))
        .route_layer(from_fn(api::middleware::auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(account_routes)
        .merge(tenant_routes)
        .layer(Extension(db))
        .layer(Extension(dispatcher))
        .layer(CookieManagerLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(|matched| matched.as_str());

                    // "METHOD /path", e.g. "POST /appointments"
                    let span_name = match matched_path {
                        Some(path) => format!("{} {}", request.method(), path),
                        None => format!("{} {}", request.method(), request.uri().path()),
                    };

                    let user_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .or_else(|| request.headers().get("x-real-ip"))
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        user_ip = user_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // Filled in by middleware and handlers
                        table = tracing::field::Empty,
                        action = tracing::field::Empty,
                        tenant_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &Request<Body>, _span: &tracing::Span| {})
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origin)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(TENANT_HEADER)])
                .allow_credentials(true),
        )
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
}
