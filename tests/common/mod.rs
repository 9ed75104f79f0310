#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    Router,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tower::ServiceExt;
use vetdesk_server::{
    backoff::RetryPolicy, integrations::WebhookDispatcher, migrator::Migrator, routes,
};

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
}

pub struct Session {
    pub cookie: String,
    pub tenant_id: Option<i32>,
}

pub async fn spawn_app() -> TestApp {
    // One connection: every new sqlite::memory: connection is a fresh database
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let router = routes::router(
        db.clone(),
        WebhookDispatcher::new(RetryPolicy::default()),
        HeaderValue::from_static("http://localhost:5173"),
    );
    TestApp { router, db }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        session: Option<&Session>,
        body: Option<Value>,
    ) -> (StatusCode, Value, Option<String>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, &session.cookie);
            if let Some(tenant_id) = session.tenant_id {
                builder = builder.header("x-tenant-id", tenant_id.to_string());
            }
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value, set_cookie)
    }

    pub async fn get(&self, uri: &str, session: &Session) -> (StatusCode, Value) {
        let (status, body, _) = self.request(Method::GET, uri, Some(session), None).await;
        (status, body)
    }

    pub async fn post(&self, uri: &str, session: &Session, body: Value) -> (StatusCode, Value) {
        let (status, body, _) = self
            .request(Method::POST, uri, Some(session), Some(body))
            .await;
        (status, body)
    }

    pub async fn patch(&self, uri: &str, session: &Session, body: Value) -> (StatusCode, Value) {
        let (status, body, _) = self
            .request(Method::PATCH, uri, Some(session), Some(body))
            .await;
        (status, body)
    }

    /// Registers and logs in a user; the session has no tenant yet.
    pub async fn login_as(&self, email: &str) -> Session {
        let (status, _, _) = self
            .request(
                Method::POST,
                "/register",
                None,
                Some(json!({"email": email, "password": "s3cret-pass", "name": "Ana Souza"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _, cookie) = self
            .request(
                Method::POST,
                "/login",
                None,
                Some(json!({"email": email, "password": "s3cret-pass"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        Session {
            cookie: cookie.expect("login sets the session cookie"),
            tenant_id: None,
        }
    }

    /// A logged-in owner of a fresh tenant.
    pub async fn owner_session(&self, email: &str, business_type: &str) -> Session {
        let mut session = self.login_as(email).await;
        let (status, tenant) = self
            .post(
                "/tenants",
                &session,
                json!({"name": "Clínica Bicho Feliz", "business_type": business_type}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        session.tenant_id = Some(tenant["id"].as_i64().unwrap() as i32);
        session
    }

    /// A customer with one pet; returns `(customer_id, pet_id)`.
    pub async fn customer_with_pet(&self, session: &Session) -> (i64, i64) {
        let (status, customer) = self
            .post(
                "/customers",
                session,
                json!({"name": "Maria Lima", "cpf": "529.982.247-25", "phone": "11 99999-0000"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let customer_id = customer["id"].as_i64().unwrap();

        let (status, pet) = self
            .post(
                "/pets",
                session,
                json!({"customer_id": customer_id, "name": "Rex", "species": "Dog"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (customer_id, pet["id"].as_i64().unwrap())
    }
}
