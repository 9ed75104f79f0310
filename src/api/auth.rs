use crate::api::middleware::SESSION_COOKIE;
use crate::entities::user;
use crate::error::{ApiError, ApiResult};
use crate::validation::Validator;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde_json::json;
use tower_cookies::{Cookie, Cookies};

#[derive(serde::Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    name: String,
}

pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    Validator::new()
        .required("name", &payload.name)
        .email("email", Some(payload.email.as_str()))
        .check(payload.password.len() >= 8, "password", "must be at least 8 characters")
        .finish()?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|_| ApiError::Internal("Failed to hash password".to_string()))?
        .to_string();

    let now = chrono::Utc::now().naive_utc();
    let new_user = user::ActiveModel {
        email: Set(payload.email.trim().to_lowercase()),
        password_hash: Set(password_hash),
        name: Set(payload.name.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_user.insert(&db).await {
        Ok(user) => {
            tracing::Span::current()
                .record("table", "users")
                .record("action", "register_user")
                .record("user_id", user.id)
                .record("business_event", "User registered successfully");

            Ok((
                StatusCode::CREATED,
                Json(json!({"id": user.id, "email": user.email, "name": user.name})),
            ))
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            tracing::Span::current()
                .record("table", "users")
                .record("action", "register_user_failed");
            Err(ApiError::Conflict("Email already exists".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.trim().to_lowercase()))
        .one(&db)
        .await?;

    let Some(user) = user else {
        tracing::Span::current()
            .record("table", "users")
            .record("action", "login_user_failed");
        return Err(ApiError::Unauthorized);
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| ApiError::Internal("Invalid password hash in DB".to_string()))?;

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        tracing::Span::current()
            .record("table", "users")
            .record("action", "login_user_failed")
            .record("user_id", user.id);
        return Err(ApiError::Unauthorized);
    }

    let mut cookie = Cookie::new(SESSION_COOKIE, user.id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookies.add(cookie);

    tracing::Span::current()
        .record("table", "users")
        .record("action", "login_user")
        .record("user_id", user.id)
        .record("business_event", "User logged in successfully");

    Ok(Json(json!({"message": "Login successful", "user_id": user.id})))
}

pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    cookies.remove(cookie);
    Json(json!({"message": "Logged out"}))
}
