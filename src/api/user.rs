use crate::entities::user;
use crate::error::{ApiError, ApiResult};
use crate::validation::Validator;
use axum::extract::{Extension, Json};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};

#[derive(serde::Deserialize)]
pub struct UpdateUserRequest {
    name: Option<String>,
    email: Option<String>,
}

pub async fn get_user(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> ApiResult<Json<user::Model>> {
    let user = user::Entity::find_by_id(user_id)
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}

pub async fn update_user(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<user::Model>> {
    Validator::new()
        .required_opt("name", payload.name.as_deref())
        .email("email", payload.email.as_deref())
        .finish()?;

    let user = user::Entity::find_by_id(user_id)
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let mut active_user = user.into_active_model();
    if let Some(name) = payload.name {
        active_user.name = Set(name.trim().to_string());
    }
    if let Some(email) = payload.email {
        active_user.email = Set(email.trim().to_lowercase());
    }
    active_user.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(Json(active_user.update(&db).await?))
}
