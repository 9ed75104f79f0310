use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, IntoActiveModel, QueryFilter, Set};
use serde::Deserialize;
use serde_json::json;

use crate::api::crud::{self, non_blank, Page};
use crate::api::middleware::TenantContext;
use crate::entities::{pet, Customer, Pet};
use crate::error::ApiResult;
use crate::validation::Validator;

#[derive(Deserialize)]
pub struct PetFilter {
    customer_id: Option<i32>,
    species: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePetRequest {
    customer_id: i32,
    name: String,
    species: String,
    breed: Option<String>,
    sex: Option<String>,
    birth_date: Option<NaiveDate>,
    weight_grams: Option<i32>,
    notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePetRequest {
    customer_id: Option<i32>,
    name: Option<String>,
    species: Option<String>,
    breed: Option<String>,
    sex: Option<String>,
    birth_date: Option<NaiveDate>,
    weight_grams: Option<i32>,
    notes: Option<String>,
}

pub async fn list_pets(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Query(page): Query<Page>,
    Query(filter): Query<PetFilter>,
) -> ApiResult<Json<Vec<pet::Model>>> {
    let mut select = crud::scoped::<Pet>(ctx.tenant_id());
    if let Some(customer_id) = filter.customer_id {
        select = select.filter(pet::Column::CustomerId.eq(customer_id));
    }
    if let Some(species) = non_blank(filter.species) {
        select = select.filter(pet::Column::Species.eq(species));
    }
    Ok(Json(crud::list(&db, select, &page).await?))
}

pub async fn create_pet(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<CreatePetRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut v = Validator::new();
    v.required("name", &payload.name)
        .required("species", &payload.species);
    if let Some(weight) = payload.weight_grams {
        v.positive("weight_grams", weight as i64);
    }
    v.finish()?;

    // Owner must live in the same tenant
    crud::get::<Customer, _>(&db, ctx.tenant_id(), payload.customer_id, "Customer").await?;

    let now = chrono::Utc::now().naive_utc();
    let new_pet = pet::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        customer_id: Set(payload.customer_id),
        name: Set(payload.name.trim().to_string()),
        species: Set(payload.species.trim().to_lowercase()),
        breed: Set(non_blank(payload.breed)),
        sex: Set(non_blank(payload.sex)),
        birth_date: Set(payload.birth_date),
        weight_grams: Set(payload.weight_grams),
        notes: Set(non_blank(payload.notes)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_pet.insert(&db).await?;
    tracing::Span::current()
        .record("table", "pets")
        .record("action", "create_pet")
        .record("business_event", "Pet registered");
    crate::metrics::increment_pets();

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_pet(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(pet_id): Path<i32>,
) -> ApiResult<Json<pet::Model>> {
    Ok(Json(crud::get::<Pet, _>(&db, ctx.tenant_id(), pet_id, "Pet").await?))
}

pub async fn update_pet(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(pet_id): Path<i32>,
    Json(payload): Json<UpdatePetRequest>,
) -> ApiResult<Json<pet::Model>> {
    let mut v = Validator::new();
    v.required_opt("name", payload.name.as_deref())
        .required_opt("species", payload.species.as_deref());
    if let Some(weight) = payload.weight_grams {
        v.positive("weight_grams", weight as i64);
    }
    v.finish()?;

    let pet = crud::get::<Pet, _>(&db, ctx.tenant_id(), pet_id, "Pet").await?;
    if let Some(customer_id) = payload.customer_id {
        crud::get::<Customer, _>(&db, ctx.tenant_id(), customer_id, "Customer").await?;
    }

    let mut active_pet = pet.into_active_model();
    if let Some(customer_id) = payload.customer_id { active_pet.customer_id = Set(customer_id); }
    if let Some(name) = payload.name { active_pet.name = Set(name.trim().to_string()); }
    if let Some(species) = payload.species { active_pet.species = Set(species.trim().to_lowercase()); }
    if let Some(breed) = payload.breed { active_pet.breed = Set(non_blank(Some(breed))); }
    if let Some(sex) = payload.sex { active_pet.sex = Set(non_blank(Some(sex))); }
    if let Some(birth_date) = payload.birth_date { active_pet.birth_date = Set(Some(birth_date)); }
    if let Some(weight) = payload.weight_grams { active_pet.weight_grams = Set(Some(weight)); }
    if let Some(notes) = payload.notes { active_pet.notes = Set(non_blank(Some(notes))); }
    active_pet.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(Json(active_pet.update(&db).await?))
}

pub async fn delete_pet(
    Extension(db): Extension<DatabaseConnection>,
    Extension(ctx): Extension<TenantContext>,
    Path(pet_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    crud::delete::<Pet, _>(&db, ctx.tenant_id(), pet_id, "Pet").await?;
    crate::metrics::decrement_pets(1);
    Ok(Json(json!({"message": "Pet deleted"})))
}
