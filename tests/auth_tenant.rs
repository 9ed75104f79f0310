mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, Session};
use serde_json::json;

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = spawn_app().await;
    let session = app.login_as("ana@vetdesk.test").await;

    let (status, body, _) = app
        .request(
            Method::POST,
            "/register",
            None,
            Some(json!({"email": "ANA@vetdesk.test", "password": "another-pass", "name": "Ana"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already exists");

    let (status, _, cookie) = app
        .request(
            Method::POST,
            "/login",
            None,
            Some(json!({"email": "ana@vetdesk.test", "password": "wrong-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());

    let (status, me) = app.get("/users/me", &session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ana@vetdesk.test");
    assert!(me.get("password_hash").is_none());

    let (status, _, _) = app.request(Method::GET, "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation() {
    let app = spawn_app().await;
    let (status, body, _) = app
        .request(
            Method::POST,
            "/register",
            None,
            Some(json!({"email": "not-an-email", "password": "short", "name": " "})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "email", "password"]);
}

#[tokio::test]
async fn test_tenant_header_and_membership() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;

    let (status, tenants) = app.get("/tenants", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tenants.as_array().unwrap().len(), 1);

    let no_tenant = Session {
        cookie: owner.cookie.clone(),
        tenant_id: None,
    };
    let (status, _) = app.get("/tenant", &no_tenant).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let outsider = app.login_as("outsider@vetdesk.test").await;
    let outsider = Session {
        cookie: outsider.cookie,
        tenant_id: owner.tenant_id,
    };
    let (status, _) = app.get("/tenant", &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, tenant) = app.get("/tenant", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tenant["business_type"], "clinic");
    assert_eq!(tenant["slot_minutes"], 30);
    assert_eq!(tenant["onboarded"], false);
}

#[tokio::test]
async fn test_only_owners_update_tenant() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;
    let staff = app.login_as("staff@vetdesk.test").await;

    let (status, member) = app
        .post(
            "/tenant/members",
            &owner,
            json!({"email": "staff@vetdesk.test"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(member["role"], "staff");

    let staff = Session {
        cookie: staff.cookie,
        tenant_id: owner.tenant_id,
    };
    let (status, _) = app.patch("/tenant", &staff, json!({"name": "Taken over"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .patch(
            "/tenant",
            &owner,
            json!({"opens_at": "18:00:00", "closes_at": "08:00:00"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, tenant) = app
        .patch("/tenant", &owner, json!({"slot_minutes": 15, "phone": "11 3333-4444"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tenant["slot_minutes"], 15);

    let (status, members) = app.get("/tenant/members", &staff).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_customers_are_isolated_per_tenant() {
    let app = spawn_app().await;
    let first = app.owner_session("first@vetdesk.test", "clinic").await;
    let second = app.owner_session("second@vetdesk.test", "petshop").await;
    let (customer_id, pet_id) = app.customer_with_pet(&first).await;

    let (status, _) = app.get(&format!("/customers/{}", customer_id), &second).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/pets/{}", pet_id), &second).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Same CPF is fine in another tenant
    let (status, _) = app
        .post(
            "/customers",
            &second,
            json!({"name": "Maria Lima", "cpf": "52998224725"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, pets) = app.get("/pets", &second).await;
    assert_eq!(status, StatusCode::OK);
    assert!(pets.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_deleting_customer_removes_pets() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;
    let (customer_id, pet_id) = app.customer_with_pet(&owner).await;

    let (status, _, _) = app
        .request(
            Method::DELETE,
            &format!("/customers/{}", customer_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/pets/{}", pet_id), &owner).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app
        .request(
            Method::DELETE,
            &format!("/customers/{}", customer_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_customer_cpf_rules() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;

    let (status, body) = app
        .post(
            "/customers",
            &owner,
            json!({"name": "João", "cpf": "111.111.111-11"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "cpf");

    let (status, customer) = app
        .post(
            "/customers",
            &owner,
            json!({"name": "João", "cpf": "529.982.247-25", "email": "joao@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(customer["cpf"], "52998224725");

    let (status, _) = app
        .post(
            "/customers",
            &owner,
            json!({"name": "Outro João", "cpf": "52998224725"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, found) = app.get("/customers?cpf=529.982.247-25", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let id = customer["id"].as_i64().unwrap();
    let (status, updated) = app
        .patch(&format!("/customers/{}", id), &owner, json!({"cpf": ""}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["cpf"].is_null());
}
