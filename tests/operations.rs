mod common;

use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use common::spawn_app;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use vetdesk_server::entities::{appointment, Appointment};
use vetdesk_server::worker;

#[tokio::test]
async fn test_hospitalization_admit_discharge_billing() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;
    let (_, pet_id) = app.customer_with_pet(&owner).await;

    let (status, stay) = app
        .post(
            "/hospitalizations",
            &owner,
            json!({
                "pet_id": pet_id,
                "reason": "Pós-operatório",
                "daily_rate_cents": 12000,
                "admitted_at": "2026-01-01T08:00:00",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stay["status"], "admitted");

    let (status, _) = app
        .post(
            "/hospitalizations",
            &owner,
            json!({"pet_id": pet_id, "reason": "Outra", "daily_rate_cents": 12000}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // 25 hours: two started days
    let discharge_uri = format!("/hospitalizations/{}/discharge", stay["id"]);
    let (status, done) = app
        .post(
            &discharge_uri,
            &owner,
            json!({"discharged_at": "2026-01-02T09:00:00"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "discharged");
    assert_eq!(done["days_charged"], 2);
    assert_eq!(done["total_cents"], 24000);

    let (status, _) = app.post(&discharge_uri, &owner, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Discharged, so the pet can be admitted again
    let (status, again) = app
        .post(
            "/hospitalizations",
            &owner,
            json!({"pet_id": pet_id, "reason": "Retorno", "daily_rate_cents": 10000}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(again["days_charged"], 1);
    assert_eq!(again["total_cents"], 10000);
}

#[tokio::test]
async fn test_transport_routes_and_stops() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "petshop").await;
    let (customer_id, pet_id) = app.customer_with_pet(&owner).await;

    let (status, route) = app
        .post(
            "/transport/routes",
            &owner,
            json!({
                "driver": "João",
                "vehicle": "Van 1",
                "starts_at": "2030-02-01T08:00:00",
                "ends_at": "2030-02-01T12:00:00",
                "stops": [
                    {"customer_id": customer_id, "pet_id": pet_id, "kind": "dropoff",
                     "address": "Rua B, 20", "scheduled_at": "2030-02-01T11:00:00"},
                    {"customer_id": customer_id, "pet_id": pet_id, "kind": "pickup",
                     "address": "Rua A, 10", "scheduled_at": "2030-02-01T08:30:00"},
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(route["status"], "planned");
    assert_eq!(route["route_date"], "2030-02-01");
    let stops = route["stops"].as_array().unwrap();
    assert_eq!(stops[0]["kind"], "pickup");
    assert_eq!(stops[1]["kind"], "dropoff");

    // Same driver, other vehicle, overlapping
    let (status, _) = app
        .post(
            "/transport/routes",
            &owner,
            json!({"driver": "joão", "vehicle": "Van 2",
                   "starts_at": "2030-02-01T11:00:00", "ends_at": "2030-02-01T13:00:00"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Same vehicle, other driver, overlapping
    let (status, _) = app
        .post(
            "/transport/routes",
            &owner,
            json!({"driver": "Marcos", "vehicle": "Van 1",
                   "starts_at": "2030-02-01T09:00:00", "ends_at": "2030-02-01T10:00:00"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/transport/routes",
            &owner,
            json!({"driver": "Marcos", "vehicle": "Van 2",
                   "starts_at": "2030-02-01T09:00:00", "ends_at": "2030-02-01T10:00:00"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post(
            &format!("/transport/routes/{}/stops", route["id"]),
            &owner,
            json!({"customer_id": customer_id, "kind": "pickup",
                   "address": "Rua C, 5", "scheduled_at": "2030-02-01T13:00:00"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, first) = app
        .post(
            &format!("/transport/stops/{}/complete", stops[0]["id"]),
            &owner,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["stop"]["completed"], true);
    assert_eq!(first["route"]["status"], "in_progress");

    let (status, last) = app
        .post(
            &format!("/transport/stops/{}/complete", stops[1]["id"]),
            &owner,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last["route"]["status"], "completed");

    let (status, listed) = app
        .get("/transport/routes?date=2030-02-01&driver=Marcos", &owner)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleting_last_pending_stop_completes_route() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "petshop").await;
    let (customer_id, pet_id) = app.customer_with_pet(&owner).await;

    // A route may run until midnight but not past it
    let (status, _) = app
        .post(
            "/transport/routes",
            &owner,
            json!({"driver": "Ana", "vehicle": "Van 3",
                   "starts_at": "2030-03-01T22:00:00", "ends_at": "2030-03-02T01:00:00"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, route) = app
        .post(
            "/transport/routes",
            &owner,
            json!({
                "driver": "Ana",
                "vehicle": "Van 3",
                "starts_at": "2030-03-01T18:00:00",
                "ends_at": "2030-03-02T00:00:00",
                "stops": [
                    {"customer_id": customer_id, "pet_id": pet_id, "kind": "pickup",
                     "address": "Rua A, 10", "scheduled_at": "2030-03-01T18:30:00"},
                    {"customer_id": customer_id, "pet_id": pet_id, "kind": "dropoff",
                     "address": "Rua B, 20", "scheduled_at": "2030-03-01T21:00:00"},
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(route["route_date"], "2030-03-01");
    let stops = route["stops"].as_array().unwrap();

    let (_, first) = app
        .post(
            &format!("/transport/stops/{}/complete", stops[0]["id"]),
            &owner,
            json!({}),
        )
        .await;
    assert_eq!(first["route"]["status"], "in_progress");

    let (status, settled, _) = app
        .request(
            Method::DELETE,
            &format!("/transport/stops/{}", stops[1]["id"]),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["status"], "completed");

    let (_, detail) = app
        .get(&format!("/transport/routes/{}", route["id"]), &owner)
        .await;
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["stops"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_support_tickets() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;

    let (status, ticket) = app
        .post(
            "/support/tickets",
            &owner,
            json!({"subject": "Erro na agenda", "message": "A semana não carrega", "priority": "high"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["status"], "open");
    assert_eq!(ticket["category"], "general");

    let (status, _) = app
        .patch(
            &format!("/support/tickets/{}", ticket["id"]),
            &owner,
            json!({"status": "archived"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, resolved) = app
        .patch(
            &format!("/support/tickets/{}", ticket["id"]),
            &owner,
            json!({"status": "resolved"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved");

    let (_, open) = app.get("/support/tickets?status=open", &owner).await;
    assert!(open.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_onboarding_wizard_updates_tenant() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;

    let (status, state) = app.get("/onboarding", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["screen"], "welcome");
    assert_eq!(state["step"], 1);

    let (_, state) = app.post("/onboarding/answers", &owner, json!({})).await;
    assert_eq!(state["screen"], "business_type");

    let (_, state) = app
        .post(
            "/onboarding/answers",
            &owner,
            json!({"business_type": "petshop", "offers_transport": false}),
        )
        .await;
    assert_eq!(state["screen"], "contact");
    assert_eq!(state["total_steps"], 7);

    let (status, body) = app
        .post("/onboarding/answers", &owner, json!({"name": "Pet Shop Au Au"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "phone");

    // Going back keeps earlier answers
    let (_, state) = app.post("/onboarding/back", &owner, json!({})).await;
    assert_eq!(state["screen"], "business_type");
    let (_, state) = app
        .post(
            "/onboarding/answers",
            &owner,
            json!({"offers_transport": true}),
        )
        .await;
    assert_eq!(state["screen"], "contact");
    assert_eq!(state["total_steps"], 8);

    for answers in [
        json!({"name": "Pet Shop Au Au", "phone": "11 98888-7777", "address": "Av. Brasil, 100"}),
        json!({"opens_at": "09:00", "closes_at": "17:00", "slot_minutes": 20}),
        json!({"grooming_services": ["banho", "tosa"]}),
        json!({"sells_products": true}),
        json!({"transport_vehicles": ["Van 1"]}),
    ] {
        let (status, _) = app.post("/onboarding/answers", &owner, answers).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, state) = app.get("/onboarding", &owner).await;
    assert_eq!(state["screen"], "review");
    assert_eq!(state["step"], 8);

    let (status, state) = app.post("/onboarding/answers", &owner, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["completed"], true);
    assert_eq!(state["progress_percent"], 100);

    let (_, tenant) = app.get("/tenant", &owner).await;
    assert_eq!(tenant["name"], "Pet Shop Au Au");
    assert_eq!(tenant["business_type"], "petshop");
    assert_eq!(tenant["opens_at"], "09:00:00");
    assert_eq!(tenant["slot_minutes"], 20);
    assert_eq!(tenant["onboarded"], true);

    let (status, _) = app.post("/onboarding/answers", &owner, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_onboarding_only_takes_current_screen_answers() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;

    for answers in [
        json!({}),
        json!({"business_type": "clinic"}),
        json!({"name": "Clínica Vida", "phone": "11 2222-3333"}),
        json!({"opens_at": "08:00", "closes_at": "17:00"}),
    ] {
        let (status, _) = app.post("/onboarding/answers", &owner, answers).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, state) = app
        .post(
            "/onboarding/answers",
            &owner,
            json!({"veterinarians": ["Dr. Paula"], "business_type": "petshop"}),
        )
        .await;
    assert_eq!(state["screen"], "hospitalization");
    assert_eq!(state["answers"]["business_type"], "clinic");

    let (_, state) = app
        .post("/onboarding/answers", &owner, json!({"has_hospitalization": true}))
        .await;
    assert_eq!(state["screen"], "review");

    let (status, state) = app
        .post(
            "/onboarding/answers",
            &owner,
            json!({"business_type": "zoo", "slot_minutes": 0,
                   "opens_at": "18:00", "closes_at": "08:00"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["completed"], true);

    let (_, tenant) = app.get("/tenant", &owner).await;
    assert_eq!(tenant["business_type"], "clinic");
    assert_eq!(tenant["slot_minutes"], 30);
    assert_eq!(tenant["opens_at"], "08:00:00");
    assert_eq!(tenant["closes_at"], "17:00:00");
}

#[tokio::test]
async fn test_worker_marks_no_shows() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;
    let (customer_id, pet_id) = app.customer_with_pet(&owner).await;
    let tenant_id = owner.tenant_id.unwrap();

    let at = |h: u32, m: u32| {
        NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    };
    for (start, end, status) in [
        (at(8, 0), at(8, 30), "scheduled"),
        (at(9, 0), at(9, 30), "completed"),
        (at(11, 0), at(11, 30), "confirmed"),
    ] {
        appointment::ActiveModel {
            tenant_id: Set(tenant_id),
            customer_id: Set(customer_id as i32),
            pet_id: Set(pet_id as i32),
            veterinarian: Set("Dr. Paula".to_string()),
            service: Set("Consulta".to_string()),
            starts_at: Set(start),
            ends_at: Set(end),
            status: Set(status.to_string()),
            notes: Set(None),
            created_at: Set(start),
            updated_at: Set(start),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap();
    }

    // Two hours of grace at 12:00: only the 08:00 booking is overdue
    let marked = worker::mark_no_shows(&app.db, at(12, 0), chrono::Duration::minutes(120))
        .await
        .unwrap();
    assert_eq!(marked, 1);

    let statuses: Vec<String> = Appointment::find()
        .all(&app.db)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.status)
        .collect();
    assert_eq!(statuses, vec!["no_show", "completed", "confirmed"]);

    let counts = worker::low_stock_counts(&app.db).await.unwrap();
    assert_eq!(counts.get(&tenant_id), Some(&0));
}
