mod common;

use axum::http::StatusCode;
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn test_sale_checks_and_decrements_stock() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "petshop").await;

    let (status, food) = app
        .post(
            "/products",
            &owner,
            json!({"name": "Ração Premium 10kg", "price_cents": 15990, "stock_quantity": 2, "min_stock": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, toy) = app
        .post(
            "/products",
            &owner,
            json!({"name": "Bolinha", "price_cents": 1250, "stock_quantity": 10}),
        )
        .await;

    let (status, body) = app
        .post(
            "/sales",
            &owner,
            json!({"items": [{"product_id": food["id"], "quantity": 3}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Ração Premium 10kg"));

    // Nothing was written by the failed sale
    let (_, unchanged) = app.get(&format!("/products/{}", food["id"]), &owner).await;
    assert_eq!(unchanged["stock_quantity"], 2);

    let (status, sale) = app
        .post(
            "/sales",
            &owner,
            json!({
                "payment_method": "pix",
                "items": [
                    {"product_id": food["id"], "quantity": 2},
                    {"product_id": toy["id"], "quantity": 1},
                    {"product_id": toy["id"], "quantity": 2},
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["total_cents"], 2 * 15990 + 3 * 1250);
    assert_eq!(sale["items"].as_array().unwrap().len(), 2);

    let (_, food_now) = app.get(&format!("/products/{}", food["id"]), &owner).await;
    assert_eq!(food_now["stock_quantity"], 0);
    let (_, toy_now) = app.get(&format!("/products/{}", toy["id"]), &owner).await;
    assert_eq!(toy_now["stock_quantity"], 7);

    let (status, low) = app.get("/products/low-stock", &owner).await;
    assert_eq!(status, StatusCode::OK);
    let low = low.as_array().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["id"], food["id"]);

    let (status, ledger) = app.get("/transactions?kind=income", &owner).await;
    assert_eq!(status, StatusCode::OK);
    let ledger = ledger.as_array().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0]["category"], "sale");
    assert_eq!(ledger[0]["sale_id"], sale["id"]);
    assert!(!ledger[0]["paid_at"].is_null());

    let (status, detail) = app.get(&format!("/sales/{}", sale["id"]), &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["payment_method"], "pix");
    assert_eq!(detail["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_sale_validation() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "petshop").await;

    let (status, body) = app
        .post("/sales", &owner, json!({"payment_method": "barter", "items": []}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .post(
            "/sales",
            &owner,
            json!({"items": [{"product_id": 999, "quantity": 1}]}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post(
            "/products",
            &owner,
            json!({"name": "Coleira", "price_cents": -5}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_sale_rejects_overflowing_quantities() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "petshop").await;

    let (_, shampoo) = app
        .post(
            "/products",
            &owner,
            json!({"name": "Shampoo Neutro", "price_cents": 1, "stock_quantity": 5}),
        )
        .await;

    let (status, body) = app
        .post(
            "/sales",
            &owner,
            json!({"items": [
                {"product_id": shampoo["id"], "quantity": i32::MAX},
                {"product_id": shampoo["id"], "quantity": i32::MAX},
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "items");

    let (_, unchanged) = app.get(&format!("/products/{}", shampoo["id"]), &owner).await;
    assert_eq!(unchanged["stock_quantity"], 5);
    let (_, ledger) = app.get("/transactions", &owner).await;
    assert!(ledger.as_array().unwrap().is_empty());

    let (status, body) = app
        .post(
            "/products",
            &owner,
            json!({"name": "Coleira de ouro", "price_cents": i64::MAX}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "price_cents");
}

#[tokio::test]
async fn test_finance_summary_and_pay() {
    let app = spawn_app().await;
    let owner = app.owner_session("owner@vetdesk.test", "clinic").await;

    let (status, rent) = app
        .post(
            "/transactions",
            &owner,
            json!({"kind": "expense", "category": "Rent", "amount_cents": 300000, "due_date": "2026-03-05"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rent["category"], "rent");

    app.post(
        "/transactions",
        &owner,
        json!({
            "kind": "income", "category": "consultation", "amount_cents": 25000,
            "due_date": "2026-03-02", "paid_at": "2026-03-02T15:00:00",
        }),
    )
    .await;
    app.post(
        "/transactions",
        &owner,
        json!({"kind": "income", "category": "surgery", "amount_cents": 90000, "due_date": "2026-03-20"}),
    )
    .await;

    let (status, summary) = app
        .get("/finance/summary?from=2026-03-01&to=2026-03-31", &owner)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["income_cents"], 25000);
    assert_eq!(summary["expense_cents"], 0);
    assert_eq!(summary["pending_receivables_cents"], 90000);
    assert_eq!(summary["pending_payables_cents"], 300000);

    let pay_uri = format!("/transactions/{}/pay", rent["id"]);
    let (status, paid) = app
        .post(&pay_uri, &owner, json!({"paid_at": "2026-03-05T10:00:00"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["paid_at"], "2026-03-05T10:00:00");
    let (status, _) = app.post(&pay_uri, &owner, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, summary) = app
        .get("/finance/summary?from=2026-03-01&to=2026-03-31", &owner)
        .await;
    assert_eq!(summary["expense_cents"], 300000);
    assert_eq!(summary["balance_cents"], 25000 - 300000);
    assert_eq!(summary["pending_payables_cents"], 0);

    let (status, _) = app
        .get("/finance/summary?from=2026-03-31&to=2026-03-01", &owner)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Extreme but well-formed query values
    let (status, _) = app
        .get("/finance/summary?from=2026-03-01&to=9999-12-31", &owner)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, listed) = app
        .get("/transactions?page=18446744073709551615", &owner)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());
}
