use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{AllocationShare, CreateExpense, HouseholdRole};
use migration::MigratorTrait;

struct TestApp {
    router: Router,
    engine: Arc<engine::Engine>,
    household: String,
}

async fn test_app() -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["ana", "boris"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), "password".into()],
        ))
        .await
        .unwrap();
    }

    let engine = engine::Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let household = engine.new_household("Home", "ana").await.unwrap();
    engine
        .add_member(&household.id, "ana", "boris", HouseholdRole::Member)
        .await
        .unwrap();

    let engine = Arc::new(engine);
    let state = server::ServerState {
        engine: engine.clone(),
        db,
    };

    TestApp {
        router: server::router(state),
        engine,
        household: household.id,
    }
}

fn basic_auth(username: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:password"));
    format!("Basic {encoded}")
}

fn request(method: &str, uri: &str, username: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth(username));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seed_debt(app: &TestApp) {
    app.engine
        .create_expense(CreateExpense {
            household_id: app.household.clone(),
            actor: "ana".to_string(),
            title: "Rent".to_string(),
            category: None,
            date: Utc::now(),
            amount_minor: 10_000,
            paid: vec![AllocationShare {
                user_id: "ana".to_string(),
                amount_minor: 10_000,
            }],
            owed: vec![
                AllocationShare {
                    user_id: "ana".to_string(),
                    amount_minor: 5_000,
                },
                AllocationShare {
                    user_id: "boris".to_string(),
                    amount_minor: 5_000,
                },
            ],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn requests_without_credentials_are_unauthorized() {
    let app = test_app().await;
    let uri = format!("/households/{}/balances", app.household);

    let response = app
        .router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_credentials_are_unauthorized() {
    let app = test_app().await;
    let uri = format!("/households/{}/balances", app.household);

    let response = app
        .router
        .oneshot(request("GET", &uri, "ghost", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn balances_report_the_wire_shape() {
    let app = test_app().await;
    seed_debt(&app).await;
    let uri = format!("/households/{}/balances", app.household);

    let response = app
        .router
        .oneshot(request("GET", &uri, "boris", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body[0]["user"], "ana");
    assert_eq!(body[0]["sum"], 50.0);
    assert_eq!(body[0]["type"], "-");
}

#[tokio::test]
async fn expense_creation_round_trips_major_units() {
    let app = test_app().await;
    let uri = format!("/households/{}/expenses", app.household);

    let payload = json!({
        "title": "Groceries",
        "category": "food",
        "amount": 42.5,
        "date": Utc::now().to_rfc3339(),
        "paid": [{ "user": "ana", "sum": 42.5 }],
        "owed": [{ "user": "ana", "sum": 20.0 }, { "user": "boris", "sum": 22.5 }],
    });
    let response = app
        .router
        .clone()
        .oneshot(request("POST", &uri, "ana", Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["amount"], 42.5);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["createdBy"], "ana");

    let response = app
        .router
        .oneshot(request("GET", &uri, "boris", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"][0]["title"], "Groceries");
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn invalid_allocations_map_to_400() {
    let app = test_app().await;
    let uri = format!("/households/{}/expenses", app.household);

    let payload = json!({
        "title": "Broken",
        "category": null,
        "amount": 10.0,
        "date": Utc::now().to_rfc3339(),
        "paid": [{ "user": "ana", "sum": 10.0 }],
        "owed": [{ "user": "boris", "sum": 9.0 }],
    });
    let response = app
        .router
        .oneshot(request("POST", &uri, "ana", Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(
        body["error"],
        "owed allocation must sum to the expense amount"
    );
}

#[tokio::test]
async fn payment_lifecycle_over_http() {
    let app = test_app().await;
    seed_debt(&app).await;
    let base = format!("/households/{}/payments", app.household);

    // boris proposes a settlement of his 50.00 лв. debt.
    let payload = json!({ "amount": 50.0, "date": Utc::now().to_rfc3339(), "payee": "ana" });
    let response = app
        .router
        .clone()
        .oneshot(request("POST", &base, "boris", Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let payment_id = body["_id"].as_str().unwrap().to_string();
    assert_eq!(body["status"], "pending_approval");

    // The payer cannot approve their own payment.
    let accept = format!("{base}/{payment_id}/accept");
    let response = app
        .router
        .clone()
        .oneshot(request("PUT", &accept, "boris", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The payee approves it.
    let response = app
        .router
        .clone()
        .oneshot(request("PUT", &accept, "ana", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "approved");

    // Approving again conflicts.
    let response = app
        .router
        .clone()
        .oneshot(request("PUT", &accept, "ana", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The balance is now settled.
    let uri = format!("/households/{}/balances", app.household);
    let response = app
        .router
        .oneshot(request("GET", &uri, "boris", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body[0]["sum"], 0.0);
    assert_eq!(body[0]["type"], "0");
}

#[tokio::test]
async fn rejection_requires_a_reason() {
    let app = test_app().await;
    seed_debt(&app).await;
    let base = format!("/households/{}/payments", app.household);

    let payload = json!({ "amount": 30.0, "date": Utc::now().to_rfc3339(), "payee": "ana" });
    let response = app
        .router
        .clone()
        .oneshot(request("POST", &base, "boris", Some(payload)))
        .await
        .unwrap();
    let body = json_body(response).await;
    let payment_id = body["_id"].as_str().unwrap().to_string();

    let reject = format!("{base}/{payment_id}/reject");
    let response = app
        .router
        .clone()
        .oneshot(request("PUT", &reject, "ana", Some(json!({ "text": "  " }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .oneshot(request(
            "PUT",
            &reject,
            "ana",
            Some(json!({ "text": "wrong amount" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["rejectionReason"], "wrong amount");
}

#[tokio::test]
async fn payment_detail_carries_pair_balances_on_request() {
    let app = test_app().await;
    seed_debt(&app).await;
    let base = format!("/households/{}/payments", app.household);

    let payload = json!({ "amount": 20.0, "date": Utc::now().to_rfc3339(), "payee": "ana" });
    let response = app
        .router
        .clone()
        .oneshot(request("POST", &base, "boris", Some(payload)))
        .await
        .unwrap();
    let body = json_body(response).await;
    let payment_id = body["_id"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            &format!("{base}/{payment_id}?balance=true"),
            "boris",
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["payerBalanceSum"], 50.0);
    assert_eq!(body["payeeBalanceSum"], 0.0);

    // Without the flag the sums are omitted entirely.
    let response = app
        .router
        .oneshot(request(
            "GET",
            &format!("{base}/{payment_id}"),
            "boris",
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert!(body.get("payerBalanceSum").is_none());
}

#[tokio::test]
async fn unknown_payment_maps_to_404() {
    let app = test_app().await;
    let uri = format!(
        "/households/{}/payments/{}",
        app.household,
        uuid::Uuid::new_v4()
    );

    let response = app
        .router
        .oneshot(request("GET", &uri, "ana", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_append_to_the_thread() {
    let app = test_app().await;
    seed_debt(&app).await;
    let base = format!("/households/{}/payments", app.household);

    let payload = json!({ "amount": 20.0, "date": Utc::now().to_rfc3339(), "payee": "ana" });
    let response = app
        .router
        .clone()
        .oneshot(request("POST", &base, "boris", Some(payload)))
        .await
        .unwrap();
    let body = json_body(response).await;
    let payment_id = body["_id"].as_str().unwrap().to_string();

    let comments = format!("{base}/{payment_id}/comments");
    app.router
        .clone()
        .oneshot(request(
            "POST",
            &comments,
            "ana",
            Some(json!({ "text": "is this for May?" })),
        ))
        .await
        .unwrap();
    let response = app
        .router
        .oneshot(request(
            "POST",
            &comments,
            "boris",
            Some(json!({ "text": "yes" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["author"], "ana");
    assert_eq!(body[1]["text"], "yes");
}

#[tokio::test]
async fn notifications_and_reminders_flow() {
    let app = test_app().await;
    seed_debt(&app).await;

    // A proposal leaves a notification in ana's inbox.
    let base = format!("/households/{}/payments", app.household);
    let payload = json!({ "amount": 20.0, "date": Utc::now().to_rfc3339(), "payee": "ana" });
    app.router
        .clone()
        .oneshot(request("POST", &base, "boris", Some(payload)))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/users/notifications", "ana", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["resourceType"], "payment");
    let notification_id = body[0]["_id"].as_str().unwrap().to_string();

    // Deleting twice stays 200.
    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/users/notifications/{notification_id}"),
                "ana",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // ana nudges boris with a reminder.
    let payload = json!({
        "message": "rent is due",
        "household": app.household,
        "receiver": "boris",
    });
    let response = app
        .router
        .clone()
        .oneshot(request("POST", "/users/reminders", "ana", Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .oneshot(request("GET", "/users/reminders", "boris", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["message"], "rent is due");
}
