//! End-to-end API tests
//!
//! Drives the full nomination-to-award workflow through the HTTP surface:
//! role gates, the response envelope, and the status transitions the
//! workflow promises.

use axum::body::Body;
use axum::Router;
use chrono::{Duration, Utc};
use hyper::{Method, Request, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use kudos::models::{CreateUserRequest, UserRole};
use kudos::store::Store;
use kudos::{routes, AppState};

struct TestApp {
    app: Router,
    store: Store,
}

async fn setup_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let store = Store::new(pool.clone());
    let state = AppState::new(pool);
    let app = routes::router(state);

    TestApp { app, store }
}

impl TestApp {
    async fn seed_user(&self, name: &str, role: UserRole) -> Uuid {
        self.store
            .create_user(CreateUserRequest {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                role,
                employee_code: None,
            })
            .await
            .expect("Failed to seed user")
            .id
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

fn open_cycle_body() -> Value {
    let today = Utc::now().date_naive();
    json!({
        "name": "Q1 Awards",
        "quarter": "Q1 2026",
        "year": 2026,
        "start_date": (today - Duration::days(7)).to_string(),
        "end_date": (today + Duration::days(7)).to_string(),
        "status": "OPEN",
    })
}

fn peer_form_body() -> Value {
    json!({
        "name": "Peer Award",
        "fields": [
            {"label": "Impact", "field_key": "impact", "field_type": "TEXT", "is_required": true}
        ],
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let test = setup_app().await;
    let (status, _) = test.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_credentials_rejected() {
    let test = setup_app().await;
    let (status, body) = test.request(Method::GET, "/cycles", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "failure");
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_unknown_enum_value_in_body_uses_envelope() {
    let test = setup_app().await;
    let hr = test.seed_user("Hannah Hr", UserRole::Hr).await;

    let (status, body) = test
        .request(
            Method::PATCH,
            &format!("/nominations/{}/status", Uuid::new_v4()),
            Some(hr),
            Some(json!({"status": "BOGUS"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failure");
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_employee_cannot_create_cycle() {
    let test = setup_app().await;
    let employee = test.seed_user("Eve Employee", UserRole::Employee).await;

    let (status, body) = test
        .request(Method::POST, "/cycles", Some(employee), Some(open_cycle_body()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    assert_eq!(body["message"], "Insufficient permissions");
}

#[tokio::test]
async fn test_full_workflow_nomination_to_award() {
    let test = setup_app().await;
    let hr = test.seed_user("Hannah Hr", UserRole::Hr).await;
    let manager = test.seed_user("Mark Manager", UserRole::Manager).await;
    let nominee = test.seed_user("Nina Nominee", UserRole::Employee).await;
    let reviewer = test.seed_user("Rita Reviewer", UserRole::Employee).await;

    // HR sets up the cycle and form.
    let (status, body) = test
        .request(Method::POST, "/cycles", Some(hr), Some(open_cycle_body()))
        .await;
    assert_eq!(status, StatusCode::OK, "cycle create failed: {}", body);
    let cycle_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = test
        .request(Method::POST, "/forms", Some(hr), Some(peer_form_body()))
        .await;
    assert_eq!(status, StatusCode::OK, "form create failed: {}", body);
    let form_id = body["data"]["id"].as_str().unwrap().to_string();

    // Manager nominates.
    let (status, body) = test
        .request(
            Method::POST,
            "/nominations",
            Some(manager),
            Some(json!({
                "cycle_id": cycle_id,
                "form_id": form_id,
                "nominee_id": nominee.to_string(),
                "answers": [{"field_key": "impact", "value": "shipped the launch"}],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "nomination failed: {}", body);
    assert_eq!(body["data"]["status"], "SUBMITTED");
    let nomination_id = body["data"]["id"].as_str().unwrap().to_string();

    // HR builds a panel with one reviewer and one required task.
    let (_, body) = test
        .request(
            Method::POST,
            "/panels",
            Some(hr),
            Some(json!({"name": "Tech Panel"})),
        )
        .await;
    let panel_id = body["data"]["id"].as_str().unwrap().to_string();

    test.request(
        Method::POST,
        &format!("/panels/{}/members", panel_id),
        Some(hr),
        Some(json!({"user_id": reviewer.to_string(), "role": "REVIEWER"})),
    )
    .await;

    let (_, body) = test
        .request(
            Method::POST,
            &format!("/panels/{}/tasks", panel_id),
            Some(hr),
            Some(json!({"title": "Impact"})),
        )
        .await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    // Assignment moves the nomination into PANEL_REVIEW.
    let (status, body) = test
        .request(
            Method::POST,
            &format!("/nominations/{}/panels", nomination_id),
            Some(hr),
            Some(json!({"panel_ids": [panel_id]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "assign failed: {}", body);
    let assignment_id = body["data"][0]["id"].as_str().unwrap().to_string();

    let (_, body) = test
        .request(
            Method::GET,
            &format!("/nominations/{}", nomination_id),
            Some(hr),
            None,
        )
        .await;
    assert_eq!(body["data"]["status"], "PANEL_REVIEW");

    // The reviewer sees the assignment with an unreviewed task.
    let (_, body) = test
        .request(Method::GET, "/assignments/my", Some(reviewer), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(body["data"][0]["tasks"][0]["review"].is_null());

    // Scoring the only required task completes the assignment and promotes
    // the nomination to HR_REVIEW.
    let (status, body) = test
        .request(
            Method::PUT,
            &format!("/assignments/{}/tasks/{}/review", assignment_id, task_id),
            Some(reviewer),
            Some(json!({"score": 4, "comment": "strong quarter"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "review failed: {}", body);
    assert_eq!(body["data"]["assignment_status"], "COMPLETED");
    assert_eq!(body["data"]["nomination_promoted"], true);

    // HR checks the dashboard, closes the cycle, finalizes the nomination.
    let (_, body) = test
        .request(
            Method::GET,
            &format!("/cycles/{}/summary", cycle_id),
            Some(hr),
            None,
        )
        .await;
    assert_eq!(body["data"][0]["ready_for_finalization"], true);

    test.request(
        Method::PATCH,
        &format!("/cycles/{}", cycle_id),
        Some(hr),
        Some(json!({"status": "CLOSED"})),
    )
    .await;

    let (status, body) = test
        .request(
            Method::PATCH,
            &format!("/nominations/{}/status", nomination_id),
            Some(hr),
            Some(json!({"status": "FINALIZED"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "finalize nomination failed: {}", body);

    // Award the nominee, then finalize the cycle.
    let (status, body) = test
        .request(
            Method::POST,
            "/awards",
            Some(hr),
            Some(json!({
                "cycle_id": cycle_id,
                "nomination_id": nomination_id,
                "winner_id": nominee.to_string(),
                "award_type": "Employee of the Quarter",
                "rank": 1,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "award failed: {}", body);
    assert!(body["data"]["finalized_at"].is_null());

    let (status, body) = test
        .request(
            Method::POST,
            &format!("/cycles/{}/finalize", cycle_id),
            Some(hr),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "finalize cycle failed: {}", body);
    assert_eq!(body["data"]["status"], "FINALIZED");

    let (_, body) = test
        .request(
            Method::GET,
            &format!("/awards?cycle_id={}", cycle_id),
            Some(hr),
            None,
        )
        .await;
    assert!(body["data"][0]["finalized_at"].is_string());
}

#[tokio::test]
async fn test_wrong_winner_rejected_with_envelope() {
    let test = setup_app().await;
    let hr = test.seed_user("Hannah Hr", UserRole::Hr).await;
    let manager = test.seed_user("Mark Manager", UserRole::Manager).await;
    let nominee = test.seed_user("Nina Nominee", UserRole::Employee).await;

    let (_, body) = test
        .request(Method::POST, "/cycles", Some(hr), Some(open_cycle_body()))
        .await;
    let cycle_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = test
        .request(Method::POST, "/forms", Some(hr), Some(peer_form_body()))
        .await;
    let form_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = test
        .request(
            Method::POST,
            "/nominations",
            Some(manager),
            Some(json!({
                "cycle_id": cycle_id,
                "form_id": form_id,
                "nominee_id": nominee.to_string(),
                "answers": [{"field_key": "impact", "value": "notable work"}],
            })),
        )
        .await;
    let nomination_id = body["data"]["id"].as_str().unwrap().to_string();

    test.request(
        Method::PATCH,
        &format!("/cycles/{}", cycle_id),
        Some(hr),
        Some(json!({"status": "CLOSED"})),
    )
    .await;
    test.request(
        Method::PATCH,
        &format!("/nominations/{}/status", nomination_id),
        Some(hr),
        Some(json!({"status": "HR_REVIEW"})),
    )
    .await;
    test.request(
        Method::PATCH,
        &format!("/nominations/{}/status", nomination_id),
        Some(hr),
        Some(json!({"status": "FINALIZED"})),
    )
    .await;

    // Manager is not the nominee; the award must be refused.
    let (status, body) = test
        .request(
            Method::POST,
            "/awards",
            Some(hr),
            Some(json!({
                "cycle_id": cycle_id,
                "nomination_id": nomination_id,
                "winner_id": manager.to_string(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["detail"], "Winner must be the nominee");
}

#[tokio::test]
async fn test_nomination_rejected_in_closed_cycle() {
    let test = setup_app().await;
    let hr = test.seed_user("Hannah Hr", UserRole::Hr).await;
    let manager = test.seed_user("Mark Manager", UserRole::Manager).await;
    let nominee = test.seed_user("Nina Nominee", UserRole::Employee).await;

    let mut cycle = open_cycle_body();
    cycle["status"] = json!("CLOSED");
    let (_, body) = test
        .request(Method::POST, "/cycles", Some(hr), Some(cycle))
        .await;
    let cycle_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = test
        .request(Method::POST, "/forms", Some(hr), Some(peer_form_body()))
        .await;
    let form_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = test
        .request(
            Method::POST,
            "/nominations",
            Some(manager),
            Some(json!({
                "cycle_id": cycle_id,
                "form_id": form_id,
                "nominee_id": nominee.to_string(),
                "answers": [{"field_key": "impact", "value": "too late"}],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "STATE_ERROR");
}

#[tokio::test]
async fn test_non_panel_member_cannot_review() {
    let test = setup_app().await;
    let outsider = test.seed_user("Odd Outsider", UserRole::Employee).await;

    let (status, body) = test
        .request(
            Method::PUT,
            &format!(
                "/assignments/{}/tasks/{}/review",
                Uuid::new_v4(),
                Uuid::new_v4()
            ),
            Some(outsider),
            Some(json!({"score": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}
