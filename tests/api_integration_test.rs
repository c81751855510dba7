use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use librarium::api;
use librarium::auth::create_jwt;
use librarium::db;
use librarium::infrastructure::AppState;

async fn setup_test_app() -> (Router, DatabaseConnection) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let app = api::api_router(AppState::new(db.clone()));
    (app, db)
}

async fn create_test_book(db: &DatabaseConnection, title: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let book = librarium::models::book::ActiveModel {
        title: Set(title.to_string()),
        author: Set("Test Author".to_string()),
        status: Set("active".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    book.insert(db).await.expect("Failed to create book").id
}

async fn create_test_copy(db: &DatabaseConnection, book_id: i32, copy_number: i32) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let copy = librarium::models::book_copy::ActiveModel {
        book_id: Set(book_id),
        barcode: Set(format!("LIB-{:05}-{:03}", book_id, copy_number)),
        status: Set("available".to_string()),
        condition: Set("good".to_string()),
        copy_number: Set(copy_number),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    copy.insert(db).await.expect("Failed to create copy").id
}

async fn create_test_member(db: &DatabaseConnection, name: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let member = librarium::models::member::ActiveModel {
        name: Set(name.to_string()),
        membership_type: Set("standard".to_string()),
        status: Set("active".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    member.insert(db).await.expect("Failed to create member").id
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not valid JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _db) = setup_test_app().await;

    let response = app
        .oneshot(get_request("/health"))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_build_router_nests_api_prefix() {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let app = librarium::server::build_router(db);

    let response = app
        .oneshot(get_request("/api/health"))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_borrow_return_flow_over_http() {
    let (app, db) = setup_test_app().await;
    let book_id = create_test_book(&db, "Dune").await;
    let copy_a = create_test_copy(&db, book_id, 1).await;
    let copy_b = create_test_copy(&db, book_id, 2).await;
    let member_id = create_test_member(&db, "Alice Martin").await;

    // Borrow both copies in one transaction
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/loans/borrow",
            json!({ "member_id": member_id, "copy_ids": [copy_a, copy_b] }),
        ))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["borrowed"], 2);
    assert_eq!(body["failed"], 0);
    let tid = body["transaction_id"].as_str().expect("no tid").to_string();
    let loan_id = body["items"][0]["loan_id"].as_i64().expect("no loan id");

    // Availability reflects the checkout
    let response = app
        .clone()
        .oneshot(get_request(&format!("/books/{}/availability", book_id)))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["availability"]["total"], 2);
    assert_eq!(body["availability"]["available"], 0);
    assert_eq!(body["availability"]["checked_out"], 2);

    // The receipt for the transaction renders with a QR code
    let response = app
        .clone()
        .oneshot(get_request(&format!("/loans/transaction/{}/receipt", tid)))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["receipt"]["member_name"], "Alice Martin");
    assert_eq!(body["receipt"]["lines"].as_array().map(|l| l.len()), Some(2));
    assert!(
        body["qr_data_url"]
            .as_str()
            .is_some_and(|u| u.starts_with("data:image/png;base64,"))
    );

    // Return one copy
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/loans/{}/return", loan_id),
            json!({ "condition": "good" }),
        ))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["copy_status"], "available");

    // Availability is half restored
    let response = app
        .clone()
        .oneshot(get_request(&format!("/books/{}/availability", book_id)))
        .await
        .expect("Request failed");
    let body = body_json(response).await;
    assert_eq!(body["availability"]["available"], 1);
    assert_eq!(body["availability"]["checked_out"], 1);

    // The loan list carries member and book detail
    let response = app
        .oneshot(get_request("/loans?status=borrowed"))
        .await
        .expect("Request failed");
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["loans"][0]["member_name"], "Alice Martin");
    assert_eq!(body["loans"][0]["book_title"], "Dune");
}

#[tokio::test]
async fn test_borrow_validation_errors_over_http() {
    let (app, db) = setup_test_app().await;
    let member_id = create_test_member(&db, "Alice Martin").await;

    // No copies selected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/loans/borrow",
            json!({ "member_id": member_id, "copy_ids": [] }),
        ))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown member
    let response = app
        .oneshot(json_request(
            "POST",
            "/loans/borrow",
            json!({ "member_id": 9999, "copy_ids": [1] }),
        ))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_availability_for_unknown_book_is_404() {
    let (app, _db) = setup_test_app().await;

    let response = app
        .oneshot(get_request("/books/404/availability"))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_crud_and_card_lookup() {
    let (app, _db) = setup_test_app().await;

    // Create: a card code is assigned, the pin is never echoed back
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/members",
            json!({ "name": "Bruno Keller", "email": "bruno@example.org", "pin": "1234" }),
        ))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let member_id = body["member"]["id"].as_i64().expect("no member id");
    let code = body["member"]["qr_code"]
        .as_str()
        .expect("no card code")
        .to_string();
    assert!(body["member"].get("pin").is_none() || body["member"]["pin"].is_null());

    // Lookup by scanned card code
    let response = app
        .clone()
        .oneshot(get_request(&format!("/members/lookup/{}", code)))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["member"]["name"], "Bruno Keller");

    let response = app
        .clone()
        .oneshot(get_request("/members/lookup/not-a-real-code"))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Update
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/members/{}", member_id),
            json!({ "name": "Bruno Keller", "status": "inactive" }),
        ))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["member"]["status"], "inactive");

    // Delete, then the lookup is gone
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/members/{}", member_id))
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request(&format!("/members/{}", member_id)))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_member_email_conflicts() {
    let (app, _db) = setup_test_app().await;

    let payload = json!({ "name": "Alice Martin", "email": "alice@example.org" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/members", payload.clone()))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(json_request("POST", "/members", payload))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_with_seeded_admin() {
    let (app, _db) = setup_test_app().await;

    // Migrations seed the default admin account
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "username": "admin", "password": "admin" }),
        ))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["role"], "admin");

    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "username": "admin", "password": "wrong" }),
        ))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_routes_require_admin_token() {
    let (app, _db) = setup_test_app().await;

    // No token
    let response = app
        .clone()
        .oneshot(get_request("/users"))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Staff token is authenticated but not authorized
    let staff_token = create_jwt("clerk", "staff").expect("token failed");
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users")
                .header(header::AUTHORIZATION, format!("Bearer {}", staff_token))
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin token lists the seeded account
    let admin_token = create_jwt("admin", "admin").expect("token failed");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/users")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["users"][0]["username"], "admin");
}

#[tokio::test]
async fn test_last_admin_cannot_be_demoted_or_deleted() {
    let (app, _db) = setup_test_app().await;
    let admin_token = create_jwt("admin", "admin").expect("token failed");

    // The seeded admin has id 1 and is the only admin
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/users/1")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .body(Body::from(json!({ "role": "staff" }).to_string()))
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/users/1")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_inactive_admin_can_be_deleted_despite_last_admin_guard() {
    let (app, db) = setup_test_app().await;
    let admin_token = create_jwt("admin", "admin").expect("token failed");

    // Two retired admin accounts next to the one active seeded admin
    let mut retired_ids = Vec::new();
    for username in ["old_admin_a", "old_admin_b"] {
        let now = chrono::Utc::now().to_rfc3339();
        let retired = librarium::models::user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set("unused".to_string()),
            role: Set("admin".to_string()),
            status: Set("inactive".to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };
        retired_ids.push(retired.insert(&db).await.expect("Failed to create user").id);
    }

    // Demoting an inactive admin is allowed; it holds no admin access
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/users/{}", retired_ids[0]))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .body(Body::from(json!({ "role": "staff" }).to_string()))
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    // And so is deleting one, even though only one active admin exists
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/users/{}", retired_ids[1]))
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_migrations_are_idempotent_and_seed_admin_once() {
    let path = std::env::temp_dir().join(format!("librarium_test_{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());

    // Running the migrations twice against the same file must be a no-op
    let db = db::init_db(&url).await.expect("first init failed");
    drop(db);
    let db = db::init_db(&url).await.expect("second init failed");

    let admins = librarium::models::user::Entity::find()
        .count(&db)
        .await
        .expect("count failed");
    assert_eq!(admins, 1);

    drop(db);
    let _ = std::fs::remove_file(&path);
}
