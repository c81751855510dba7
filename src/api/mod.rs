pub mod auth;
pub mod books;
pub mod copies;
pub mod health;
pub mod loans;
pub mod members;
pub mod reports;
pub mod shelves;
pub mod users;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::services::ServiceError;

pub(crate) fn domain_error_response(e: DomainError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() })))
}

pub(crate) fn service_error_response(e: ServiceError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() })))
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::get_me))
        // Operator accounts
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            put(users::update_user).delete(users::delete_user),
        )
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/books/:id/copies", get(copies::get_book_copies))
        .route("/books/:id/availability", get(copies::get_book_availability))
        // Copies
        .route("/copies", post(copies::create_copy))
        .route("/copies/bulk", post(copies::create_copies_bulk))
        .route(
            "/copies/:id",
            put(copies::update_copy).delete(copies::delete_copy),
        )
        // Shelves
        .route(
            "/shelves",
            get(shelves::list_shelves).post(shelves::create_shelf),
        )
        .route(
            "/shelves/:id",
            put(shelves::update_shelf).delete(shelves::delete_shelf),
        )
        // Members
        .route(
            "/members",
            get(members::list_members).post(members::create_member),
        )
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        .route("/members/lookup/:code", get(members::lookup_member))
        // Loans
        .route("/loans", get(loans::list_loans))
        .route("/loans/borrow", post(loans::borrow))
        .route("/loans/:id/return", put(loans::return_loan))
        .route("/loans/return-batch", post(loans::return_batch))
        .route("/loans/return-by-code", post(loans::return_by_code))
        .route("/loans/clear", post(loans::clear_loans))
        .route(
            "/loans/transaction/:tid/receipt",
            get(loans::transaction_receipt),
        )
        // Reports
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/reports/popular", get(reports::popular))
        .route("/reports/categories", get(reports::categories))
        .route("/reports/monthly", get(reports::monthly))
        .with_state(state)
}
