//! Book API handlers using the repository pattern

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::domain_error_response;
use crate::domain::BookFilter;
use crate::infrastructure::AppState;
use crate::models::Book;

#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/books",
    responses(
        (status = 200, description = "List books with optional filters")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListBooksQuery>,
) -> impl IntoResponse {
    let filter = BookFilter {
        status: query.status,
        category: query.category,
        query: query.q,
        sort: query.sort,
        page: query.page,
        limit: query.limit,
    };

    match state.book_repo.find_all(filter).await {
        Ok(result) => Json(json!({
            "books": result.books,
            "total": result.total
        }))
        .into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}

pub async fn get_book(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.book_repo.find_by_id(id).await {
        Ok(Some(book)) => Json(json!({ "book": book })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Book not found" })),
        )
            .into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/books",
    responses(
        (status = 201, description = "Book created")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Json(payload): Json<Book>,
) -> impl IntoResponse {
    match state.book_repo.create(payload).await {
        Ok(book) => (
            StatusCode::CREATED,
            Json(json!({
                "book": book,
                "message": "Book created successfully"
            })),
        )
            .into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/books/{id}",
    responses(
        (status = 200, description = "Book updated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<Book>,
) -> impl IntoResponse {
    match state.book_repo.update(id, payload).await {
        Ok(book) => Json(json!({
            "book": book,
            "message": "Book updated successfully"
        }))
        .into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    responses(
        (status = 200, description = "Book deleted along with its copies"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.book_repo.delete(id).await {
        Ok(()) => Json(json!({ "message": "Book deleted successfully" })).into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}
