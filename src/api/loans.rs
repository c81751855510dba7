//! Loan API handlers. Write operations respond with
//! `{"success", "message", ...}` command results; the UI shows the
//! message verbatim.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::api::service_error_response;
use crate::services::loan_service::{
    self, BatchReturnItem, BorrowRequest, LoanFilter, ReturnOptions,
};
use crate::services::receipt_service;

#[derive(Debug, Deserialize)]
pub struct ListLoansQuery {
    /// `borrowed`, `returned` or the derived `overdue`
    pub status: Option<String>,
    pub member_id: Option<i32>,
}

pub async fn list_loans(
    State(db): State<DatabaseConnection>,
    Query(query): Query<ListLoansQuery>,
) -> impl IntoResponse {
    let filter = LoanFilter {
        status: query.status,
        member_id: query.member_id,
    };

    match loan_service::list_loans(&db, filter).await {
        Ok(loans) => Json(json!({
            "total": loans.len(),
            "loans": loans
        }))
        .into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}

pub async fn borrow(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<BorrowRequest>,
) -> impl IntoResponse {
    match loan_service::borrow_copies(&db, payload).await {
        Ok(outcome) => {
            let message = format!(
                "Borrowed {} of {} copies",
                outcome.borrowed,
                outcome.borrowed + outcome.failed
            );
            Json(json!({
                "success": outcome.failed == 0,
                "message": message,
                "transaction_id": outcome.transaction_id,
                "checkout_date": outcome.checkout_date,
                "due_date": outcome.due_date,
                "borrowed": outcome.borrowed,
                "failed": outcome.failed,
                "items": outcome.items,
            }))
            .into_response()
        }
        Err(e) => service_error_response(e).into_response(),
    }
}

pub async fn return_loan(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    payload: Option<Json<ReturnOptions>>,
) -> impl IntoResponse {
    let opts = payload.map(|Json(p)| p).unwrap_or_default();

    match loan_service::return_loan(&db, id, opts).await {
        Ok(outcome) => Json(json!({
            "success": outcome.returned,
            "message": outcome.message,
            "loan_id": outcome.loan_id,
            "copy_status": outcome.copy_status,
        }))
        .into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchReturnRequest {
    pub items: Vec<BatchReturnItem>,
}

pub async fn return_batch(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<BatchReturnRequest>,
) -> impl IntoResponse {
    match loan_service::return_batch(&db, payload.items).await {
        Ok(outcome) => Json(json!({
            "success": outcome.skipped == 0,
            "message": format!(
                "Returned {} loan(s), skipped {}",
                outcome.returned, outcome.skipped
            ),
            "returned": outcome.returned,
            "skipped": outcome.skipped,
            "items": outcome.items,
        }))
        .into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CodeReturnRequest {
    pub code: String,
}

pub async fn return_by_code(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<CodeReturnRequest>,
) -> impl IntoResponse {
    match loan_service::return_by_code(&db, &payload.code).await {
        Ok(outcome) => Json(json!({
            "success": outcome.returned > 0,
            "message": outcome.message,
            "returned": outcome.returned,
            "skipped": outcome.skipped,
            "items": outcome.items,
        }))
        .into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}

// Administrative: the UI asks for explicit confirmation before calling this
pub async fn clear_loans(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match loan_service::clear_all_loans(&db).await {
        Ok(outcome) => Json(json!({
            "success": true,
            "message": format!(
                "Deleted {} loan(s), reset {} copies to available",
                outcome.loans_deleted, outcome.copies_reset
            ),
            "loans_deleted": outcome.loans_deleted,
            "copies_reset": outcome.copies_reset,
        }))
        .into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}

pub async fn transaction_receipt(
    State(db): State<DatabaseConnection>,
    Path(tid): Path<String>,
) -> impl IntoResponse {
    match receipt_service::receipt_with_qr(&db, &tid).await {
        Ok(encoded) => Json(json!({
            "receipt": encoded.receipt,
            "qr_data_url": encoded.qr_data_url,
            "warning": encoded.warning,
        }))
        .into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}
