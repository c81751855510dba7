use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::api::service_error_response;
use crate::services::report_service;

pub async fn dashboard(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match report_service::dashboard_stats(&db).await {
        Ok(stats) => Json(json!({ "stats": stats })).into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

pub async fn popular(
    State(db): State<DatabaseConnection>,
    Query(query): Query<PopularQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(10);
    match report_service::popular_books(&db, limit).await {
        Ok(books) => Json(json!({ "books": books })).into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}

pub async fn categories(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match report_service::category_distribution(&db).await {
        Ok(categories) => Json(json!({ "categories": categories })).into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub months: Option<usize>,
}

pub async fn monthly(
    State(db): State<DatabaseConnection>,
    Query(query): Query<MonthlyQuery>,
) -> impl IntoResponse {
    let months = query.months.unwrap_or(12).clamp(1, 60);
    match report_service::monthly_loans(&db, months).await {
        Ok(months) => Json(json!({ "months": months })).into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}
