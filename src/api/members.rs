//! Member API handlers using the repository pattern

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::domain_error_response;
use crate::domain::MemberFilter;
use crate::infrastructure::AppState;
use crate::models::MemberDto;

#[derive(Debug, Deserialize)]
pub struct ListMembersQuery {
    pub status: Option<String>,
    pub q: Option<String>,
}

pub async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<ListMembersQuery>,
) -> impl IntoResponse {
    let filter = MemberFilter {
        status: query.status,
        query: query.q,
    };

    match state.member_repo.find_all(filter).await {
        Ok(members) => Json(json!({
            "total": members.len(),
            "members": members
        }))
        .into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}

pub async fn get_member(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.member_repo.find_by_id(id).await {
        Ok(Some(member)) => Json(json!({ "member": member })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Member not found" })),
        )
            .into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}

// Front-desk scan of a membership card
pub async fn lookup_member(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    match state.member_repo.find_by_qr_code(&code).await {
        Ok(Some(member)) => Json(json!({ "member": member })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No member matches this code" })),
        )
            .into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}

pub async fn create_member(
    State(state): State<AppState>,
    Json(payload): Json<MemberDto>,
) -> impl IntoResponse {
    match state.member_repo.create(payload).await {
        Ok(member) => (
            StatusCode::CREATED,
            Json(json!({
                "member": member,
                "message": "Member created successfully"
            })),
        )
            .into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}

pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<MemberDto>,
) -> impl IntoResponse {
    match state.member_repo.update(id, payload).await {
        Ok(member) => Json(json!({
            "member": member,
            "message": "Member updated successfully"
        }))
        .into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}

pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.member_repo.delete(id).await {
        Ok(()) => Json(json!({ "message": "Member deleted successfully" })).into_response(),
        Err(e) => domain_error_response(e).into_response(),
    }
}
