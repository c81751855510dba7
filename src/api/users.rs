//! Operator account management. Requires an admin token; the last
//! admin account can neither be demoted nor deleted.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{Claims, hash_password};
use crate::models::user::{self, Entity as User};

fn forbidden() -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Admin role required" })),
    )
        .into_response()
}

async fn count_admins(db: &DatabaseConnection) -> Result<u64, sea_orm::DbErr> {
    User::find()
        .filter(user::Column::Role.eq("admin"))
        .filter(user::Column::Status.eq("active"))
        .count(db)
        .await
}

pub async fn list_users(State(db): State<DatabaseConnection>, claims: Claims) -> impl IntoResponse {
    if !claims.is_admin() {
        return forbidden();
    }

    match User::find().all(&db).await {
        Ok(users) => Json(json!({
            "total": users.len(),
            "users": users
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Database error: {}", e)})),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
    pub pin: Option<String>,
    pub member_id: Option<i32>,
}

pub async fn create_user(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if !claims.is_admin() {
        return forbidden();
    }

    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Username and password are required"})),
        )
            .into_response();
    }

    let role = payload.role.unwrap_or_else(|| "staff".to_string());
    if !matches!(role.as_str(), "admin" | "librarian" | "staff") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Invalid role '{}'", role)})),
        )
            .into_response();
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Failed to hash password: {}", e)})),
            )
                .into_response();
        }
    };

    let now = chrono::Utc::now().to_rfc3339();
    let new_user = user::ActiveModel {
        username: Set(payload.username),
        password_hash: Set(password_hash),
        role: Set(role),
        status: Set("active".to_string()),
        pin: Set(payload.pin),
        qr_auth_key: Set(Some(uuid::Uuid::new_v4().to_string())),
        member_id: Set(payload.member_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_user.insert(&db).await {
        Ok(model) => (
            StatusCode::CREATED,
            Json(json!({
                "user": model,
                "message": "User created successfully"
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Failed to create user: {}", e)})),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub password: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub pin: Option<String>,
    pub member_id: Option<Option<i32>>,
}

pub async fn update_user(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    if !claims.is_admin() {
        return forbidden();
    }

    let existing = match User::find_by_id(id).one(&db).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "User not found"})),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Database error: {}", e)})),
            )
                .into_response();
        }
    };

    // Demoting or deactivating the last active admin would lock everyone
    // out; accounts already inactive don't count towards that guard
    let loses_admin = existing.role == "admin"
        && existing.status == "active"
        && (payload.role.as_deref().is_some_and(|r| r != "admin")
            || payload.status.as_deref().is_some_and(|s| s != "active"));
    if loses_admin {
        match count_admins(&db).await {
            Ok(1) => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({"error": "Cannot demote the last admin account"})),
                )
                    .into_response();
            }
            Ok(_) => {}
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": format!("Database error: {}", e)})),
                )
                    .into_response();
            }
        }
    }

    let mut active: user::ActiveModel = existing.into();
    if let Some(password) = payload.password {
        match hash_password(&password) {
            Ok(h) => active.password_hash = Set(h),
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": format!("Failed to hash password: {}", e)})),
                )
                    .into_response();
            }
        }
    }
    if let Some(role) = payload.role {
        active.role = Set(role);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if payload.pin.is_some() {
        active.pin = Set(payload.pin);
    }
    if let Some(member_id) = payload.member_id {
        active.member_id = Set(member_id);
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    match active.update(&db).await {
        Ok(model) => Json(json!({
            "user": model,
            "message": "User updated successfully"
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Failed to update user: {}", e)})),
        )
            .into_response(),
    }
}

pub async fn delete_user(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if !claims.is_admin() {
        return forbidden();
    }

    let existing = match User::find_by_id(id).one(&db).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "User not found"})),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Database error: {}", e)})),
            )
                .into_response();
        }
    };

    if existing.role == "admin" && existing.status == "active" {
        match count_admins(&db).await {
            Ok(1) => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({"error": "Cannot delete the last admin account"})),
                )
                    .into_response();
            }
            Ok(_) => {}
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": format!("Database error: {}", e)})),
                )
                    .into_response();
            }
        }
    }

    match User::delete_by_id(id).exec(&db).await {
        Ok(_) => Json(json!({"message": "User deleted successfully"})).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Failed to delete user: {}", e)})),
        )
            .into_response(),
    }
}
