use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use crate::models::book_copy::{self, Entity as BookCopy};
use crate::models::shelf::{self, Entity as Shelf};

#[derive(Debug, Deserialize)]
pub struct ShelfDto {
    pub name: String,
    pub location: Option<String>,
    pub section: Option<String>,
    pub capacity: Option<i32>,
}

// List shelves with the number of copies each one holds
pub async fn list_shelves(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    let shelves = match Shelf::find().all(&db).await {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Database error: {}", e)})),
            )
                .into_response();
        }
    };

    let copies = match BookCopy::find()
        .filter(book_copy::Column::ShelfId.is_not_null())
        .all(&db)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Database error: {}", e)})),
            )
                .into_response();
        }
    };

    let mut counts: HashMap<i32, usize> = HashMap::new();
    for copy in &copies {
        if let Some(shelf_id) = copy.shelf_id {
            *counts.entry(shelf_id).or_insert(0) += 1;
        }
    }

    let result: Vec<_> = shelves
        .into_iter()
        .map(|s| {
            let copy_count = counts.get(&s.id).copied().unwrap_or(0);
            json!({
                "id": s.id,
                "name": s.name,
                "location": s.location,
                "section": s.section,
                "capacity": s.capacity,
                "copy_count": copy_count,
            })
        })
        .collect();

    Json(json!({ "total": result.len(), "shelves": result })).into_response()
}

pub async fn create_shelf(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<ShelfDto>,
) -> impl IntoResponse {
    if payload.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Shelf name is required"})),
        )
            .into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();
    let new_shelf = shelf::ActiveModel {
        name: Set(payload.name),
        location: Set(payload.location),
        section: Set(payload.section),
        capacity: Set(payload.capacity),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_shelf.insert(&db).await {
        Ok(model) => (
            StatusCode::CREATED,
            Json(json!({
                "shelf": model,
                "message": "Shelf created successfully"
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Failed to create shelf: {}", e)})),
        )
            .into_response(),
    }
}

pub async fn update_shelf(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<ShelfDto>,
) -> impl IntoResponse {
    let shelf = Shelf::find_by_id(id).one(&db).await.unwrap_or(None);

    if let Some(shelf) = shelf {
        let mut active: shelf::ActiveModel = shelf.into();
        active.name = Set(payload.name);
        active.location = Set(payload.location);
        active.section = Set(payload.section);
        active.capacity = Set(payload.capacity);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        match active.update(&db).await {
            Ok(model) => Json(json!({
                "shelf": model,
                "message": "Shelf updated successfully"
            }))
            .into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Failed to update shelf: {}", e)})),
            )
                .into_response(),
        }
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Shelf not found"})),
        )
            .into_response()
    }
}

// Deleting a shelf leaves its copies unshelved (shelf_id set NULL by the schema)
pub async fn delete_shelf(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match Shelf::delete_by_id(id).exec(&db).await {
        Ok(res) if res.rows_affected > 0 => {
            Json(json!({"message": "Shelf deleted successfully"})).into_response()
        }
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Shelf not found"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Failed to delete shelf: {}", e)})),
        )
            .into_response(),
    }
}
