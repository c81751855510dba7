//! Copy API handlers: per-book listing, availability, single and bulk
//! creation with derived barcodes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::service_error_response;
use crate::models::book::Entity as Book;
use crate::models::book_copy::{self, Entity as BookCopy};
use crate::models::shelf::Entity as Shelf;
use crate::services::availability;

// List the copies of one book
pub async fn get_book_copies(
    State(db): State<DatabaseConnection>,
    Path(book_id): Path<i32>,
) -> impl IntoResponse {
    match BookCopy::find()
        .filter(book_copy::Column::BookId.eq(book_id))
        .order_by_asc(book_copy::Column::CopyNumber)
        .all(&db)
        .await
    {
        Ok(copies) => Json(json!({
            "total": copies.len(),
            "copies": copies
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Database error: {}", e)})),
        )
            .into_response(),
    }
}

// Availability counts and the list of copies ready to borrow
pub async fn get_book_availability(
    State(db): State<DatabaseConnection>,
    Path(book_id): Path<i32>,
) -> impl IntoResponse {
    match availability::book_availability(&db, book_id).await {
        Ok(result) => Json(json!({ "availability": result })).into_response(),
        Err(e) => service_error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCopyRequest {
    pub book_id: i32,
    pub shelf_id: Option<i32>,
    /// Derived from book id and copy number when omitted
    pub barcode: Option<String>,
    pub location_code: Option<String>,
    pub condition: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCopiesBulkRequest {
    pub book_id: i32,
    pub count: u32,
    pub shelf_id: Option<i32>,
    pub condition: Option<String>,
}

async fn next_copy_number(db: &DatabaseConnection, book_id: i32) -> Result<i32, DbErr> {
    let last = BookCopy::find()
        .filter(book_copy::Column::BookId.eq(book_id))
        .order_by_desc(book_copy::Column::CopyNumber)
        .one(db)
        .await?;
    Ok(last.map(|c| c.copy_number + 1).unwrap_or(1))
}

fn derived_barcode(book_id: i32, copy_number: i32) -> String {
    format!("LIB-{:05}-{:03}", book_id, copy_number)
}

async fn derived_location_code(
    db: &DatabaseConnection,
    shelf_id: Option<i32>,
    copy_number: i32,
) -> Result<Option<String>, DbErr> {
    let Some(shelf_id) = shelf_id else {
        return Ok(None);
    };
    let shelf = Shelf::find_by_id(shelf_id).one(db).await?;
    Ok(shelf.map(|s| {
        format!(
            "{}-{:03}",
            s.section.unwrap_or_else(|| s.name),
            copy_number
        )
    }))
}

async fn insert_copy(
    db: &DatabaseConnection,
    book_id: i32,
    shelf_id: Option<i32>,
    barcode: Option<String>,
    location_code: Option<String>,
    condition: Option<String>,
    status: Option<String>,
) -> Result<book_copy::Model, DbErr> {
    let copy_number = next_copy_number(db, book_id).await?;
    let barcode = barcode.unwrap_or_else(|| derived_barcode(book_id, copy_number));
    let location_code = match location_code {
        Some(code) => Some(code),
        None => derived_location_code(db, shelf_id, copy_number).await?,
    };

    let now = chrono::Utc::now().to_rfc3339();
    let copy = book_copy::ActiveModel {
        book_id: Set(book_id),
        shelf_id: Set(shelf_id),
        barcode: Set(barcode),
        location_code: Set(location_code),
        status: Set(status.unwrap_or_else(|| "available".to_string())),
        condition: Set(condition.unwrap_or_else(|| "good".to_string())),
        copy_number: Set(copy_number),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    copy.insert(db).await
}

pub async fn create_copy(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<CreateCopyRequest>,
) -> impl IntoResponse {
    // The copy must hang off an existing book
    match Book::find_by_id(payload.book_id).one(&db).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Book not found"})),
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
    }

    match insert_copy(
        &db,
        payload.book_id,
        payload.shelf_id,
        payload.barcode,
        payload.location_code,
        payload.condition,
        payload.status,
    )
    .await
    {
        Ok(model) => (
            StatusCode::CREATED,
            Json(json!({
                "copy": model,
                "message": "Copy created successfully"
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Failed to create copy: {}", e)})),
        )
            .into_response(),
    }
}

// Templated bulk creation; copy numbers continue from the current max
pub async fn create_copies_bulk(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<CreateCopiesBulkRequest>,
) -> impl IntoResponse {
    if payload.count == 0 || payload.count > 100 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Count must be between 1 and 100"})),
        )
            .into_response();
    }

    match Book::find_by_id(payload.book_id).one(&db).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Book not found"})),
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
    }

    let mut created = Vec::with_capacity(payload.count as usize);
    for _ in 0..payload.count {
        match insert_copy(
            &db,
            payload.book_id,
            payload.shelf_id,
            None,
            None,
            payload.condition.clone(),
            None,
        )
        .await
        {
            Ok(model) => created.push(model),
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": format!("Failed after creating {} copies: {}", created.len(), e)
                    })),
                )
                    .into_response();
            }
        }
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "copies": created,
            "message": format!("{} copies created", created.len())
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct UpdateCopyRequest {
    pub status: Option<String>,
    pub condition: Option<String>,
    /// Double option: absent = leave as is, null = unshelve
    pub shelf_id: Option<Option<i32>>,
    pub location_code: Option<Option<String>>,
}

pub async fn update_copy(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCopyRequest>,
) -> impl IntoResponse {
    let copy = BookCopy::find_by_id(id).one(&db).await.unwrap_or(None);

    if let Some(copy) = copy {
        let mut active: book_copy::ActiveModel = copy.into();
        if let Some(status) = payload.status {
            active.status = Set(status);
        }
        if let Some(condition) = payload.condition {
            active.condition = Set(condition);
        }
        if let Some(shelf_id) = payload.shelf_id {
            active.shelf_id = Set(shelf_id);
        }
        if let Some(location_code) = payload.location_code {
            active.location_code = Set(location_code);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        match active.update(&db).await {
            Ok(model) => Json(json!({
                "copy": model,
                "message": "Copy updated successfully"
            }))
            .into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Failed to update copy: {}", e)})),
            )
                .into_response(),
        }
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Copy not found"})),
        )
            .into_response()
    }
}

pub async fn delete_copy(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match BookCopy::delete_by_id(id).exec(&db).await {
        Ok(res) if res.rows_affected > 0 => {
            Json(json!({"message": "Copy deleted successfully"})).into_response()
        }
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Copy not found"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Failed to delete copy: {}", e)})),
        )
            .into_response(),
    }
}
