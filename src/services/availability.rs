//! Copy-availability calculator. Pure reads, no side effects.

use sea_orm::*;
use serde::Serialize;

use crate::models::book::Entity as Book;
use crate::models::book_copy::{self, Entity as BookCopy};
use crate::models::shelf::Entity as Shelf;

use super::ServiceError;

/// Copy counts for a book, partitioned by circulation status.
/// `other` covers processing, lost and on_hold so the counts always
/// sum to `total`.
#[derive(Debug, Serialize)]
pub struct BookAvailability {
    pub book_id: i32,
    pub total: usize,
    pub available: usize,
    pub checked_out: usize,
    pub damaged: usize,
    pub other: usize,
    pub available_copies: Vec<AvailableCopy>,
}

/// A copy currently on the shelf, with its location detail.
#[derive(Debug, Serialize)]
pub struct AvailableCopy {
    pub id: i32,
    pub barcode: String,
    pub copy_number: i32,
    pub location_code: Option<String>,
    pub condition: String,
    pub shelf_name: Option<String>,
    pub shelf_location: Option<String>,
}

/// Aggregate the copies of a book into availability counts.
///
/// A book with zero copies is a valid state (all counts zero, empty
/// list); an unknown book id is an error.
pub async fn book_availability(
    db: &DatabaseConnection,
    book_id: i32,
) -> Result<BookAvailability, ServiceError> {
    Book::find_by_id(book_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Book {} not found", book_id)))?;

    let copies_with_shelves = BookCopy::find()
        .filter(book_copy::Column::BookId.eq(book_id))
        .order_by_asc(book_copy::Column::CopyNumber)
        .find_also_related(Shelf)
        .all(db)
        .await?;

    let mut result = BookAvailability {
        book_id,
        total: copies_with_shelves.len(),
        available: 0,
        checked_out: 0,
        damaged: 0,
        other: 0,
        available_copies: Vec::new(),
    };

    for (copy, shelf) in copies_with_shelves {
        match copy.status.as_str() {
            "available" => {
                result.available += 1;
                result.available_copies.push(AvailableCopy {
                    id: copy.id,
                    barcode: copy.barcode,
                    copy_number: copy.copy_number,
                    location_code: copy.location_code,
                    condition: copy.condition,
                    shelf_name: shelf.as_ref().map(|s| s.name.clone()),
                    shelf_location: shelf.as_ref().and_then(|s| s.location.clone()),
                });
            }
            "checked_out" => result.checked_out += 1,
            "damaged" => result.damaged += 1,
            _ => result.other += 1,
        }
    }

    Ok(result)
}
