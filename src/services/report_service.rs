//! Reporting/aggregation views over loan history. Read-only, no stored
//! state; everything is derived from the schema tables at call time.

use chrono::{Datelike, Local};
use sea_orm::*;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::book::{self, Entity as Book};
use crate::models::book_copy::{self, Entity as BookCopy};
use crate::models::loan::{self, Entity as Loan};
use crate::models::member::Entity as Member;

use super::ServiceError;
use super::loan_service::loan_display_status;

/// Headline numbers for the dashboard
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_books: u64,
    pub total_copies: u64,
    pub total_members: u64,
    pub active_loans: u64,
    pub overdue_loans: u64,
    pub available_copies: u64,
}

pub async fn dashboard_stats(db: &DatabaseConnection) -> Result<DashboardStats, ServiceError> {
    let total_books = Book::find().count(db).await?;
    let total_copies = BookCopy::find().count(db).await?;
    let total_members = Member::find().count(db).await?;
    let available_copies = BookCopy::find()
        .filter(book_copy::Column::Status.eq("available"))
        .count(db)
        .await?;

    let open_loans = Loan::find()
        .filter(loan::Column::Status.eq("borrowed"))
        .all(db)
        .await?;

    let today = Local::now().format("%Y-%m-%d").to_string();
    let overdue_loans = open_loans
        .iter()
        .filter(|l| loan_display_status(&l.status, &l.due_date, &today) == "overdue")
        .count() as u64;

    Ok(DashboardStats {
        total_books,
        total_copies,
        total_members,
        active_loans: open_loans.len() as u64,
        overdue_loans,
        available_copies,
    })
}

/// A book ranked by how often it has been borrowed
#[derive(Debug, Serialize)]
pub struct PopularBook {
    pub book_id: i32,
    pub title: String,
    pub author: String,
    pub loan_count: u64,
}

/// Books ranked by loan count, most borrowed first.
pub async fn popular_books(
    db: &DatabaseConnection,
    limit: usize,
) -> Result<Vec<PopularBook>, ServiceError> {
    let (copy_book_map, books) = copy_to_book_maps(db).await?;

    let loans = Loan::find().all(db).await?;
    let mut counts: HashMap<i32, u64> = HashMap::new();
    for l in &loans {
        if let Some(book_id) = copy_book_map.get(&l.copy_id) {
            *counts.entry(*book_id).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<PopularBook> = counts
        .into_iter()
        .filter_map(|(book_id, loan_count)| {
            books.get(&book_id).map(|b| PopularBook {
                book_id,
                title: b.title.clone(),
                author: b.author.clone(),
                loan_count,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.loan_count.cmp(&a.loan_count).then(a.title.cmp(&b.title)));
    ranked.truncate(limit);

    Ok(ranked)
}

/// Loan counts grouped by book category
#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub loan_count: u64,
}

pub async fn category_distribution(
    db: &DatabaseConnection,
) -> Result<Vec<CategoryCount>, ServiceError> {
    let (copy_book_map, books) = copy_to_book_maps(db).await?;

    let loans = Loan::find().all(db).await?;
    let mut counts: HashMap<String, u64> = HashMap::new();
    for l in &loans {
        let category = copy_book_map
            .get(&l.copy_id)
            .and_then(|book_id| books.get(book_id))
            .and_then(|b| b.category.clone())
            .unwrap_or_else(|| "uncategorized".to_string());
        *counts.entry(category).or_insert(0) += 1;
    }

    let mut result: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, loan_count)| CategoryCount {
            category,
            loan_count,
        })
        .collect();
    result.sort_by(|a, b| b.loan_count.cmp(&a.loan_count).then(a.category.cmp(&b.category)));

    Ok(result)
}

/// Loan count for one calendar month
#[derive(Debug, Serialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub loan_count: u64,
}

/// Loan counts per month for the trailing `months` months, zero-filled
/// so the chart axis is continuous.
pub async fn monthly_loans(
    db: &DatabaseConnection,
    months: usize,
) -> Result<Vec<MonthlyCount>, ServiceError> {
    let today = Local::now().date_naive();
    let mut year = today.year();
    let mut month = today.month();

    let mut keys = Vec::with_capacity(months);
    for _ in 0..months {
        keys.push(format!("{:04}-{:02}", year, month));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    keys.reverse();

    let loans = Loan::find().all(db).await?;
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for l in &loans {
        if l.checkout_date.len() >= 7 {
            let key = &l.checkout_date[..7];
            if let Some(k) = keys.iter().find(|k| k.as_str() == key) {
                *counts.entry(k.as_str()).or_insert(0) += 1;
            }
        }
    }

    Ok(keys
        .iter()
        .map(|k| MonthlyCount {
            month: k.clone(),
            loan_count: counts.get(k.as_str()).copied().unwrap_or(0),
        })
        .collect())
}

/// Shared lookup tables: copy id to book id, and book id to book row.
async fn copy_to_book_maps(
    db: &DatabaseConnection,
) -> Result<(HashMap<i32, i32>, HashMap<i32, book::Model>), ServiceError> {
    let copies = BookCopy::find().all(db).await?;
    let copy_book_map: HashMap<i32, i32> = copies.iter().map(|c| (c.id, c.book_id)).collect();

    let books = Book::find().all(db).await?;
    let book_map: HashMap<i32, book::Model> = books.into_iter().map(|b| (b.id, b)).collect();

    Ok((copy_book_map, book_map))
}
