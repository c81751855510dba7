//! Loan lifecycle manager - pure business logic without HTTP layer
//!
//! Copy states move `available -> checked_out -> {available | damaged | lost}`.
//! Batch operations process each row independently; a failed item never
//! rolls back items already processed. The caller inspects the per-item
//! results.

use chrono::{Duration, Local, NaiveDate};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::book::Entity as Book;
use crate::models::book_copy::{self, Entity as BookCopy};
use crate::models::loan::{self, Entity as Loan};
use crate::models::member::Entity as Member;

use super::ServiceError;

/// Default loan period when the caller does not supply a due date.
pub const DEFAULT_LOAN_DAYS: i64 = 14;

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Derived display status. `overdue` is computed from the due date at
/// read time and never persisted, so stored and displayed state cannot
/// drift apart.
pub fn loan_display_status(status: &str, due_date: &str, today: &str) -> String {
    if status != "returned" && due_date < today {
        "overdue".to_string()
    } else {
        status.to_string()
    }
}

/// Enriched loan with related data
#[derive(Debug, Clone, Serialize)]
pub struct LoanWithDetails {
    pub id: i32,
    pub copy_id: i32,
    pub member_id: i32,
    pub checkout_date: String,
    pub due_date: String,
    pub return_date: Option<String>,
    pub status: String,
    /// `borrowed`, `returned` or the derived `overdue`.
    pub display_status: String,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub member_name: String,
    pub book_title: String,
    pub barcode: String,
}

/// Filter parameters for listing loans
#[derive(Debug, Default, Clone)]
pub struct LoanFilter {
    /// `borrowed`, `returned`, or the derived `overdue`
    pub status: Option<String>,
    pub member_id: Option<i32>,
}

/// List loans with related member and book info
pub async fn list_loans(
    db: &DatabaseConnection,
    filter: LoanFilter,
) -> Result<Vec<LoanWithDetails>, ServiceError> {
    let mut condition = Condition::all();

    // `overdue` is not a stored value; filter on open loans and narrow below
    let overdue_only = filter.status.as_deref() == Some("overdue");
    if let Some(status) = filter.status
        && status != "overdue"
    {
        condition = condition.add(loan::Column::Status.eq(status));
    }
    if overdue_only {
        condition = condition.add(loan::Column::Status.eq("borrowed"));
    }

    if let Some(member_id) = filter.member_id {
        condition = condition.add(loan::Column::MemberId.eq(member_id));
    }

    let loans_with_members = Loan::find()
        .filter(condition)
        .order_by_desc(loan::Column::CheckoutDate)
        .find_also_related(Member)
        .all(db)
        .await?;

    // Collect copy IDs to fetch books
    let copy_ids: Vec<i32> = loans_with_members.iter().map(|(l, _)| l.copy_id).collect();

    let mut copy_book_map: HashMap<i32, (String, String)> = HashMap::new();

    if !copy_ids.is_empty() {
        let copies_with_books = BookCopy::find()
            .filter(book_copy::Column::Id.is_in(copy_ids))
            .find_also_related(Book)
            .all(db)
            .await?;

        for (copy, book) in copies_with_books {
            let title = book.map(|b| b.title).unwrap_or_else(|| "Unknown".to_string());
            copy_book_map.insert(copy.id, (title, copy.barcode));
        }
    }

    let today = today();
    let result: Vec<LoanWithDetails> = loans_with_members
        .into_iter()
        .map(|(loan, member)| {
            let member_name = member
                .as_ref()
                .map(|m| m.name.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            let (book_title, barcode) = copy_book_map
                .get(&loan.copy_id)
                .cloned()
                .unwrap_or_else(|| ("Unknown".to_string(), String::new()));
            let display_status = loan_display_status(&loan.status, &loan.due_date, &today);

            LoanWithDetails {
                id: loan.id,
                copy_id: loan.copy_id,
                member_id: loan.member_id,
                checkout_date: loan.checkout_date,
                due_date: loan.due_date,
                return_date: loan.return_date,
                status: loan.status,
                display_status,
                transaction_id: loan.transaction_id,
                notes: loan.notes,
                rating: loan.rating,
                review: loan.review,
                member_name,
                book_title,
                barcode,
            }
        })
        .filter(|l| !overdue_only || l.display_status == "overdue")
        .collect();

    Ok(result)
}

/// Request to borrow one or more copies in a single action
#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub member_id: i32,
    pub copy_ids: Vec<i32>,
    /// `YYYY-MM-DD`, defaults to today
    pub checkout_date: Option<String>,
    /// `YYYY-MM-DD`, defaults to checkout + 14 days
    pub due_date: Option<String>,
}

/// Per-copy result of a borrow batch
#[derive(Debug, Serialize)]
pub struct BorrowItemResult {
    pub copy_id: i32,
    pub loan_id: Option<i32>,
    pub success: bool,
    pub message: String,
}

/// Result of a borrow action. All successful items share one
/// transaction id; failed items did not create a loan row.
#[derive(Debug, Serialize)]
pub struct BorrowOutcome {
    pub transaction_id: String,
    pub checkout_date: String,
    pub due_date: String,
    pub borrowed: usize,
    pub failed: usize,
    pub items: Vec<BorrowItemResult>,
}

/// Borrow copies for a member.
///
/// Validation happens before any write. Copies are then processed
/// independently: a copy that is not `available` fails on its own
/// without touching the others.
pub async fn borrow_copies(
    db: &DatabaseConnection,
    req: BorrowRequest,
) -> Result<BorrowOutcome, ServiceError> {
    if req.copy_ids.is_empty() {
        return Err(ServiceError::Validation("No copies selected".to_string()));
    }

    let member = Member::find_by_id(req.member_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Member {} not found", req.member_id)))?;

    if member.status != "active" {
        return Err(ServiceError::Validation(format!(
            "Member {} is not active and cannot borrow",
            member.name
        )));
    }

    let checkout_date = req.checkout_date.unwrap_or_else(today);
    let checkout = NaiveDate::parse_from_str(&checkout_date, "%Y-%m-%d").map_err(|_| {
        ServiceError::Validation(format!("Invalid checkout date '{}'", checkout_date))
    })?;

    let due_date = match req.due_date {
        Some(d) => {
            NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .map_err(|_| ServiceError::Validation(format!("Invalid due date '{}'", d)))?;
            d
        }
        None => (checkout + Duration::days(DEFAULT_LOAN_DAYS))
            .format("%Y-%m-%d")
            .to_string(),
    };

    let transaction_id = uuid::Uuid::new_v4().to_string();
    let mut items = Vec::with_capacity(req.copy_ids.len());

    for copy_id in req.copy_ids {
        let item = borrow_one(
            db,
            copy_id,
            req.member_id,
            &checkout_date,
            &due_date,
            &transaction_id,
        )
        .await;
        items.push(item);
    }

    let borrowed = items.iter().filter(|i| i.success).count();
    let failed = items.len() - borrowed;

    tracing::info!(
        "Borrow transaction {}: {} borrowed, {} failed",
        transaction_id,
        borrowed,
        failed
    );

    Ok(BorrowOutcome {
        transaction_id,
        checkout_date,
        due_date,
        borrowed,
        failed,
        items,
    })
}

async fn borrow_one(
    db: &DatabaseConnection,
    copy_id: i32,
    member_id: i32,
    checkout_date: &str,
    due_date: &str,
    transaction_id: &str,
) -> BorrowItemResult {
    let fail = |message: String| BorrowItemResult {
        copy_id,
        loan_id: None,
        success: false,
        message,
    };

    let copy = match BookCopy::find_by_id(copy_id).one(db).await {
        Ok(Some(copy)) => copy,
        Ok(None) => return fail(format!("Copy {} not found", copy_id)),
        Err(e) => return fail(format!("Database error: {}", e)),
    };

    if copy.status != "available" {
        return fail(format!(
            "Copy {} is currently {}",
            copy.barcode, copy.status
        ));
    }

    let now = now_rfc3339();
    let new_loan = loan::ActiveModel {
        copy_id: Set(copy_id),
        member_id: Set(member_id),
        checkout_date: Set(checkout_date.to_owned()),
        due_date: Set(due_date.to_owned()),
        return_date: Set(None),
        status: Set("borrowed".to_owned()),
        transaction_id: Set(Some(transaction_id.to_owned())),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    };

    let saved_loan = match new_loan.insert(db).await {
        Ok(l) => l,
        Err(e) => return fail(format!("Failed to create loan: {}", e)),
    };

    let mut copy_active: book_copy::ActiveModel = copy.into();
    copy_active.status = Set("checked_out".to_owned());
    copy_active.updated_at = Set(now);
    if let Err(e) = copy_active.update(db).await {
        return fail(format!("Failed to update copy status: {}", e));
    }

    BorrowItemResult {
        copy_id,
        loan_id: Some(saved_loan.id),
        success: true,
        message: "Borrowed".to_string(),
    }
}

/// Options captured at return time
#[derive(Debug, Default, Deserialize)]
pub struct ReturnOptions {
    /// `good` (default), `damaged` or `lost`
    pub condition: Option<String>,
    pub note: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
}

/// Result of a single return
#[derive(Debug, Serialize)]
pub struct ReturnOutcome {
    pub loan_id: i32,
    /// false when the loan was already returned (no-op)
    pub returned: bool,
    pub copy_status: Option<String>,
    pub message: String,
}

/// Return a loan.
///
/// Condition `good` puts the copy back in circulation; `damaged` and
/// `lost` take it out under the matching status. Returning an
/// already-returned loan is an idempotent no-op reported as such.
pub async fn return_loan(
    db: &DatabaseConnection,
    loan_id: i32,
    opts: ReturnOptions,
) -> Result<ReturnOutcome, ServiceError> {
    // Reject invalid conditions before any write
    let condition = opts.condition.as_deref().unwrap_or("good");
    let copy_status = match condition {
        "good" => "available",
        "damaged" => "damaged",
        "lost" => "lost",
        other => {
            return Err(ServiceError::Validation(format!(
                "Invalid return condition '{}'",
                other
            )));
        }
    };

    let loan = Loan::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Loan {} not found", loan_id)))?;

    if loan.status == "returned" || loan.return_date.is_some() {
        return Ok(ReturnOutcome {
            loan_id,
            returned: false,
            copy_status: None,
            message: format!("Loan {} is already returned", loan_id),
        });
    }

    let now = now_rfc3339();
    let mut loan_active: loan::ActiveModel = loan.clone().into();
    loan_active.return_date = Set(Some(today()));
    loan_active.status = Set("returned".to_owned());
    if opts.note.is_some() {
        loan_active.notes = Set(opts.note);
    }
    if opts.rating.is_some() {
        loan_active.rating = Set(opts.rating);
    }
    if opts.review.is_some() {
        loan_active.review = Set(opts.review);
    }
    loan_active.updated_at = Set(now.clone());
    loan_active.update(db).await?;

    let copy = BookCopy::find_by_id(loan.copy_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Associated copy not found".to_string()))?;

    let mut copy_active: book_copy::ActiveModel = copy.into();
    copy_active.status = Set(copy_status.to_owned());
    copy_active.updated_at = Set(now);
    copy_active.update(db).await?;

    Ok(ReturnOutcome {
        loan_id,
        returned: true,
        copy_status: Some(copy_status.to_string()),
        message: format!("Loan {} returned ({})", loan_id, condition),
    })
}

/// One item of a batch return
#[derive(Debug, Deserialize)]
pub struct BatchReturnItem {
    pub loan_id: i32,
    pub condition: Option<String>,
    pub note: Option<String>,
}

/// Per-item result of a batch return
#[derive(Debug, Serialize)]
pub struct BatchItemResult {
    pub loan_id: i32,
    pub success: bool,
    pub message: String,
}

/// Summary of a batch return
#[derive(Debug, Serialize)]
pub struct BatchReturnOutcome {
    pub returned: usize,
    pub skipped: usize,
    pub items: Vec<BatchItemResult>,
}

/// Return several loans; each item is processed independently by the
/// single-return rule.
pub async fn return_batch(
    db: &DatabaseConnection,
    items: Vec<BatchReturnItem>,
) -> Result<BatchReturnOutcome, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::Validation("No loans selected".to_string()));
    }

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        let opts = ReturnOptions {
            condition: item.condition,
            note: item.note,
            ..Default::default()
        };
        let result = match return_loan(db, item.loan_id, opts).await {
            Ok(outcome) => BatchItemResult {
                loan_id: item.loan_id,
                success: outcome.returned,
                message: outcome.message,
            },
            Err(e) => BatchItemResult {
                loan_id: item.loan_id,
                success: false,
                message: e.to_string(),
            },
        };
        results.push(result);
    }

    let returned = results.iter().filter(|r| r.success).count();
    let skipped = results.len() - returned;

    Ok(BatchReturnOutcome {
        returned,
        skipped,
        items: results,
    })
}

/// Summary of a return-by-code action
#[derive(Debug, Serialize)]
pub struct CodeReturnOutcome {
    pub returned: usize,
    pub skipped: usize,
    pub message: String,
    pub items: Vec<BatchItemResult>,
}

/// Return loans resolved from a scanned or manually entered code.
///
/// Unresolvable and already-returned loans are skipped, not fatal. A
/// payload that resolves to no loan ids at all is a decode failure.
pub async fn return_by_code(
    db: &DatabaseConnection,
    raw: &str,
) -> Result<CodeReturnOutcome, ServiceError> {
    let loan_ids = super::receipt_service::decode_payload(db, raw).await?;

    let mut results = Vec::with_capacity(loan_ids.len());
    for loan_id in loan_ids {
        let result = match return_loan(db, loan_id, ReturnOptions::default()).await {
            Ok(outcome) => BatchItemResult {
                loan_id,
                success: outcome.returned,
                message: outcome.message,
            },
            Err(e) => BatchItemResult {
                loan_id,
                success: false,
                message: e.to_string(),
            },
        };
        results.push(result);
    }

    let returned = results.iter().filter(|r| r.success).count();
    let skipped = results.len() - returned;

    Ok(CodeReturnOutcome {
        returned,
        skipped,
        message: format!("Returned {} loan(s), skipped {}", returned, skipped),
        items: results,
    })
}

/// Result of the administrative clear-all operation
#[derive(Debug, Serialize)]
pub struct ClearOutcome {
    pub loans_deleted: u64,
    pub copies_reset: u64,
}

/// Delete every loan row and put all checked-out copies back on the
/// shelf. Irreversible; confirmation is the UI's concern.
pub async fn clear_all_loans(db: &DatabaseConnection) -> Result<ClearOutcome, ServiceError> {
    let copies_reset = BookCopy::update_many()
        .col_expr(
            book_copy::Column::Status,
            sea_orm::sea_query::Expr::value("available"),
        )
        .col_expr(
            book_copy::Column::UpdatedAt,
            sea_orm::sea_query::Expr::value(now_rfc3339()),
        )
        .filter(book_copy::Column::Status.eq("checked_out"))
        .exec(db)
        .await?
        .rows_affected;

    let loans_deleted = Loan::delete_many().exec(db).await?.rows_affected;

    tracing::warn!(
        "Cleared all loans: {} deleted, {} copies reset",
        loans_deleted,
        copies_reset
    );

    Ok(ClearOutcome {
        loans_deleted,
        copies_reset,
    })
}
