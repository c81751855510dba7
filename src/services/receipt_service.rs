//! Receipt / QR identity layer
//!
//! A completed borrow transaction is rendered two ways: a printable
//! receipt (member info, per-book barcode and location, due date) and a
//! scannable code whose payload resolves back to loan ids at return
//! time.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use qrcode::QrCode;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::book::Entity as Book;
use crate::models::book_copy::{self, Entity as BookCopy};
use crate::models::loan::{self, Entity as Loan};
use crate::models::member::Entity as Member;

use super::ServiceError;

/// Type tag carried by every encoded payload.
pub const PAYLOAD_TYPE: &str = "loan_receipt";

/// Scannable payload. The minimal form carries only the type tag and
/// transaction id; everything else is optional so both forms decode
/// through the same struct.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptPayload {
    pub t: String,
    pub tid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loan_ids: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl ReceiptPayload {
    fn minimal(tid: &str) -> Self {
        Self {
            t: PAYLOAD_TYPE.to_string(),
            tid: tid.to_string(),
            member_id: None,
            member_name: None,
            loan_ids: Vec::new(),
            checkout_date: None,
            due_date: None,
        }
    }
}

/// One line of the printable receipt
#[derive(Debug, Serialize)]
pub struct ReceiptLine {
    pub loan_id: i32,
    pub title: String,
    pub author: String,
    pub barcode: String,
    pub location_code: Option<String>,
}

/// Printable receipt for one borrow transaction
#[derive(Debug, Serialize)]
pub struct Receipt {
    pub transaction_id: String,
    pub member_id: i32,
    pub member_name: String,
    pub member_email: Option<String>,
    pub checkout_date: String,
    pub due_date: String,
    pub lines: Vec<ReceiptLine>,
}

/// Receipt plus its encoded QR image. `warning` is set when the full
/// payload did not fit and the minimal fallback was encoded instead.
#[derive(Debug, Serialize)]
pub struct EncodedReceipt {
    pub receipt: Receipt,
    pub qr_data_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Build the printable receipt for a borrow transaction.
pub async fn build_receipt(
    db: &DatabaseConnection,
    transaction_id: &str,
) -> Result<Receipt, ServiceError> {
    let loans = Loan::find()
        .filter(loan::Column::TransactionId.eq(transaction_id))
        .order_by_asc(loan::Column::Id)
        .all(db)
        .await?;

    let first = loans.first().ok_or_else(|| {
        ServiceError::NotFound(format!("No loans for transaction {}", transaction_id))
    })?;

    let member = Member::find_by_id(first.member_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Member not found".to_string()))?;

    // Resolve copies and their books in one pass
    let copy_ids: Vec<i32> = loans.iter().map(|l| l.copy_id).collect();
    let copies_with_books = BookCopy::find()
        .filter(book_copy::Column::Id.is_in(copy_ids))
        .find_also_related(Book)
        .all(db)
        .await?;

    let mut copy_map: HashMap<i32, (book_copy::Model, Option<crate::models::book::Model>)> =
        HashMap::new();
    for (copy, book) in copies_with_books {
        copy_map.insert(copy.id, (copy, book));
    }

    let lines = loans
        .iter()
        .map(|l| {
            let (barcode, location_code, title, author) = match copy_map.get(&l.copy_id) {
                Some((copy, book)) => (
                    copy.barcode.clone(),
                    copy.location_code.clone(),
                    book.as_ref()
                        .map(|b| b.title.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    book.as_ref().map(|b| b.author.clone()).unwrap_or_default(),
                ),
                None => (String::new(), None, "Unknown".to_string(), String::new()),
            };
            ReceiptLine {
                loan_id: l.id,
                title,
                author,
                barcode,
                location_code,
            }
        })
        .collect();

    Ok(Receipt {
        transaction_id: transaction_id.to_string(),
        member_id: member.id,
        member_name: member.name,
        member_email: member.email,
        checkout_date: first.checkout_date.clone(),
        due_date: first.due_date.clone(),
        lines,
    })
}

/// Encode a payload string into a PNG QR code as a base64 data URL.
pub fn encode_qr(payload: &str) -> Result<String, String> {
    let code = QrCode::new(payload.as_bytes()).map_err(|e| e.to_string())?;
    let img = code
        .render::<image::Luma<u8>>()
        .min_dimensions(240, 240)
        .build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| e.to_string())?;

    Ok(format!("data:image/png;base64,{}", BASE64.encode(&png)))
}

/// Build the receipt together with its QR code.
///
/// If the full payload cannot be encoded, fall back to the minimal
/// payload (type tag + transaction id) and surface a warning instead of
/// blocking the receipt.
pub async fn receipt_with_qr(
    db: &DatabaseConnection,
    transaction_id: &str,
) -> Result<EncodedReceipt, ServiceError> {
    let receipt = build_receipt(db, transaction_id).await?;

    let payload = ReceiptPayload {
        t: PAYLOAD_TYPE.to_string(),
        tid: receipt.transaction_id.clone(),
        member_id: Some(receipt.member_id),
        member_name: Some(receipt.member_name.clone()),
        loan_ids: receipt.lines.iter().map(|l| l.loan_id).collect(),
        checkout_date: Some(receipt.checkout_date.clone()),
        due_date: Some(receipt.due_date.clone()),
    };

    let full_json = serde_json::to_string(&payload)
        .map_err(|e| ServiceError::Validation(format!("Failed to serialize payload: {}", e)))?;

    match encode_qr(&full_json) {
        Ok(url) => Ok(EncodedReceipt {
            receipt,
            qr_data_url: Some(url),
            warning: None,
        }),
        Err(full_err) => {
            tracing::warn!(
                "Full receipt payload encoding failed ({}), falling back to minimal payload",
                full_err
            );
            let minimal = ReceiptPayload::minimal(transaction_id);
            let minimal_json = serde_json::to_string(&minimal).map_err(|e| {
                ServiceError::Validation(format!("Failed to serialize payload: {}", e))
            })?;
            match encode_qr(&minimal_json) {
                Ok(url) => Ok(EncodedReceipt {
                    receipt,
                    qr_data_url: Some(url),
                    warning: Some(
                        "Full receipt data did not fit in the code; scan resolves via transaction id only"
                            .to_string(),
                    ),
                }),
                Err(e) => Ok(EncodedReceipt {
                    receipt,
                    qr_data_url: None,
                    warning: Some(format!("Could not generate QR code: {}", e)),
                }),
            }
        }
    }
}

async fn loans_by_transaction(
    db: &DatabaseConnection,
    transaction_id: &str,
) -> Result<Vec<i32>, ServiceError> {
    let loans = Loan::find()
        .filter(loan::Column::TransactionId.eq(transaction_id))
        .all(db)
        .await?;
    Ok(loans.into_iter().map(|l| l.id).collect())
}

/// Decode a scanned or manually entered payload into loan ids.
///
/// Resolution order: full JSON payload with loan ids, JSON payload with
/// only a transaction id, a raw uuid-looking string treated as a
/// transaction id, a bare integer treated as one loan id. Anything else
/// is a decode failure.
pub async fn decode_payload(db: &DatabaseConnection, raw: &str) -> Result<Vec<i32>, ServiceError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ServiceError::Validation("Empty code".to_string()));
    }

    if let Ok(payload) = serde_json::from_str::<ReceiptPayload>(raw) {
        if !payload.loan_ids.is_empty() {
            return Ok(payload.loan_ids);
        }
        let ids = loans_by_transaction(db, &payload.tid).await?;
        if ids.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No loans for transaction {}",
                payload.tid
            )));
        }
        return Ok(ids);
    }

    if uuid::Uuid::parse_str(raw).is_ok() {
        let ids = loans_by_transaction(db, raw).await?;
        if !ids.is_empty() {
            return Ok(ids);
        }
        return Err(ServiceError::NotFound(format!(
            "No loans for transaction {}",
            raw
        )));
    }

    // Best effort: a bare integer is treated as a loan id
    if let Ok(id) = raw.parse::<i32>() {
        return Ok(vec![id]);
    }

    Err(ServiceError::Validation(
        "Could not decode the scanned code".to_string(),
    ))
}
