//! Borrow (ledger entry) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::book::{parse_book_id, BookId};
use crate::error::{AppError, AppResult};

/// Immutable record of a completed borrow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Borrow {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Borrowed book; not guaranteed to still exist
    #[sqlx(rename = "book_id")]
    pub book: BookId,
    pub quantity: i32,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Borrow request body as received
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    /// Id of the book to borrow
    #[validate(
        required(message = "book is required"),
        custom(function = "validate_book_reference")
    )]
    pub book: Option<String>,
    #[validate(
        required(message = "quantity is required"),
        range(min = 1, message = "Must be a positive integer")
    )]
    pub quantity: Option<i32>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp
    #[serde(rename = "dueDate")]
    #[validate(
        required(message = "dueDate is required"),
        custom(function = "validate_due_date")
    )]
    pub due_date: Option<String>,
}

/// Validated ledger insert payload
#[derive(Debug, Clone, PartialEq)]
pub struct NewBorrow {
    pub book_id: BookId,
    pub quantity: i32,
    pub due_date: NaiveDate,
}

impl BorrowRequest {
    /// Run field validation and produce the typed ledger payload
    pub fn into_new_borrow(self) -> AppResult<NewBorrow> {
        self.validate()?;

        let book = self
            .book
            .ok_or_else(|| AppError::Validation("book is required".to_string()))?;
        let quantity = self
            .quantity
            .ok_or_else(|| AppError::Validation("quantity is required".to_string()))?;
        let due_date = self
            .due_date
            .as_deref()
            .and_then(parse_due_date)
            .ok_or_else(|| AppError::Validation("dueDate must be a valid date".to_string()))?;

        Ok(NewBorrow {
            book_id: parse_book_id(&book)?,
            quantity,
            due_date,
        })
    }
}

impl NewBorrow {
    pub fn into_borrow(self, id: Uuid, now: DateTime<Utc>) -> Borrow {
        Borrow {
            id,
            book: self.book_id,
            quantity: self.quantity,
            due_date: self.due_date,
            created_at: now,
        }
    }
}

/// Accepts a calendar date or a full timestamp, keeping only the date
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

fn validate_due_date(value: &str) -> Result<(), ValidationError> {
    match parse_due_date(value) {
        Some(_) => Ok(()),
        None => {
            let mut err = ValidationError::new("date");
            err.message = Some("dueDate must be a valid date".into());
            Err(err)
        }
    }
}

fn validate_book_reference(value: &str) -> Result<(), ValidationError> {
    match Uuid::parse_str(value.trim()) {
        Ok(_) => Ok(()),
        Err(_) => {
            let mut err = ValidationError::new("book_id");
            err.message = Some("book must be a valid book id".into());
            Err(err)
        }
    }
}

/// Title and isbn of a borrowed book, as shown in the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BorrowedBook {
    pub title: String,
    pub isbn: String,
}

/// Total borrowed quantity for one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummary {
    pub book: BorrowedBook,
    pub total_quantity: i64,
}

/// Row shape of the summary aggregation
#[derive(Debug, FromRow)]
pub struct BorrowSummaryRow {
    pub title: String,
    pub isbn: String,
    pub total_quantity: i64,
}

impl From<BorrowSummaryRow> for BorrowSummary {
    fn from(row: BorrowSummaryRow) -> Self {
        Self {
            book: BorrowedBook {
                title: row.title,
                isbn: row.isbn,
            },
            total_quantity: row.total_quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(book: &str, quantity: i32, due_date: &str) -> BorrowRequest {
        BorrowRequest {
            book: Some(book.to_string()),
            quantity: Some(quantity),
            due_date: Some(due_date.to_string()),
        }
    }

    #[test]
    fn test_parse_due_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 7, 18).unwrap();
        assert_eq!(parse_due_date("2025-07-18"), Some(expected));
        assert_eq!(parse_due_date("2025-07-18T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_due_date("2025-07-18T10:30:00+02:00"), Some(expected));
        assert_eq!(parse_due_date("18/07/2025"), None);
        assert_eq!(parse_due_date("2025-02-30"), None);
    }

    #[test]
    fn test_valid_request_becomes_new_borrow() {
        let id = Uuid::new_v4();
        let borrow = request(&id.to_string(), 2, "2025-07-18").into_new_borrow().unwrap();
        assert_eq!(borrow.book_id, id);
        assert_eq!(borrow.quantity, 2);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let err = request(&Uuid::new_v4().to_string(), 0, "2025-07-18")
            .into_new_borrow()
            .unwrap_err();
        match err {
            AppError::InvalidFields(errors) => assert!(errors.field_errors().contains_key("quantity")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_date_and_book_rejected() {
        let err = request("nope", 1, "tomorrow").into_new_borrow().unwrap_err();
        match err {
            AppError::InvalidFields(errors) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("book"));
                assert!(fields.contains_key("dueDate"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_rejected() {
        let err = BorrowRequest::default().into_new_borrow().unwrap_err();
        match err {
            AppError::InvalidFields(errors) => assert_eq!(errors.field_errors().len(), 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_summary_wire_names() {
        let summary = BorrowSummary {
            book: BorrowedBook {
                title: "Dune".into(),
                isbn: "9780441172719".into(),
            },
            total_quantity: 5,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["totalQuantity"], 5);
        assert_eq!(value["book"]["title"], "Dune");
    }
}
