//! Availability updater: the only place borrowing touches inventory

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookId},
    repository::{BookStore, StockChange},
};

/// Copies taken off the shelf for one borrow
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    /// Book state right after the decrement
    pub book: Book,
    pub quantity: i32,
    /// This reservation emptied the shelf
    pub exhausted: bool,
}

/// Take `quantity` copies of a book.
///
/// Fails with `NotFound` when the book does not exist and with
/// `InsufficientStock` (leaving the book untouched) when fewer than
/// `quantity` copies remain. The check and the decrement are one
/// conditional write in the store, so concurrent reservations can never
/// drive `copies` below zero.
pub async fn reserve_copies(store: &dyn BookStore, book_id: BookId, quantity: i32) -> AppResult<Reservation> {
    if quantity < 1 {
        return Err(AppError::Validation("quantity must be at least 1".to_string()));
    }

    match store.take_copies(book_id, quantity).await? {
        StockChange::Taken(book) => {
            let exhausted = book.copies == 0;
            tracing::info!(
                book_id = %book.id,
                quantity,
                remaining = book.copies,
                available = book.available,
                "Reserved copies"
            );
            Ok(Reservation {
                book,
                quantity,
                exhausted,
            })
        }
        StockChange::Insufficient { available } => {
            tracing::warn!(%book_id, requested = quantity, available, "Not enough copies to reserve");
            Err(AppError::InsufficientStock {
                requested: quantity,
                available,
            })
        }
        StockChange::Missing => Err(AppError::NotFound("Book not found".to_string())),
    }
}

/// Undo a reservation whose ledger entry could not be written
pub async fn release_copies(store: &dyn BookStore, reservation: &Reservation) -> AppResult<Book> {
    let book = store
        .return_copies(reservation.book.id, reservation.quantity, reservation.exhausted)
        .await?;
    tracing::info!(
        book_id = %book.id,
        quantity = reservation.quantity,
        copies = book.copies,
        "Released reserved copies"
    );
    Ok(book)
}
