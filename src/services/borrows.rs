//! Borrow management service

use crate::{
    error::AppResult,
    models::borrow::{Borrow, BorrowRequest, BorrowSummary},
    repository::Repository,
};

use super::availability;

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
}

impl BorrowsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow copies of a book.
    ///
    /// The ledger entry is written only after the copies were reserved; if the
    /// write fails the reservation is released again.
    pub async fn borrow(&self, request: BorrowRequest) -> AppResult<Borrow> {
        let new_borrow = request.into_new_borrow()?;

        let reservation = availability::reserve_copies(
            self.repository.books.as_ref(),
            new_borrow.book_id,
            new_borrow.quantity,
        )
        .await?;

        match self.repository.borrows.create(new_borrow).await {
            Ok(borrow) => {
                tracing::info!(
                    borrow_id = %borrow.id,
                    book_id = %borrow.book,
                    quantity = borrow.quantity,
                    due_date = %borrow.due_date,
                    "Borrow recorded"
                );
                Ok(borrow)
            }
            Err(err) => {
                tracing::error!(book_id = %reservation.book.id, "Failed to record borrow: {}", err);
                if let Err(release_err) =
                    availability::release_copies(self.repository.books.as_ref(), &reservation).await
                {
                    tracing::error!(
                        book_id = %reservation.book.id,
                        quantity = reservation.quantity,
                        "Failed to release reserved copies: {}",
                        release_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Total borrowed quantity per book
    pub async fn summary(&self) -> AppResult<Vec<BorrowSummary>> {
        self.repository.borrows.summary().await
    }
}
