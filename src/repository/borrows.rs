//! Borrow ledger repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::BorrowStore;
use crate::{
    error::AppResult,
    models::borrow::{Borrow, BorrowSummary, BorrowSummaryRow, NewBorrow},
};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowStore for BorrowsRepository {
    async fn create(&self, borrow: NewBorrow) -> AppResult<Borrow> {
        let row = sqlx::query_as::<_, Borrow>(
            r#"
            INSERT INTO borrows (id, book_id, quantity, due_date, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(borrow.book_id)
        .bind(borrow.quantity)
        .bind(borrow.due_date)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn summary(&self) -> AppResult<Vec<BorrowSummary>> {
        // Inner join: entries whose book was deleted are left out
        let rows = sqlx::query_as::<_, BorrowSummaryRow>(
            r#"
            SELECT b.title, b.isbn, SUM(br.quantity)::BIGINT AS total_quantity
            FROM borrows br
            JOIN books b ON b.id = br.book_id
            GROUP BY br.book_id, b.title, b.isbn
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BorrowSummary::from).collect())
    }
}
