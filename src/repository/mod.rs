//! Repository layer for catalog and ledger persistence
//!
//! The catalog and the ledger are reached through the [`BookStore`] and
//! [`BorrowStore`] traits. PostgreSQL adapters back the running server; the
//! in-memory adapter backs development runs and the test suite.

pub mod books;
pub mod borrows;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookId, BookListOptions, NewBook, UpdateBook},
        borrow::{Borrow, BorrowSummary, NewBorrow},
    },
};

/// Outcome of a conditional stock decrement
#[derive(Debug, Clone, PartialEq)]
pub enum StockChange {
    /// Copies were taken; holds the book as persisted afterwards
    Taken(Book),
    /// The book exists but holds fewer copies than requested
    Insufficient { available: i32 },
    /// No book with that id
    Missing,
}

/// Book catalog persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Check that the backing store answers
    async fn ping(&self) -> AppResult<()>;

    async fn create(&self, book: NewBook) -> AppResult<Book>;

    async fn list(&self, options: &BookListOptions) -> AppResult<Vec<Book>>;

    async fn get_by_id(&self, id: BookId) -> AppResult<Book>;

    async fn update_by_id(&self, id: BookId, changes: &UpdateBook) -> AppResult<Book>;

    /// Remove a book, returning it as it was
    async fn delete_by_id(&self, id: BookId) -> AppResult<Book>;

    /// Decrement `copies` by `quantity` only if at least that many remain,
    /// clearing `available` when the shelf empties. Single atomic step.
    async fn take_copies(&self, id: BookId, quantity: i32) -> AppResult<StockChange>;

    /// Put `quantity` copies back, setting `available` again when asked
    async fn return_copies(&self, id: BookId, quantity: i32, restore_available: bool) -> AppResult<Book>;
}

/// Borrow ledger persistence (append-only)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowStore: Send + Sync {
    async fn create(&self, borrow: NewBorrow) -> AppResult<Borrow>;

    /// Total borrowed quantity per book still present in the catalog
    async fn summary(&self) -> AppResult<Vec<BorrowSummary>>;
}

/// Main repository struct holding the catalog and ledger stores
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub borrows: Arc<dyn BorrowStore>,
}

impl Repository {
    /// Create a PostgreSQL-backed repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            borrows: Arc::new(borrows::BorrowsRepository::new(pool)),
        }
    }

    /// Create a repository whose catalog and ledger live in process memory
    pub fn in_memory() -> Self {
        let store = memory::InMemoryStore::default();
        Self {
            books: Arc::new(store.clone()),
            borrows: Arc::new(store),
        }
    }

    pub fn from_stores(books: Arc<dyn BookStore>, borrows: Arc<dyn BorrowStore>) -> Self {
        Self { books, borrows }
    }
}
