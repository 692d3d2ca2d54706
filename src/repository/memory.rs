//! In-process catalog and ledger
//!
//! One [`InMemoryStore`] implements both [`BookStore`] and [`BorrowStore`]
//! over shared state, so clones handed to the two halves of a
//! [`Repository`](super::Repository) see each other's writes. Every
//! operation holds the lock for its whole read-modify-write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BookStore, BorrowStore, StockChange};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookId, BookListOptions, NewBook, SortDirection, UpdateBook},
        borrow::{Borrow, BorrowSummary, BorrowedBook, NewBorrow},
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    /// Insertion order doubles as natural list order
    books: IndexMap<BookId, Book>,
    borrows: Vec<Borrow>,
}

impl MemoryState {
    fn isbn_taken(&self, isbn: &str, except: Option<BookId>) -> bool {
        self.books
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != except)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[cfg(test)]
impl InMemoryStore {
    /// Ledger entries referencing one book, oldest first
    pub(crate) async fn list_for_book(&self, book_id: BookId) -> Vec<Borrow> {
        let state = self.state.lock().await;
        state
            .borrows
            .iter()
            .filter(|b| b.book == book_id)
            .cloned()
            .collect()
    }
}

fn book_not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}

#[async_trait]
impl BookStore for InMemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn create(&self, book: NewBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        if state.isbn_taken(&book.isbn, None) {
            return Err(AppError::DuplicateIsbn(book.isbn));
        }

        let book = book.into_book(Uuid::new_v4(), Utc::now());
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn list(&self, options: &BookListOptions) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| options.genre.map_or(true, |g| b.genre == g))
            .cloned()
            .collect();

        if let Some((field, direction)) = options.sort {
            books.sort_by(|a, b| match direction {
                SortDirection::Asc => field.compare(a, b),
                SortDirection::Desc => field.compare(b, a),
            });
        }

        books.truncate(usize::try_from(options.limit).unwrap_or(0));
        Ok(books)
    }

    async fn get_by_id(&self, id: BookId) -> AppResult<Book> {
        let state = self.state.lock().await;
        state.books.get(&id).cloned().ok_or_else(book_not_found)
    }

    async fn update_by_id(&self, id: BookId, changes: &UpdateBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        if !state.books.contains_key(&id) {
            return Err(book_not_found());
        }
        if let Some(ref isbn) = changes.isbn {
            if state.isbn_taken(isbn, Some(id)) {
                return Err(AppError::DuplicateIsbn(isbn.clone()));
            }
        }

        let book = state.books.get_mut(&id).ok_or_else(book_not_found)?;
        changes.apply_to(book);
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    async fn delete_by_id(&self, id: BookId) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        state.books.shift_remove(&id).ok_or_else(book_not_found)
    }

    async fn take_copies(&self, id: BookId, quantity: i32) -> AppResult<StockChange> {
        let mut state = self.state.lock().await;
        let Some(book) = state.books.get_mut(&id) else {
            return Ok(StockChange::Missing);
        };

        if book.copies < quantity {
            return Ok(StockChange::Insufficient { available: book.copies });
        }

        book.copies -= quantity;
        if book.copies == 0 {
            book.available = false;
        }
        book.updated_at = Utc::now();
        Ok(StockChange::Taken(book.clone()))
    }

    async fn return_copies(&self, id: BookId, quantity: i32, restore_available: bool) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        let book = state.books.get_mut(&id).ok_or_else(book_not_found)?;

        book.copies += quantity;
        if restore_available {
            book.available = true;
        }
        book.updated_at = Utc::now();
        Ok(book.clone())
    }
}

#[async_trait]
impl BorrowStore for InMemoryStore {
    async fn create(&self, borrow: NewBorrow) -> AppResult<Borrow> {
        let mut state = self.state.lock().await;
        let borrow = borrow.into_borrow(Uuid::new_v4(), Utc::now());
        state.borrows.push(borrow.clone());
        Ok(borrow)
    }

    async fn summary(&self) -> AppResult<Vec<BorrowSummary>> {
        let state = self.state.lock().await;

        let mut totals: IndexMap<BookId, i64> = IndexMap::new();
        for borrow in &state.borrows {
            *totals.entry(borrow.book).or_insert(0) += i64::from(borrow.quantity);
        }

        Ok(totals
            .into_iter()
            .filter_map(|(book_id, total_quantity)| {
                state.books.get(&book_id).map(|book| BorrowSummary {
                    book: BorrowedBook {
                        title: book.title.clone(),
                        isbn: book.isbn.clone(),
                    },
                    total_quantity,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::book::{Genre, SortField};

    fn new_book(title: &str, isbn: &str, genre: Genre, copies: i32) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Author".to_string(),
            genre,
            isbn: isbn.to_string(),
            description: None,
            copies,
            available: true,
        }
    }

    fn all(limit: i64) -> BookListOptions {
        BookListOptions {
            genre: None,
            sort: None,
            limit,
        }
    }

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let store = InMemoryStore::default();
        let created = BookStore::create(&store, new_book("Dune", "1", Genre::Fiction, 3))
            .await
            .unwrap();

        let fetched = store.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_isbn_rejected_on_create_and_update() {
        let store = InMemoryStore::default();
        BookStore::create(&store, new_book("A", "111", Genre::Fiction, 1)).await.unwrap();
        let second = BookStore::create(&store, new_book("B", "222", Genre::Fiction, 1))
            .await
            .unwrap();

        let dup = BookStore::create(&store, new_book("C", "111", Genre::Fiction, 1)).await;
        assert!(matches!(dup, Err(AppError::DuplicateIsbn(_))));

        let changes = UpdateBook {
            isbn: Some("111".into()),
            ..Default::default()
        };
        let dup = store.update_by_id(second.id, &changes).await;
        assert!(matches!(dup, Err(AppError::DuplicateIsbn(_))));

        // Keeping one's own isbn is fine
        let changes = UpdateBook {
            isbn: Some("222".into()),
            ..Default::default()
        };
        assert!(store.update_by_id(second.id, &changes).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_limits() {
        let store = InMemoryStore::default();
        BookStore::create(&store, new_book("Cosmos", "1", Genre::Science, 4)).await.unwrap();
        BookStore::create(&store, new_book("Brief History", "2", Genre::Science, 9)).await.unwrap();
        BookStore::create(&store, new_book("Emma", "3", Genre::Fiction, 1)).await.unwrap();

        let natural = store.list(&all(10)).await.unwrap();
        let titles: Vec<_> = natural.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["Cosmos", "Brief History", "Emma"]);

        let science_by_copies_desc = store
            .list(&BookListOptions {
                genre: Some(Genre::Science),
                sort: Some((SortField::Copies, SortDirection::Desc)),
                limit: 10,
            })
            .await
            .unwrap();
        let titles: Vec<_> = science_by_copies_desc.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["Brief History", "Cosmos"]);

        assert_eq!(store.list(&all(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_book_operations() {
        let store = InMemoryStore::default();
        let id = Uuid::new_v4();
        assert!(matches!(store.get_by_id(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            store.update_by_id(id, &UpdateBook::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(store.delete_by_id(id).await, Err(AppError::NotFound(_))));
        assert_eq!(store.take_copies(id, 1).await.unwrap(), StockChange::Missing);
    }

    #[tokio::test]
    async fn test_take_copies_flips_availability_at_zero() {
        let store = InMemoryStore::default();
        let book = BookStore::create(&store, new_book("Dune", "1", Genre::Fiction, 3))
            .await
            .unwrap();

        match store.take_copies(book.id, 2).await.unwrap() {
            StockChange::Taken(b) => {
                assert_eq!(b.copies, 1);
                assert!(b.available);
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert_eq!(
            store.take_copies(book.id, 2).await.unwrap(),
            StockChange::Insufficient { available: 1 }
        );

        match store.take_copies(book.id, 1).await.unwrap() {
            StockChange::Taken(b) => {
                assert_eq!(b.copies, 0);
                assert!(!b.available);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let restored = store.return_copies(book.id, 1, true).await.unwrap();
        assert_eq!(restored.copies, 1);
        assert!(restored.available);
    }

    #[tokio::test]
    async fn test_summary_groups_per_book_and_skips_deleted() {
        let store = InMemoryStore::default();
        let kept = BookStore::create(&store, new_book("Kept", "1", Genre::History, 10))
            .await
            .unwrap();
        let gone = BookStore::create(&store, new_book("Gone", "2", Genre::History, 10))
            .await
            .unwrap();

        for (book_id, quantity) in [(kept.id, 2), (gone.id, 1), (kept.id, 3)] {
            BorrowStore::create(
                &store,
                NewBorrow {
                    book_id,
                    quantity,
                    due_date: due(),
                },
            )
            .await
            .unwrap();
        }
        store.delete_by_id(gone.id).await.unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].book.title, "Kept");
        assert_eq!(summary[0].total_quantity, 5);

        // Ledger entries for the deleted book are still there
        assert_eq!(store.list_for_book(gone.id).await.len(), 1);
    }
}
