//! Catalog management service

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::book::{Book, BookId, BookListOptions, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, config: CatalogConfig) -> Self {
        Self { repository, config }
    }

    /// Validate and store a new book
    pub async fn create_book(&self, request: CreateBook) -> AppResult<Book> {
        let new_book = request.into_new_book()?;
        let book = self.repository.books.create(new_book).await?;
        tracing::info!(book_id = %book.id, isbn = %book.isbn, "{} book saved successfully", book.title);
        Ok(book)
    }

    /// List books matching the query
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let options = self.list_options(query)?;
        self.repository.books.list(&options).await
    }

    pub async fn get_book(&self, id: BookId) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Merge the given fields into an existing book
    pub async fn update_book(&self, id: BookId, changes: UpdateBook) -> AppResult<Book> {
        let changes = changes.validated()?;
        let book = self.repository.books.update_by_id(id, &changes).await?;
        tracing::info!(book_id = %book.id, "{} book updated", book.title);
        Ok(book)
    }

    /// Delete a book. Ledger entries that reference it are kept.
    pub async fn delete_book(&self, id: BookId) -> AppResult<Book> {
        let book = self.repository.books.delete_by_id(id).await?;
        tracing::info!(book_id = %book.id, "{} book deleted", book.title);
        Ok(book)
    }

    fn list_options(&self, query: &BookQuery) -> AppResult<BookListOptions> {
        if let Some(limit) = query.limit {
            if limit < 1 {
                return Err(AppError::Validation("limit must be at least 1".to_string()));
            }
        }

        Ok(BookListOptions {
            genre: query.filter,
            sort: query
                .sort_by
                .map(|field| (field, query.sort.unwrap_or_default())),
            limit: self.config.effective_limit(query.limit),
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::book::{Genre, SortDirection, SortField};

    fn service() -> CatalogService {
        CatalogService::new(Repository::in_memory(), CatalogConfig::default())
    }

    fn create_request(title: &str, isbn: &str, copies: i32) -> CreateBook {
        CreateBook {
            title: Some(title.into()),
            author: Some("Frank Herbert".into()),
            genre: Some(Genre::Fiction),
            isbn: Some(isbn.into()),
            description: Some("Desert planet".into()),
            copies: Some(copies),
            available: None,
        }
    }

    #[test]
    fn test_list_options_resolution() {
        let service = service();

        let options = service.list_options(&BookQuery::default()).unwrap();
        assert_eq!(options.limit, 10);
        assert_eq!(options.sort, None);

        let options = service
            .list_options(&BookQuery {
                filter: Some(Genre::Science),
                sort_by: Some(SortField::Title),
                sort: None,
                limit: Some(500),
            })
            .unwrap();
        assert_eq!(options.genre, Some(Genre::Science));
        assert_eq!(options.sort, Some((SortField::Title, SortDirection::Asc)));
        assert_eq!(options.limit, 100);

        // Direction alone does not impose an order
        let options = service
            .list_options(&BookQuery {
                sort: Some(SortDirection::Desc),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(options.sort, None);

        let err = service
            .list_options(&BookQuery {
                limit: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let service = service();

        let created = service.create_book(create_request("Dune", "9780441172719", 4)).await.unwrap();
        let fetched = service.get_book(created.id).await.unwrap();
        assert_eq!(fetched, created);

        let updated = service
            .update_book(
                created.id,
                UpdateBook {
                    copies: Some(7),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.copies, 7);
        assert_eq!(updated.title, "Dune");

        let deleted = service.delete_book(created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(matches!(service.get_book(created.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_validation_runs_before_store() {
        let service = service();
        let err = service
            .update_book(
                Uuid::new_v4(),
                UpdateBook {
                    copies: Some(-3),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidFields(_)));
    }
}
