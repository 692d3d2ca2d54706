//! Books repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{BookStore, StockChange};
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookId, BookListOptions, BookRow, NewBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn book_not_found(id: BookId) -> AppError {
    tracing::debug!(%id, "book lookup missed");
    AppError::NotFound("Book not found".to_string())
}

/// Turn a unique violation on `isbn` into a validation failure
fn map_write_error(err: sqlx::Error, isbn: Option<&str>) -> AppError {
    if let sqlx::Error::Database(ref db) = err {
        if db.is_unique_violation() {
            return AppError::DuplicateIsbn(isbn.unwrap_or_default().to_string());
        }
        if db.is_check_violation() {
            return AppError::Validation(db.message().to_string());
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create(&self, book: NewBook) -> AppResult<Book> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (id, title, author, genre, isbn, description, copies, available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.genre.as_str())
        .bind(&book.isbn)
        .bind(&book.description)
        .bind(book.copies)
        .bind(book.available)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Some(book.isbn.as_str())))?;

        row.try_into()
    }

    async fn list(&self, options: &BookListOptions) -> AppResult<Vec<Book>> {
        let mut query = String::from("SELECT * FROM books");
        let mut idx = 1;

        if options.genre.is_some() {
            query.push_str(&format!(" WHERE genre = ${}", idx));
            idx += 1;
        }

        // Sort columns come from a closed enum, never from raw input
        match options.sort {
            Some((field, direction)) => query.push_str(&format!(
                " ORDER BY {} {}, created_at ASC",
                field.column(),
                direction.as_sql()
            )),
            None => query.push_str(" ORDER BY created_at ASC"),
        }

        query.push_str(&format!(" LIMIT ${}", idx));

        let mut builder = sqlx::query_as::<_, BookRow>(&query);
        if let Some(genre) = options.genre {
            builder = builder.bind(genre.as_str());
        }
        builder = builder.bind(options.limit);

        builder
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Book::try_from)
            .collect()
    }

    async fn get_by_id(&self, id: BookId) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| book_not_found(id))?
            .try_into()
    }

    async fn update_by_id(&self, id: BookId, changes: &UpdateBook) -> AppResult<Book> {
        let now = Utc::now();
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(changes.title, "title");
        add_field!(changes.author, "author");
        add_field!(changes.genre, "genre");
        add_field!(changes.isbn, "isbn");
        add_field!(changes.description, "description");
        add_field!(changes.copies, "copies");
        add_field!(changes.available, "available");

        let query = format!(
            "UPDATE books SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            idx
        );

        let mut builder = sqlx::query_as::<_, BookRow>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(changes.title);
        bind_field!(changes.author);
        if let Some(genre) = changes.genre {
            builder = builder.bind(genre.as_str());
        }
        bind_field!(changes.isbn);
        bind_field!(changes.description);
        bind_field!(changes.copies);
        bind_field!(changes.available);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, changes.isbn.as_deref()))?
            .ok_or_else(|| book_not_found(id))?
            .try_into()
    }

    async fn delete_by_id(&self, id: BookId) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>("DELETE FROM books WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| book_not_found(id))?
            .try_into()
    }

    async fn take_copies(&self, id: BookId, quantity: i32) -> AppResult<StockChange> {
        // SET expressions read the pre-update row, so `copies - $2` is the new count
        let taken = sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET copies = copies - $2,
                available = CASE WHEN copies - $2 = 0 THEN FALSE ELSE available END,
                updated_at = $3
            WHERE id = $1 AND copies >= $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = taken {
            return Ok(StockChange::Taken(row.try_into()?));
        }

        let copies: Option<i32> = sqlx::query_scalar("SELECT copies FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match copies {
            Some(available) => StockChange::Insufficient { available },
            None => StockChange::Missing,
        })
    }

    async fn return_copies(&self, id: BookId, quantity: i32, restore_available: bool) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET copies = copies + $2,
                available = CASE WHEN $3 THEN TRUE ELSE available END,
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(restore_available)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| book_not_found(id))?
        .try_into()
    }
}
