//! Book (catalog entry) model and related types

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

pub type BookId = Uuid;

/// Fixed set of genres a book can be filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    Fiction,
    NonFiction,
    Science,
    History,
    Biography,
    Fantasy,
}

impl Genre {
    pub const ALL: [Genre; 6] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Science,
        Genre::History,
        Genre::Biography,
        Genre::Fantasy,
    ];

    /// Stored / wire literal
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "FICTION",
            Genre::NonFiction => "NON_FICTION",
            Genre::Science => "SCIENCE",
            Genre::History => "HISTORY",
            Genre::Biography => "BIOGRAPHY",
            Genre::Fantasy => "FANTASY",
        }
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown genre `{}`", s))
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Copies currently on the shelf
    pub copies: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `books` row; genre is kept as text in the database
#[derive(Debug, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub description: Option<String>,
    pub copies: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let genre = row.genre.parse().map_err(AppError::Internal)?;
        Ok(Book {
            id: row.id,
            title: row.title,
            author: row.author,
            genre,
            isbn: row.isbn,
            description: row.description,
            copies: row.copies,
            available: row.available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Create book request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(
        required(message = "title is required"),
        length(min = 1, message = "title must not be empty")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "author is required"),
        length(min = 1, message = "author must not be empty")
    )]
    pub author: Option<String>,
    #[validate(required(message = "genre is required"))]
    pub genre: Option<Genre>,
    #[validate(
        required(message = "isbn is required"),
        length(min = 1, message = "isbn must not be empty")
    )]
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[validate(
        required(message = "copies is required"),
        range(min = 0, message = "Copies must be a positive number")
    )]
    pub copies: Option<i32>,
    pub available: Option<bool>,
}

/// Validated fields of a book about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub description: Option<String>,
    pub copies: i32,
    pub available: bool,
}

impl CreateBook {
    /// Run field validation and produce the typed insert payload
    pub fn into_new_book(self) -> AppResult<NewBook> {
        self.validate()?;

        let missing = |field: &str| AppError::Validation(format!("{} is required", field));
        Ok(NewBook {
            title: self.title.ok_or_else(|| missing("title"))?,
            author: self.author.ok_or_else(|| missing("author"))?,
            genre: self.genre.ok_or_else(|| missing("genre"))?,
            isbn: self.isbn.ok_or_else(|| missing("isbn"))?,
            description: self.description,
            copies: self.copies.ok_or_else(|| missing("copies"))?,
            available: self.available.unwrap_or(true),
        })
    }
}

impl NewBook {
    pub fn into_book(self, id: BookId, now: DateTime<Utc>) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            genre: self.genre,
            isbn: self.isbn,
            description: self.description,
            copies: self.copies,
            available: self.available,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update request; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "author must not be empty"))]
    pub author: Option<String>,
    pub genre: Option<Genre>,
    #[validate(length(min = 1, message = "isbn must not be empty"))]
    pub isbn: Option<String>,
    /// Absent keeps the description, `null` clears it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[validate(range(min = 0, message = "Copies must be a positive number"))]
    pub copies: Option<i32>,
    /// Explicit override; never derived from `copies`
    pub available: Option<bool>,
}

impl UpdateBook {
    pub fn validated(self) -> AppResult<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Merge the provided fields into `book`
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(ref isbn) = self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(ref description) = self.description {
            book.description = description.clone();
        }
        if let Some(copies) = self.copies {
            book.copies = copies;
        }
        if let Some(available) = self.available {
            book.available = available;
        }
    }
}

/// Fields a book list can be sorted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Title,
    Author,
    Genre,
    Isbn,
    Copies,
    Available,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Column name in the `books` table
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Genre => "genre",
            SortField::Isbn => "isbn",
            SortField::Copies => "copies",
            SortField::Available => "available",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    pub fn compare(&self, a: &Book, b: &Book) -> Ordering {
        match self {
            SortField::Title => a.title.cmp(&b.title),
            SortField::Author => a.author.cmp(&b.author),
            SortField::Genre => a.genre.as_str().cmp(b.genre.as_str()),
            SortField::Isbn => a.isbn.cmp(&b.isbn),
            SortField::Copies => a.copies.cmp(&b.copies),
            SortField::Available => a.available.cmp(&b.available),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Book list query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Only books of this genre
    pub filter: Option<Genre>,
    /// Field to sort on
    #[serde(rename = "sortBy")]
    pub sort_by: Option<SortField>,
    /// `asc` (default) or `desc`
    pub sort: Option<SortDirection>,
    /// Maximum number of books returned
    pub limit: Option<i64>,
}

/// Resolved list options handed to a store
#[derive(Debug, Clone, PartialEq)]
pub struct BookListOptions {
    pub genre: Option<Genre>,
    pub sort: Option<(SortField, SortDirection)>,
    pub limit: i64,
}

/// Parse a book identifier coming from a path or a request body
pub fn parse_book_id(raw: &str) -> AppResult<BookId> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("Invalid book id: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_create() -> CreateBook {
        CreateBook {
            title: Some("The Hobbit".into()),
            author: Some("J.R.R. Tolkien".into()),
            genre: Some(Genre::Fantasy),
            isbn: Some("9780547928227".into()),
            description: None,
            copies: Some(5),
            available: None,
        }
    }

    #[test]
    fn test_genre_wire_literals() {
        for genre in Genre::ALL {
            let json = serde_json::to_string(&genre).unwrap();
            assert_eq!(json, format!("\"{}\"", genre.as_str()));
            assert_eq!(genre.as_str().parse::<Genre>().unwrap(), genre);
        }
        assert!("POETRY".parse::<Genre>().is_err());
    }

    #[test]
    fn test_create_defaults_available() {
        let book = sample_create().into_new_book().unwrap();
        assert!(book.available);
        assert_eq!(book.copies, 5);
    }

    #[test]
    fn test_create_rejects_negative_copies() {
        let request = CreateBook {
            copies: Some(-1),
            ..sample_create()
        };
        let err = request.into_new_book().unwrap_err();
        match err {
            AppError::InvalidFields(errors) => {
                assert!(errors.field_errors().contains_key("copies"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_create_reports_every_missing_field() {
        let err = CreateBook::default().into_new_book().unwrap_err();
        match err {
            AppError::InvalidFields(errors) => {
                let fields = errors.field_errors();
                for name in ["title", "author", "genre", "isbn", "copies"] {
                    assert!(fields.contains_key(name), "missing error for {}", name);
                }
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_update_merges_only_present_fields() {
        let mut book = sample_create().into_new_book().unwrap().into_book(Uuid::new_v4(), Utc::now());
        book.available = false;
        book.copies = 0;

        let update = UpdateBook {
            copies: Some(4),
            description: Some(Some("There and back again".into())),
            ..Default::default()
        };
        update.apply_to(&mut book);

        assert_eq!(book.copies, 4);
        assert_eq!(book.title, "The Hobbit");
        assert_eq!(book.description.as_deref(), Some("There and back again"));
        // Replenishing copies leaves the flag alone
        assert!(!book.available);
    }

    #[test]
    fn test_update_null_description_clears_it() {
        let absent: UpdateBook = serde_json::from_str(r#"{"copies": 2}"#).unwrap();
        assert_eq!(absent.description, None);

        let cleared: UpdateBook = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let mut book = sample_create().into_new_book().unwrap().into_book(Uuid::new_v4(), Utc::now());
        book.description = Some("Old blurb".into());
        absent.apply_to(&mut book);
        assert_eq!(book.description.as_deref(), Some("Old blurb"));
        cleared.apply_to(&mut book);
        assert_eq!(book.description, None);
    }

    #[test]
    fn test_update_rejects_empty_title() {
        let update = UpdateBook {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(update.validated(), Err(AppError::InvalidFields(_))));
    }

    #[test]
    fn test_book_serializes_with_wire_names() {
        let book = sample_create().into_new_book().unwrap().into_book(Uuid::nil(), Utc::now());
        let value = serde_json::to_value(&book).unwrap();
        assert!(value.get("_id").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("description").is_none());
        assert_eq!(value["genre"], "FANTASY");
    }

    #[test]
    fn test_parse_book_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_book_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_book_id("not-an-id"), Err(AppError::Validation(_))));
    }
}
