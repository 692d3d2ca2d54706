//! Book (catalog) endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{parse_book_id, Book, BookQuery, CreateBook, UpdateBook},
    AppState,
};

use super::{ApiJson, ApiQuery, ApiResponse};

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created; envelope data holds the book", body = Book),
        (status = 400, description = "Validation failed or isbn already used")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateBook>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    let book = state.services.catalog.create_book(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Book created successfully", book)),
    ))
}

/// List books with optional genre filter, sorting and limit
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Envelope data holds the matching books", body = Vec<Book>),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BookQuery>,
) -> AppResult<Json<ApiResponse<Vec<Book>>>> {
    let books = state.services.catalog.list_books(&query).await?;
    Ok(Json(ApiResponse::success("Books retrieved successfully", books)))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Envelope data holds the book", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.catalog.get_book(parse_book_id(&id)?).await?;
    Ok(Json(ApiResponse::success("Book retrieved successfully", book)))
}

/// Partially update a book
#[utoipa::path(
    patch,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Envelope data holds the updated book", body = Book),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<UpdateBook>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state
        .services
        .catalog
        .update_book(parse_book_id(&id)?, changes)
        .await?;
    Ok(Json(ApiResponse::success("Book updated successfully", book)))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book deleted; envelope data is null"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.catalog.delete_book(parse_book_id(&id)?).await?;
    Ok(Json(ApiResponse::empty("Book deleted successfully")))
}
