//! Borrowing endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::borrow::{Borrow, BorrowRequest, BorrowSummary},
    AppState,
};

use super::{ApiJson, ApiResponse};

/// Borrow copies of a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrow",
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Borrow recorded; envelope data holds the ledger entry", body = Borrow),
        (status = 400, description = "Invalid request or not enough copies available"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BorrowRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Borrow>>)> {
    let borrow = state.services.borrows.borrow(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Book borrowed successfully", borrow)),
    ))
}

/// Borrowed quantity per book
#[utoipa::path(
    get,
    path = "/borrow",
    tag = "borrow",
    responses(
        (status = 200, description = "Envelope data holds one entry per borrowed book", body = Vec<BorrowSummary>)
    )
)]
pub async fn borrow_summary(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<BorrowSummary>>>> {
    let summary = state.services.borrows.summary().await?;
    Ok(Json(ApiResponse::success(
        "Borrowed books summary retrieved successfully",
        summary,
    )))
}
