//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrow, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "1.0.0",
        description = "Library Management System REST API. Every JSON response is wrapped in \
                       an envelope `{success, message, data, error?}`; the schemas below describe `data`.",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::create_book,
        books::list_books,
        books::get_book,
        books::update_book,
        books::delete_book,
        // Borrowing
        borrow::borrow_book,
        borrow::borrow_summary,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::Genre,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::SortField,
            crate::models::book::SortDirection,
            // Borrowing
            crate::models::borrow::Borrow,
            crate::models::borrow::BorrowRequest,
            crate::models::borrow::BorrowSummary,
            crate::models::borrow::BorrowedBook,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorCode,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "borrow", description = "Borrowing and borrow summary")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
