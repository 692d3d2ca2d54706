//! Data models for Libris

pub mod book;
pub mod borrow;

// Re-export commonly used types
pub use book::{Book, BookId, Genre};
pub use borrow::{Borrow, BorrowSummary};
