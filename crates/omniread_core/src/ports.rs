//! crates/omniread_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete database and object-storage
//! implementations behind them.

use crate::domain::{Book, Chapter, ReadingProgress, Streak, User, UserCredentials};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Document Fetch Types
//=========================================================================================

/// Errors from dereferencing a storage locator. Each variant maps to a
/// distinct response status in the delivery endpoint.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The locator's host is outside the trusted storage domain.
    #[error("Forbidden: invalid document source")]
    Forbidden,
    /// The locator does not parse as an absolute URL.
    #[error("Locator is not a fetchable URL: {0}")]
    InvalidLocator(String),
    /// The redirect chain exceeded the hop cap.
    #[error("Too many redirects while fetching document")]
    TooManyRedirects,
    /// The upstream did not answer within the configured window.
    #[error("Timed out fetching document")]
    Timeout,
    /// The upstream replied with a non-success, non-redirect status.
    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),
    #[error("Network error while fetching document: {0}")]
    Network(String),
}

/// A byte stream of document content, yielded incrementally. The whole
/// document is never held in memory at once; dropping the stream releases
/// the upstream connection.
pub type DocumentStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

/// An upstream document ready to be copied to a response.
pub struct FetchedDocument {
    pub content_length: Option<u64>,
    pub stream: DocumentStream,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Book Catalog ---
    async fn create_book(&self, book: Book) -> PortResult<Book>;

    /// All books, newest first.
    async fn list_books(&self) -> PortResult<Vec<Book>>;

    async fn list_books_by_uploader(&self, user_id: Uuid) -> PortResult<Vec<Book>>;

    async fn get_book_by_id(&self, book_id: Uuid) -> PortResult<Book>;

    async fn add_chapter(&self, chapter: Chapter) -> PortResult<Chapter>;

    /// Chapters of a book, ordered by their `order` field ascending.
    async fn get_chapters_for_book(&self, book_id: Uuid) -> PortResult<Vec<Chapter>>;

    async fn count_chapters(&self, book_id: Uuid) -> PortResult<u32>;

    async fn delete_chapter(&self, book_id: Uuid, chapter_id: Uuid) -> PortResult<()>;

    async fn set_total_chapters(&self, book_id: Uuid, total: u32) -> PortResult<()>;

    // --- Bookmarks ---
    /// Adds the book to the user's bookmark set if absent, removes it if
    /// present. Returns the updated set.
    async fn toggle_bookmark(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Vec<Uuid>>;

    async fn get_bookmarked_books(&self, user_id: Uuid) -> PortResult<Vec<Book>>;

    // --- Reading Progress ---
    async fn get_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Option<ReadingProgress>>;

    /// Upserts the (user, book) record in full. Concurrent writers for the
    /// same pair race with last-write-wins semantics.
    async fn save_progress(&self, progress: &ReadingProgress) -> PortResult<()>;

    /// All progress records of a user, most recently read first.
    async fn list_progress_for_user(&self, user_id: Uuid) -> PortResult<Vec<ReadingProgress>>;

    async fn set_last_read_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<()>;

    // --- Streak ---
    async fn get_streak(&self, user_id: Uuid) -> PortResult<Streak>;

    /// Adds `seconds` to the history bucket for `date_key`, initializing an
    /// absent bucket to zero. Must be an atomic per-key increment, not a
    /// read-modify-write, so concurrent syncs never lose an increment.
    /// Returns the full updated streak so the caller can resynchronize.
    async fn add_reading_seconds(
        &self,
        user_id: Uuid,
        date_key: &str,
        seconds: u64,
    ) -> PortResult<Streak>;

    async fn set_daily_goal(&self, user_id: Uuid, minutes: u32) -> PortResult<Streak>;
}

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Dereferences a storage locator and returns its byte stream. Every
    /// redirect hop is subject to the trusted-origin allow-list.
    async fn fetch(&self, locator: &str) -> Result<FetchedDocument, FetchError>;
}
