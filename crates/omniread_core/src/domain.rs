//! crates/omniread_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// How a book's content was supplied at creation time.
///
/// The variant decides what the chapter `content` fields hold: literal text
/// for manual manuscripts, storage locators for PDF uploads. The delivery
/// proxy must branch on it before treating content as fetchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadType {
    /// Typed-in manuscript; chapter content holds the text itself.
    ManualText,
    /// One master PDF covering the whole book.
    PdfSingle,
    /// An anthology with one uploaded PDF per chapter.
    PdfCollection,
}

impl UploadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadType::ManualText => "manual_text",
            UploadType::PdfSingle => "pdf_single",
            UploadType::PdfCollection => "pdf_collection",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual_text" => Some(UploadType::ManualText),
            "pdf_single" => Some(UploadType::PdfSingle),
            "pdf_collection" => Some(UploadType::PdfCollection),
            _ => None,
        }
    }

    /// Whether document content is stored as a fetchable locator.
    pub fn is_pdf_bearing(&self) -> bool {
        !matches!(self, UploadType::ManualText)
    }
}

// Represents a user - used throughout the app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    /// 1-slot most-recently-read cache, unconditionally overwritten on every
    /// progress sync. No history is kept.
    pub last_read_book: Option<Uuid>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// A book in the catalog. Binary content lives in external object storage;
/// the book only carries locators.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_url: String,
    pub genres: Vec<String>,
    pub upload_type: UploadType,
    /// Storage locator of the single master document. Only `PdfSingle`
    /// books have one.
    pub master_locator: Option<String>,
    pub total_chapters: u32,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One chapter of a book, ordered by `order` ascending within the book.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub id: Uuid,
    pub book_id: Uuid,
    pub title: String,
    pub order: u32,
    /// Literal text for `ManualText` books, a storage locator for
    /// `PdfCollection` chapters, empty for `PdfSingle`.
    pub content: String,
    // Page pointers into the master document, used by PdfSingle books.
    pub start_page: u32,
    pub end_page: Option<u32>,
}

/// Sub-progress for one chapter, independent of the global percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChapterMark {
    pub chapter_index: u32,
    pub percent: f64,
}

/// The durable reading cursor for one (user, book) pair. At most one record
/// exists per pair; it is created lazily on the first progress sync.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingProgress {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub current_chapter_index: u32,
    /// Last-synced page position, maintained for display only.
    pub current_page: u32,
    /// The authoritative completion measure, in [0, 100].
    pub percent_complete: f64,
    /// At most one entry per chapter index.
    pub chapter_progress: Vec<ChapterMark>,
    /// Moves on every write, even a no-op sync.
    pub last_read: DateTime<Utc>,
}

/// Reading-goal state embedded in the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Streak {
    pub daily_goal_minutes: u32,
    /// Accumulated reading seconds keyed by ISO calendar date
    /// (`YYYY-MM-DD`, UTC). Grows unboundedly; never pruned.
    pub history: BTreeMap<String, u64>,
}

impl Default for Streak {
    fn default() -> Self {
        Self {
            daily_goal_minutes: 30,
            history: BTreeMap::new(),
        }
    }
}
