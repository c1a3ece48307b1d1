//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `DatabaseService` port from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use omniread_core::domain::{
    Book, Chapter, ChapterMark, ReadingProgress, Streak, UploadType, User, UserCredentials,
};
use omniread_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    name: String,
    email: String,
    last_read_book: Option<Uuid>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            last_read_book: self.last_read_book,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    title: String,
    author: String,
    description: String,
    cover_url: String,
    genres: Vec<String>,
    upload_type: String,
    master_locator: Option<String>,
    total_chapters: i32,
    uploaded_by: Uuid,
    created_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> PortResult<Book> {
        let upload_type = UploadType::parse(&self.upload_type).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown upload type '{}'", self.upload_type))
        })?;
        Ok(Book {
            id: self.id,
            title: self.title,
            author: self.author,
            description: self.description,
            cover_url: self.cover_url,
            genres: self.genres,
            upload_type,
            master_locator: self.master_locator,
            total_chapters: self.total_chapters.max(0) as u32,
            uploaded_by: self.uploaded_by,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ChapterRecord {
    id: Uuid,
    book_id: Uuid,
    title: String,
    ord: i32,
    content: String,
    start_page: i32,
    end_page: Option<i32>,
}
impl ChapterRecord {
    fn to_domain(self) -> Chapter {
        Chapter {
            id: self.id,
            book_id: self.book_id,
            title: self.title,
            order: self.ord.max(0) as u32,
            content: self.content,
            start_page: self.start_page.max(1) as u32,
            end_page: self.end_page.map(|p| p.max(0) as u32),
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    user_id: Uuid,
    book_id: Uuid,
    current_chapter_index: i32,
    current_page: i32,
    percent_complete: f64,
    chapter_progress: Json<BTreeMap<String, f64>>,
    last_read: DateTime<Utc>,
}
impl ProgressRecord {
    fn to_domain(self) -> ReadingProgress {
        ReadingProgress {
            user_id: self.user_id,
            book_id: self.book_id,
            current_chapter_index: self.current_chapter_index.max(0) as u32,
            current_page: self.current_page.max(1) as u32,
            percent_complete: self.percent_complete,
            chapter_progress: marks_from_map(&self.chapter_progress.0),
            last_read: self.last_read,
        }
    }
}

#[derive(FromRow)]
struct StreakRecord {
    daily_goal_minutes: i32,
    streak_history: Json<BTreeMap<String, u64>>,
}
impl StreakRecord {
    fn to_domain(self) -> Streak {
        Streak {
            daily_goal_minutes: self.daily_goal_minutes.max(0) as u32,
            history: self.streak_history.0,
        }
    }
}

/// The chapter-progress column is a JSONB map keyed by the chapter index,
/// which makes the at-most-one-entry-per-index invariant structural.
fn marks_from_map(map: &BTreeMap<String, f64>) -> Vec<ChapterMark> {
    let mut marks: Vec<ChapterMark> = map
        .iter()
        .filter_map(|(key, percent)| {
            key.parse().ok().map(|chapter_index| ChapterMark {
                chapter_index,
                percent: *percent,
            })
        })
        .collect();
    marks.sort_by_key(|mark| mark.chapter_index);
    marks
}

fn map_from_marks(marks: &[ChapterMark]) -> BTreeMap<String, f64> {
    marks
        .iter()
        .map(|mark| (mark.chapter_index.to_string(), mark.percent))
        .collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, name, email, hashed_password) \
             VALUES ($1, $2, $3, $4) \
             RETURNING user_id, name, email, last_read_book",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("User with email {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, name, email, last_read_book FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Uuid = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => unexpected(e),
        })?;
        Ok(user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_book(&self, book: Book) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(
            "INSERT INTO books (id, title, author, description, cover_url, genres, upload_type, \
                                master_locator, total_chapters, uploaded_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING id, title, author, description, cover_url, genres, upload_type, \
                       master_locator, total_chapters, uploaded_by, created_at",
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(&book.cover_url)
        .bind(&book.genres)
        .bind(book.upload_type.as_str())
        .bind(&book.master_locator)
        .bind(book.total_chapters as i32)
        .bind(book.uploaded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_books(&self) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(
            "SELECT id, title, author, description, cover_url, genres, upload_type, \
                    master_locator, total_chapters, uploaded_by, created_at \
             FROM books ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_books_by_uploader(&self, user_id: Uuid) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(
            "SELECT id, title, author, description, cover_url, genres, upload_type, \
                    master_locator, total_chapters, uploaded_by, created_at \
             FROM books WHERE uploaded_by = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_book_by_id(&self, book_id: Uuid) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(
            "SELECT id, title, author, description, cover_url, genres, upload_type, \
                    master_locator, total_chapters, uploaded_by, created_at \
             FROM books WHERE id = $1",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("Book {} not found", book_id)))?;
        record.to_domain()
    }

    async fn add_chapter(&self, chapter: Chapter) -> PortResult<Chapter> {
        let record = sqlx::query_as::<_, ChapterRecord>(
            "INSERT INTO chapters (id, book_id, title, ord, content, start_page, end_page) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, book_id, title, ord, content, start_page, end_page",
        )
        .bind(chapter.id)
        .bind(chapter.book_id)
        .bind(&chapter.title)
        .bind(chapter.order as i32)
        .bind(&chapter.content)
        .bind(chapter.start_page as i32)
        .bind(chapter.end_page.map(|p| p as i32))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_chapters_for_book(&self, book_id: Uuid) -> PortResult<Vec<Chapter>> {
        let records = sqlx::query_as::<_, ChapterRecord>(
            "SELECT id, book_id, title, ord, content, start_page, end_page \
             FROM chapters WHERE book_id = $1 ORDER BY ord ASC",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn count_chapters(&self, book_id: Uuid) -> PortResult<u32> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chapters WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count.max(0) as u32)
    }

    async fn delete_chapter(&self, book_id: Uuid, chapter_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM chapters WHERE id = $1 AND book_id = $2")
            .bind(chapter_id)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Chapter {} not found",
                chapter_id
            )));
        }
        Ok(())
    }

    async fn set_total_chapters(&self, book_id: Uuid, total: u32) -> PortResult<()> {
        sqlx::query("UPDATE books SET total_chapters = $2 WHERE id = $1")
            .bind(book_id)
            .bind(total as i32)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn toggle_bookmark(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Vec<Uuid>> {
        let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if removed.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO bookmarks (user_id, book_id) VALUES ($1, $2) \
                 ON CONFLICT (user_id, book_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        }

        let bookmarks: Vec<Uuid> = sqlx::query_scalar(
            "SELECT book_id FROM bookmarks WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(bookmarks)
    }

    async fn get_bookmarked_books(&self, user_id: Uuid) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(
            "SELECT b.id, b.title, b.author, b.description, b.cover_url, b.genres, \
                    b.upload_type, b.master_locator, b.total_chapters, b.uploaded_by, b.created_at \
             FROM books b JOIN bookmarks m ON m.book_id = b.id \
             WHERE m.user_id = $1 ORDER BY m.created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_progress(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Option<ReadingProgress>> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT user_id, book_id, current_chapter_index, current_page, percent_complete, \
                    chapter_progress, last_read \
             FROM reading_progress WHERE user_id = $1 AND book_id = $2",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn save_progress(&self, progress: &ReadingProgress) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO reading_progress \
                 (user_id, book_id, current_chapter_index, current_page, percent_complete, \
                  chapter_progress, last_read) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id, book_id) DO UPDATE SET \
                 current_chapter_index = EXCLUDED.current_chapter_index, \
                 current_page = EXCLUDED.current_page, \
                 percent_complete = EXCLUDED.percent_complete, \
                 chapter_progress = EXCLUDED.chapter_progress, \
                 last_read = EXCLUDED.last_read",
        )
        .bind(progress.user_id)
        .bind(progress.book_id)
        .bind(progress.current_chapter_index as i32)
        .bind(progress.current_page as i32)
        .bind(progress.percent_complete)
        .bind(Json(map_from_marks(&progress.chapter_progress)))
        .bind(progress.last_read)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_progress_for_user(&self, user_id: Uuid) -> PortResult<Vec<ReadingProgress>> {
        let records = sqlx::query_as::<_, ProgressRecord>(
            "SELECT user_id, book_id, current_chapter_index, current_page, percent_complete, \
                    chapter_progress, last_read \
             FROM reading_progress WHERE user_id = $1 ORDER BY last_read DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn set_last_read_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE users SET last_read_book = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_streak(&self, user_id: Uuid) -> PortResult<Streak> {
        let record = sqlx::query_as::<_, StreakRecord>(
            "SELECT daily_goal_minutes, streak_history FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn add_reading_seconds(
        &self,
        user_id: Uuid,
        date_key: &str,
        seconds: u64,
    ) -> PortResult<Streak> {
        // Single-statement per-key increment: concurrent syncs serialize on
        // the row instead of racing a read-modify-write cycle.
        let record = sqlx::query_as::<_, StreakRecord>(
            "UPDATE users SET streak_history = jsonb_set( \
                 streak_history, \
                 ARRAY[$2], \
                 to_jsonb(COALESCE((streak_history ->> $2)::bigint, 0) + $3)) \
             WHERE user_id = $1 \
             RETURNING daily_goal_minutes, streak_history",
        )
        .bind(user_id)
        .bind(date_key)
        .bind(seconds as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn set_daily_goal(&self, user_id: Uuid, minutes: u32) -> PortResult<Streak> {
        let record = sqlx::query_as::<_, StreakRecord>(
            "UPDATE users SET daily_goal_minutes = $2 WHERE user_id = $1 \
             RETURNING daily_goal_minutes, streak_history",
        )
        .bind(user_id)
        .bind(minutes as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }
}
