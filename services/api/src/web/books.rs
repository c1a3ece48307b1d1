//! services/api/src/web/books.rs
//!
//! The book catalog: creation, discovery, the shelf view, bookmarks, and
//! chapter management. Binary upload mechanics live in the storage layer;
//! these endpoints accept storage locators that layer has already minted.

use crate::web::{port_error_response, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use omniread_core::domain::{Book, Chapter, UploadType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

const PLACEHOLDER_COVER: &str = "https://via.placeholder.com/300x450?text=No+Cover";

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewChapterRequest {
    pub title: Option<String>,
    /// Storage locator for PDF chapters, literal text for manuscripts.
    pub content: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub genres: Option<Vec<String>>,
    /// One of `manual_text`, `pdf_single`, `pdf_collection`.
    pub upload_type: String,
    /// Master document locator; required for `pdf_single`.
    pub master_locator: Option<String>,
    /// Manuscript text; used by `manual_text`.
    pub content: Option<String>,
    /// Per-chapter uploads; used by `pdf_collection`.
    pub chapters: Option<Vec<NewChapterRequest>>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookBody {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_url: String,
    pub genres: Vec<String>,
    pub upload_type: String,
    pub total_chapters: u32,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Book> for BookBody {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            description: book.description,
            cover_url: book.cover_url,
            genres: book.genres,
            upload_type: book.upload_type.as_str().to_string(),
            total_chapters: book.total_chapters,
            uploaded_by: book.uploaded_by,
            created_at: book.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterBody {
    pub id: Uuid,
    pub title: String,
    pub order: u32,
    pub content: String,
    pub start_page: u32,
    pub end_page: Option<u32>,
}

impl From<Chapter> for ChapterBody {
    fn from(chapter: Chapter) -> Self {
        Self {
            id: chapter.id,
            title: chapter.title,
            order: chapter.order,
            content: chapter.content,
            start_page: chapter.start_page,
            end_page: chapter.end_page,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CreateBookResponse {
    pub success: bool,
    pub data: BookBody,
}

#[derive(Serialize, ToSchema)]
pub struct BookListResponse {
    pub success: bool,
    pub data: Vec<BookBody>,
}

/// A book the user has started, with its completion percent.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingEntryBody {
    pub book: BookBody,
    pub percent: f64,
}

#[derive(Serialize, ToSchema)]
pub struct ShelfData {
    pub uploads: Vec<BookBody>,
    pub bookmarks: Vec<BookBody>,
    pub reading: Vec<ReadingEntryBody>,
}

#[derive(Serialize, ToSchema)]
pub struct ShelfResponse {
    pub success: bool,
    pub data: ShelfData,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDetailResponse {
    pub success: bool,
    pub book: BookBody,
    pub chapters: Vec<ChapterBody>,
    pub user_progress: Option<crate::web::progress::ProgressBody>,
}

#[derive(Serialize, ToSchema)]
pub struct BookmarksResponse {
    pub success: bool,
    pub bookmarks: Vec<Uuid>,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /books - Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = CreateBookResponse),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.title.trim().is_empty() || req.author.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "title and author are required".to_string(),
        ));
    }
    let upload_type = UploadType::parse(&req.upload_type).ok_or((
        StatusCode::BAD_REQUEST,
        "uploadType must be one of manual_text, pdf_single, pdf_collection".to_string(),
    ))?;
    if upload_type == UploadType::PdfSingle && req.master_locator.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "masterLocator is required for pdf_single books".to_string(),
        ));
    }

    let incoming_chapters = req.chapters.unwrap_or_default();
    let total_chapters = match upload_type {
        UploadType::PdfSingle | UploadType::ManualText => 1,
        UploadType::PdfCollection => incoming_chapters.len() as u32,
    };

    let book = Book {
        id: Uuid::new_v4(),
        title: req.title.trim().to_string(),
        author: req.author.trim().to_string(),
        description: req.description.unwrap_or_default(),
        cover_url: req
            .cover_url
            .unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
        genres: req.genres.unwrap_or_default(),
        upload_type,
        master_locator: req.master_locator,
        total_chapters,
        uploaded_by: user_id,
        created_at: Utc::now(),
    };
    let book = state
        .db
        .create_book(book)
        .await
        .map_err(port_error_response)?;

    match upload_type {
        UploadType::ManualText => {
            let chapter = Chapter {
                id: Uuid::new_v4(),
                book_id: book.id,
                title: "Manuscript".to_string(),
                order: 1,
                content: req.content.unwrap_or_default(),
                start_page: 1,
                end_page: None,
            };
            state
                .db
                .add_chapter(chapter)
                .await
                .map_err(port_error_response)?;
        }
        UploadType::PdfCollection => {
            for (index, incoming) in incoming_chapters.into_iter().enumerate() {
                let order = index as u32 + 1;
                let chapter = Chapter {
                    id: Uuid::new_v4(),
                    book_id: book.id,
                    title: incoming.title.unwrap_or_else(|| format!("Chapter {order}")),
                    order,
                    content: incoming.content.unwrap_or_default(),
                    start_page: 1,
                    end_page: None,
                };
                state
                    .db
                    .add_chapter(chapter)
                    .await
                    .map_err(port_error_response)?;
            }
        }
        UploadType::PdfSingle => {}
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateBookResponse {
            success: true,
            data: BookBody::from(book),
        }),
    ))
}

/// GET /books - Every book in the catalog, newest first
#[utoipa::path(
    get,
    path = "/books",
    responses(
        (status = 200, description = "All books", body = BookListResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn discover_books_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let books = state.db.list_books().await.map_err(port_error_response)?;
    Ok(Json(BookListResponse {
        success: true,
        data: books.into_iter().map(BookBody::from).collect(),
    }))
}

/// GET /books/shelf - The user's uploads, bookmarks, and in-progress books
#[utoipa::path(
    get,
    path = "/books/shelf",
    responses(
        (status = 200, description = "Shelf contents", body = ShelfResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn shelf_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let uploads = state
        .db
        .list_books_by_uploader(user_id)
        .await
        .map_err(port_error_response)?;
    let bookmarks = state
        .db
        .get_bookmarked_books(user_id)
        .await
        .map_err(port_error_response)?;

    // Most recently read first; records whose book has since vanished are
    // dropped from the view rather than failing the whole shelf.
    let mut reading = Vec::new();
    for progress in state
        .db
        .list_progress_for_user(user_id)
        .await
        .map_err(port_error_response)?
    {
        match state.db.get_book_by_id(progress.book_id).await {
            Ok(book) => reading.push(ReadingEntryBody {
                book: BookBody::from(book),
                percent: progress.percent_complete,
            }),
            Err(e) => warn!("Skipping shelf entry for missing book: {:?}", e),
        }
    }

    Ok(Json(ShelfResponse {
        success: true,
        data: ShelfData {
            uploads: uploads.into_iter().map(BookBody::from).collect(),
            bookmarks: bookmarks.into_iter().map(BookBody::from).collect(),
            reading,
        },
    }))
}

/// GET /books/{id} - One book with its chapters and the caller's progress
#[utoipa::path(
    get,
    path = "/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book detail", body = BookDetailResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book = state
        .db
        .get_book_by_id(book_id)
        .await
        .map_err(port_error_response)?;
    let chapters = state
        .db
        .get_chapters_for_book(book_id)
        .await
        .map_err(port_error_response)?;
    let progress = state
        .db
        .get_progress(user_id, book_id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(BookDetailResponse {
        success: true,
        book: BookBody::from(book),
        chapters: chapters.into_iter().map(ChapterBody::from).collect(),
        user_progress: progress.map(crate::web::progress::ProgressBody::from),
    }))
}

/// PUT /books/{id}/bookmark - Toggle the book in the user's bookmark set
#[utoipa::path(
    put,
    path = "/books/{id}/bookmark",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Updated bookmark set", body = BookmarksResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn toggle_bookmark_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .get_book_by_id(book_id)
        .await
        .map_err(port_error_response)?;
    let bookmarks = state
        .db
        .toggle_bookmark(user_id, book_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(BookmarksResponse {
        success: true,
        bookmarks,
    }))
}

/// POST /books/{id}/chapters - Append a chapter to a book
#[utoipa::path(
    post,
    path = "/books/{id}/chapters",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = NewChapterRequest,
    responses(
        (status = 200, description = "Chapter appended", body = SuccessResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn add_chapter_handler(
    State(state): State<Arc<AppState>>,
    Extension(_user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<NewChapterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book = state
        .db
        .get_book_by_id(book_id)
        .await
        .map_err(port_error_response)?;

    let count = state
        .db
        .count_chapters(book.id)
        .await
        .map_err(port_error_response)?;
    let order = count + 1;
    let chapter = Chapter {
        id: Uuid::new_v4(),
        book_id: book.id,
        title: req.title.unwrap_or_else(|| format!("Chapter {order}")),
        order,
        content: req.content.unwrap_or_default(),
        start_page: 1,
        end_page: None,
    };
    state
        .db
        .add_chapter(chapter)
        .await
        .map_err(port_error_response)?;
    state
        .db
        .set_total_chapters(book.id, order)
        .await
        .map_err(port_error_response)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /books/{book_id}/chapters/{chapter_id} - Remove a chapter
#[utoipa::path(
    delete,
    path = "/books/{book_id}/chapters/{chapter_id}",
    params(
        ("book_id" = Uuid, Path, description = "Book ID"),
        ("chapter_id" = Uuid, Path, description = "Chapter ID")
    ),
    responses(
        (status = 200, description = "Chapter removed", body = SuccessResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Chapter not found")
    )
)]
pub async fn delete_chapter_handler(
    State(state): State<Arc<AppState>>,
    Extension(_user_id): Extension<Uuid>,
    Path((book_id, chapter_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_chapter(book_id, chapter_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(SuccessResponse { success: true }))
}
