//! services/api/src/web/progress.rs
//!
//! The progress-sync endpoint: one durable reading cursor per (user, book)
//! pair, updated with partial-update semantics.

use crate::web::{port_error_response, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use omniread_core::domain::ReadingProgress;
use omniread_core::progress::ProgressUpdate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

/// One progress-sync payload. Everything but `bookId` is optional; omitted
/// fields leave the stored record untouched.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    /// Required; its absence is a validation error rather than a routing one.
    pub book_id: Option<Uuid>,
    pub current_page: Option<u32>,
    pub current_chapter_index: Option<u32>,
    pub percent_complete: Option<f64>,
    pub chapter_percent: Option<f64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterMarkBody {
    pub chapter_index: u32,
    pub percent: f64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBody {
    pub book_id: Uuid,
    pub current_chapter_index: u32,
    pub current_page: u32,
    pub percent_complete: f64,
    pub chapter_progress: Vec<ChapterMarkBody>,
    pub last_read: DateTime<Utc>,
}

impl From<ReadingProgress> for ProgressBody {
    fn from(progress: ReadingProgress) -> Self {
        Self {
            book_id: progress.book_id,
            current_chapter_index: progress.current_chapter_index,
            current_page: progress.current_page,
            percent_complete: progress.percent_complete,
            chapter_progress: progress
                .chapter_progress
                .into_iter()
                .map(|mark| ChapterMarkBody {
                    chapter_index: mark.chapter_index,
                    percent: mark.percent,
                })
                .collect(),
            last_read: progress.last_read,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProgressResponse {
    pub success: bool,
    pub progress: ProgressBody,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// PUT /progress - Sync the reading cursor for one book.
///
/// Also overwrites the user's single last-read-book pointer. Concurrent
/// syncs for the same (user, book) pair race with last-write-wins
/// semantics; there is no conflict detection.
#[utoipa::path(
    put,
    path = "/progress",
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Progress record after the sync", body = ProgressResponse),
        (status = 400, description = "Missing bookId or out-of-range percent"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book does not exist")
    )
)]
pub async fn update_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ProgressRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book_id = req
        .book_id
        .ok_or((StatusCode::BAD_REQUEST, "bookId is required".to_string()))?;

    let update = ProgressUpdate {
        current_page: req.current_page,
        current_chapter_index: req.current_chapter_index,
        percent_complete: req.percent_complete,
        chapter_percent: req.chapter_percent,
    };
    update
        .validate()
        .map_err(|message| (StatusCode::BAD_REQUEST, message))?;

    state
        .db
        .get_book_by_id(book_id)
        .await
        .map_err(port_error_response)?;

    state
        .db
        .set_last_read_book(user_id, book_id)
        .await
        .map_err(port_error_response)?;

    let now = Utc::now();
    let mut progress = state
        .db
        .get_progress(user_id, book_id)
        .await
        .map_err(port_error_response)?
        .unwrap_or_else(|| ReadingProgress::new(user_id, book_id, now));
    progress.apply(&update, now);

    state
        .db
        .save_progress(&progress)
        .await
        .map_err(port_error_response)?;

    Ok(Json(ProgressResponse {
        success: true,
        progress: ProgressBody::from(progress),
    }))
}
