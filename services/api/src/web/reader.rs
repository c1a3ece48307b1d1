//! services/api/src/web/reader.rs
//!
//! The document delivery endpoint: resolves a (book, chapter) reference to
//! a storage locator and relays the binary stream to the client.

use crate::web::{port_error_response, state::AppState};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Extension,
};
use omniread_core::locator::resolve_locator;
use omniread_core::ports::FetchError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ReadQuery {
    /// Raw query value; clients have been observed sending the literal
    /// string "null" when no chapter is selected.
    #[serde(rename = "chapterIndex")]
    chapter_index: Option<String>,
}

impl ReadQuery {
    fn chapter_index(&self) -> Option<u32> {
        self.chapter_index
            .as_deref()
            .filter(|value| *value != "null")
            .and_then(|value| value.parse().ok())
    }
}

/// GET /books/read/{id} - Stream the referenced document
///
/// The response body is copied from upstream storage incrementally; once
/// headers are sent, a mid-stream failure is terminal for the request and
/// the client must re-request. Each call opens its own upstream fetch.
#[utoipa::path(
    get,
    path = "/books/read/{id}",
    params(
        ("id" = Uuid, Path, description = "Book ID"),
        ("chapterIndex" = Option<u32>, Query, description = "0-based chapter position")
    ),
    responses(
        (status = 200, description = "The document bytes as application/pdf"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Locator outside the trusted storage domain"),
        (status = 404, description = "Book, chapter, or document source missing"),
        (status = 504, description = "Upstream fetch timed out")
    )
)]
pub async fn read_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(_user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
    Query(query): Query<ReadQuery>,
) -> Result<Response, (StatusCode, String)> {
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

    let locator =
        resolve_locator(&book, &chapters, query.chapter_index()).map_err(|e| {
            warn!("Refusing to stream book {}: {}", book_id, e);
            (StatusCode::NOT_FOUND, "Document source is missing.".to_string())
        })?;

    let document = state
        .fetcher
        .fetch(&locator)
        .await
        .map_err(fetch_error_response)?;

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf");
    if let Some(length) = document.content_length {
        response = response.header(header::CONTENT_LENGTH, length);
    }
    response.body(Body::from_stream(document.stream)).map_err(|e| {
        error!("Failed to build stream response: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server Error".to_string(),
        )
    })
}

/// Maps a fetch failure onto the response the client sees. Forbidden stays
/// deliberately opaque so upstream topology is not leaked.
fn fetch_error_response(e: FetchError) -> (StatusCode, String) {
    match e {
        FetchError::Forbidden => (
            StatusCode::FORBIDDEN,
            "Forbidden: Invalid document source.".to_string(),
        ),
        FetchError::InvalidLocator(reason) => {
            warn!("Unfetchable document locator: {}", reason);
            (
                StatusCode::NOT_FOUND,
                "Document source is missing.".to_string(),
            )
        }
        FetchError::TooManyRedirects => (
            StatusCode::BAD_GATEWAY,
            "Too many redirects from document storage.".to_string(),
        ),
        FetchError::Timeout => (
            StatusCode::GATEWAY_TIMEOUT,
            "Timed out retrieving document.".to_string(),
        ),
        FetchError::UpstreamStatus(code) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
            "Unable to retrieve document.".to_string(),
        ),
        FetchError::Network(reason) => {
            error!("Document fetch failed: {}", reason);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Stream connection failed.".to_string(),
            )
        }
    }
}
