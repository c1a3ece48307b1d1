pub mod auth;
pub mod books;
pub mod middleware;
pub mod progress;
pub mod reader;
pub mod state;
pub mod streak;

pub use middleware::require_auth;

use crate::web::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use omniread_core::ports::PortError;
use std::sync::Arc;
use tracing::error;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        progress::update_progress_handler,
        streak::update_streak_handler,
        streak::weekly_activity_handler,
        books::create_book_handler,
        books::discover_books_handler,
        books::shelf_handler,
        books::get_book_handler,
        books::toggle_bookmark_handler,
        books::add_chapter_handler,
        books::delete_chapter_handler,
        reader::read_book_handler,
    ),
    components(schemas(
        auth::SignupRequest,
        auth::LoginRequest,
        auth::AuthResponse,
        auth::MeResponse,
        auth::UserBody,
        progress::ProgressRequest,
        progress::ProgressResponse,
        progress::ProgressBody,
        progress::ChapterMarkBody,
        streak::StreakRequest,
        streak::StreakResponse,
        streak::StreakBody,
        streak::WeeklyActivityResponse,
        streak::DayActivityBody,
        books::CreateBookRequest,
        books::NewChapterRequest,
        books::CreateBookResponse,
        books::BookListResponse,
        books::BookBody,
        books::ChapterBody,
        books::ShelfResponse,
        books::ShelfData,
        books::ReadingEntryBody,
        books::BookDetailResponse,
        books::BookmarksResponse,
        books::SuccessResponse,
    )),
    tags(
        (name = "OmniRead API", description = "Reading progress, streaks, and document delivery.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Error Mapping and Router Assembly
//=========================================================================================

/// Maps a port error onto the response status it implies. Unexpected
/// failures are logged here and kept generic for the client.
pub(crate) fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(message) => {
            error!("Port operation failed: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Builds the application router. Shared between the binary and the
/// integration tests so both drive the same routes and middleware.
pub fn app_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route("/progress", put(progress::update_progress_handler))
        .route("/streak", put(streak::update_streak_handler))
        .route("/streak/weekly", get(streak::weekly_activity_handler))
        .route(
            "/books",
            get(books::discover_books_handler).post(books::create_book_handler),
        )
        .route("/books/shelf", get(books::shelf_handler))
        .route("/books/read/{id}", get(reader::read_book_handler))
        .route("/books/{id}", get(books::get_book_handler))
        .route("/books/{id}/bookmark", put(books::toggle_bookmark_handler))
        .route("/books/{id}/chapters", post(books::add_chapter_handler))
        .route(
            "/books/{book_id}/chapters/{chapter_id}",
            delete(books::delete_chapter_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(app_state)
}
