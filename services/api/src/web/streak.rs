//! services/api/src/web/streak.rs
//!
//! The reading-streak endpoints: goal configuration, time accumulation, and
//! the derived weekly activity view.

use crate::web::{port_error_response, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use omniread_core::domain::Streak;
use omniread_core::streak::{date_key, validate_goal, weekly_activity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

/// One streak sync. Callers batch reading time into small chunks
/// (conventionally 10 seconds, plus a final remainder on session end) and
/// may adjust the goal in the same call.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreakRequest {
    pub seconds_add: Option<u64>,
    pub goal_minutes: Option<u32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreakBody {
    pub daily_goal_minutes: u32,
    /// The full accumulated history, so the client can resynchronize its
    /// local cache after every write.
    pub history: BTreeMap<String, u64>,
}

impl From<Streak> for StreakBody {
    fn from(streak: Streak) -> Self {
        Self {
            daily_goal_minutes: streak.daily_goal_minutes,
            history: streak.history,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StreakResponse {
    pub success: bool,
    pub streak: StreakBody,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayActivityBody {
    /// ISO calendar date.
    pub date: String,
    pub minutes: u64,
    /// Share of the daily goal reached, clamped to [0, 100].
    pub percent_of_goal: f64,
}

#[derive(Serialize, ToSchema)]
pub struct WeeklyActivityResponse {
    pub success: bool,
    pub days: Vec<DayActivityBody>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// PUT /streak - Accumulate reading time and/or set the daily goal.
///
/// Seconds are attributed to the UTC calendar date of the sync; a session
/// spanning midnight lands entirely in the bucket current at sync time.
#[utoipa::path(
    put,
    path = "/streak",
    request_body = StreakRequest,
    responses(
        (status = 200, description = "Updated streak state", body = StreakResponse),
        (status = 400, description = "Goal outside the 1-1440 minute range"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_streak_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<StreakRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut streak = None;

    if let Some(minutes) = req.goal_minutes {
        let minutes =
            validate_goal(minutes).map_err(|message| (StatusCode::BAD_REQUEST, message))?;
        streak = Some(
            state
                .db
                .set_daily_goal(user_id, minutes)
                .await
                .map_err(port_error_response)?,
        );
    }

    if let Some(seconds) = req.seconds_add.filter(|seconds| *seconds > 0) {
        let today = Utc::now().date_naive();
        streak = Some(
            state
                .db
                .add_reading_seconds(user_id, &date_key(today), seconds)
                .await
                .map_err(port_error_response)?,
        );
    }

    let streak = match streak {
        Some(streak) => streak,
        None => state
            .db
            .get_streak(user_id)
            .await
            .map_err(port_error_response)?,
    };

    Ok(Json(StreakResponse {
        success: true,
        streak: StreakBody::from(streak),
    }))
}

/// GET /streak/weekly - The Monday..Sunday activity row for the current week.
#[utoipa::path(
    get,
    path = "/streak/weekly",
    responses(
        (status = 200, description = "Seven days of goal completion", body = WeeklyActivityResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn weekly_activity_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let streak = state
        .db
        .get_streak(user_id)
        .await
        .map_err(port_error_response)?;

    let today = Utc::now().date_naive();
    let days = weekly_activity(&streak.history, streak.daily_goal_minutes, today, None)
        .into_iter()
        .map(|day| DayActivityBody {
            date: date_key(day.date),
            minutes: day.minutes,
            percent_of_goal: day.percent_of_goal,
        })
        .collect();

    Ok(Json(WeeklyActivityResponse {
        success: true,
        days,
    }))
}
