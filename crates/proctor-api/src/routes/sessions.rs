//! `GET /rooms/{roomId}/sessions/{userId}/summary` (§4.7).

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use proctor_common::{ProctorError, ProctorResult, RoomId, UserId};
use proctor_room::RoomState;
use proctor_rules::{AlertSummary, SessionStatus};
use serde::Serialize;
use std::collections::HashMap;

pub fn router() -> Router<RoomState> {
    Router::new().route("/rooms/{roomId}/sessions/{userId}/summary", get(session_summary))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummaryResponse {
    session_id: String,
    status: SessionStatus,
    alerts_count: usize,
    alerts: HashMap<String, AlertSummary>,
}

async fn session_summary(
    State(state): State<RoomState>,
    Path((room_id, user_id)): Path<(RoomId, UserId)>,
) -> ProctorResult<Json<SessionSummaryResponse>> {
    let summary = state
        .rules
        .summary(&room_id, &user_id)
        .ok_or_else(|| ProctorError::NotFound { resource: "session".into() })?;

    Ok(Json(SessionSummaryResponse {
        session_id: format!("{room_id}:{user_id}"),
        status: summary.status,
        alerts_count: summary.alerts_count,
        alerts: summary.alerts,
    }))
}
