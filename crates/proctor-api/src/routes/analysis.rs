//! Out-of-band analysis-emitter control (§4.7):
//! `POST /api/analysis/start/{roomId}/{candidateId}`,
//! `POST /api/analysis/stop/{candidateId}`,
//! `GET /api/analysis/history/{roomId}/{candidateId}`.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use proctor_analysis::AnalysisError;
use proctor_common::{ProctorError, ProctorResult, RoomId, Severity, UserId};
use proctor_room::RoomState;
use proctor_rules::Incident;
use serde::{Deserialize, Serialize};

pub fn router() -> Router<RoomState> {
    Router::new()
        .route("/api/analysis/start/{roomId}/{candidateId}", post(start))
        .route("/api/analysis/stop/{candidateId}", post(stop))
        .route("/api/analysis/history/{roomId}/{candidateId}", get(history))
}

#[derive(Serialize)]
struct Ack {
    success: bool,
}

async fn start(
    State(state): State<RoomState>,
    Path((room_id, candidate_id)): Path<(RoomId, UserId)>,
) -> ProctorResult<Json<Ack>> {
    state.analysis.start(room_id, candidate_id).await.map_err(|e| match e {
        AnalysisError::AlreadyRunning => ProctorError::AlreadyExists { resource: "analysis emitter".into() },
        AnalysisError::NotRunning => ProctorError::Internal(anyhow::anyhow!(e.to_string())),
    })?;
    Ok(Json(Ack { success: true }))
}

/// The path carries no `roomId`: candidate ids are unique across the
/// server at any one time, so the room is found by scanning live rooms
/// (see [`proctor_room::RoomRegistry::find_room_containing`]).
async fn stop(State(state): State<RoomState>, Path(candidate_id): Path<UserId>) -> ProctorResult<Json<Ack>> {
    let room = state
        .registry
        .find_room_containing(&candidate_id)
        .await
        .ok_or_else(|| ProctorError::NotFound { resource: "candidate".into() })?;

    state.analysis.stop(&room.room_id, &candidate_id).await.map_err(|e| match e {
        AnalysisError::NotRunning => ProctorError::NotFound { resource: "analysis emitter".into() },
        AnalysisError::AlreadyRunning => ProctorError::Internal(anyhow::anyhow!(e.to_string())),
    })?;
    Ok(Json(Ack { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    from_ts: Option<i64>,
    to_ts: Option<i64>,
    level: Option<Severity>,
    #[serde(rename = "type")]
    tag: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    incidents: Vec<Incident>,
    summary: HashMap<Severity, usize>,
}

async fn history(
    State(state): State<RoomState>,
    Path((room_id, candidate_id)): Path<(RoomId, UserId)>,
    Query(q): Query<HistoryQuery>,
) -> ProctorResult<Json<HistoryResponse>> {
    let room = state
        .registry
        .get(&room_id)
        .await
        .ok_or_else(|| ProctorError::NotFound { resource: "room".into() })?;

    let incidents: Vec<Incident> = room
        .incidents()
        .await
        .into_iter()
        .filter(|i| i.by == candidate_id)
        .filter(|i| q.from_ts.is_none_or(|from| i.ts >= from))
        .filter(|i| q.to_ts.is_none_or(|to| i.ts <= to))
        .filter(|i| q.level.is_none_or(|l| i.level == Some(l)))
        .filter(|i| q.tag.as_ref().is_none_or(|t| &i.tag == t))
        .collect();

    let mut summary = HashMap::new();
    for level in [Severity::S1, Severity::S2, Severity::S3, Severity::S4] {
        summary.insert(level, incidents.iter().filter(|i| i.level == Some(level)).count());
    }

    Ok(Json(HistoryResponse { incidents, summary }))
}
