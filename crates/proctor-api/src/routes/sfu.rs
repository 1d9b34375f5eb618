//! `GET /rooms/{roomId}/sfu/stats` (§4.7). 503 when the SFU is disabled.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use proctor_common::{ProctorError, ProctorResult, RoomId};
use proctor_room::RoomState;
use proctor_sfu::RoomStats;

pub fn router() -> Router<RoomState> {
    Router::new().route("/rooms/{roomId}/sfu/stats", get(sfu_stats))
}

async fn sfu_stats(State(state): State<RoomState>, Path(room_id): Path<RoomId>) -> ProctorResult<Json<RoomStats>> {
    if !state.sfu_enabled {
        return Err(ProctorError::Unavailable { feature: "sfu".into() });
    }
    let stats = state
        .sfu
        .stats(&room_id)
        .await
        .map_err(|e| ProctorError::Unavailable { feature: e.to_string() })?;
    Ok(Json(stats))
}
