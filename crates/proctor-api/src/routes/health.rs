//! `GET /health` — liveness/readiness for load balancers (§4.7).

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use proctor_room::RoomState;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    ok: bool,
    sfu_enabled: bool,
    ai_analysis_enabled: bool,
    mode: &'static str,
}

pub fn router() -> Router<RoomState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<RoomState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        sfu_enabled: state.sfu_enabled,
        ai_analysis_enabled: state.ai_enabled,
        mode: if state.sfu_enabled { "SFU" } else { "P2P" },
    })
}
