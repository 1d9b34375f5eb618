//! `GET`/`POST /rooms/{roomId}/incidents` (§4.7).

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use proctor_common::{ProctorError, ProctorResult, RoomId, Severity};
use proctor_room::{ControlMessage, IncidentBody, RoomState};
use proctor_rules::Incident;
use serde::Deserialize;

pub fn router() -> Router<RoomState> {
    Router::new().route("/rooms/{roomId}/incidents", get(list_incidents).post(report_incident))
}

async fn list_incidents(State(state): State<RoomState>, Path(room_id): Path<RoomId>) -> ProctorResult<Json<Vec<Incident>>> {
    let room = state
        .registry
        .get(&room_id)
        .await
        .ok_or_else(|| ProctorError::NotFound { resource: "room".into() })?;
    Ok(Json(room.incidents().await))
}

#[derive(Debug, Deserialize)]
pub struct IncidentReport {
    pub tag: Option<String>,
    pub level: Option<Severity>,
    pub note: Option<String>,
    pub ts: Option<i64>,
    pub by: Option<String>,
}

/// Append an externally reported incident. Runs through the same rules
/// engine as control-channel incidents (§4.4), so a condition reported
/// over REST escalates identically to one reported by a connected client.
async fn report_incident(
    State(state): State<RoomState>,
    Path(room_id): Path<RoomId>,
    Json(report): Json<IncidentReport>,
) -> ProctorResult<Json<Incident>> {
    let room = state
        .registry
        .get(&room_id)
        .await
        .ok_or_else(|| ProctorError::NotFound { resource: "room".into() })?;

    let (Some(tag), Some(level), Some(note), Some(ts), Some(by)) =
        (report.tag, report.level, report.note, report.ts, report.by)
    else {
        return Err(ProctorError::Validation { message: "tag, level, note, ts, and by are required".into() });
    };

    let incident = Incident {
        room_id: room_id.clone(),
        by: by.clone(),
        tag,
        level: Some(level),
        note: Some(note),
        ts,
        escalated: None,
        session_status: None,
    };

    let processed = state.rules.process(&room_id, &by, incident);
    room.push_incident(processed.clone()).await;
    room.broadcast_all(ControlMessage::Incident(to_incident_body(processed.clone()))).await;

    Ok(Json(processed))
}

fn to_incident_body(incident: Incident) -> IncidentBody {
    IncidentBody {
        tag: incident.tag,
        level: incident.level,
        note: incident.note,
        ts: incident.ts,
        by: incident.by,
        room_id: Some(incident.room_id),
        escalated: incident.escalated,
        session_status: incident.session_status,
    }
}
