use proctor_common::{RoomId, UserId};
use serde::Serialize;

use crate::track::TrackLabel;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStats {
    pub user_id: UserId,
    pub tracks: Vec<TrackLabel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctorStats {
    pub senders: usize,
}

/// Response body for `GET /rooms/{roomId}/sfu/stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub room_id: RoomId,
    pub candidates: Vec<CandidateStats>,
    pub candidate_count: usize,
    pub proctor: Option<ProctorStats>,
    pub has_proctor: bool,
}
