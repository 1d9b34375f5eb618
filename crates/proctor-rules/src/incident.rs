use proctor_common::{RoomId, Severity};
use serde::{Deserialize, Serialize};

use crate::SessionStatus;

/// Wire form of an incident, both as reported by a client/AI producer and
/// as rebroadcast by the engine with authoritative metadata attached.
///
/// `room_id`, `level`, `escalated`, and `session_status` are set by the
/// engine; a caller's `level` is accepted but always overwritten (§9 Open
/// Questions: the authoritative level always wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    #[serde(default)]
    pub room_id: RoomId,
    pub by: String,
    pub tag: String,
    #[serde(default)]
    pub level: Option<Severity>,
    #[serde(default)]
    pub note: Option<String>,
    pub ts: i64,
    #[serde(default)]
    pub escalated: Option<u32>,
    #[serde(default)]
    pub session_status: Option<SessionStatus>,
}
