//! Control-channel wire protocol (§4.2, §6): one JSON object per message,
//! tagged by `type`.

use proctor_common::{Role, Severity, UserId};
use proctor_rules::SessionStatus;
use proctor_sfu::TrackInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "join")]
    Join { #[serde(rename = "userId")] user_id: Option<UserId>, role: Option<Role> },

    #[serde(rename = "roster")]
    Roster { participants: Vec<RosterEntry> },

    #[serde(rename = "participant_joined")]
    ParticipantJoined { #[serde(rename = "userId")] user_id: UserId, role: Role },

    #[serde(rename = "participant_left")]
    ParticipantLeft {
        #[serde(rename = "userId")]
        user_id: UserId,
        #[serde(default)]
        role: Option<Role>,
    },

    #[serde(rename = "offer")]
    Offer(SdpBody),

    #[serde(rename = "answer")]
    Answer(SdpBody),

    #[serde(rename = "ice")]
    Ice {
        candidate: IceCandidate,
        #[serde(default, rename = "to")]
        to: Option<UserId>,
        #[serde(default, rename = "from")]
        from: Option<UserId>,
    },

    #[serde(rename = "chat")]
    Chat {
        #[serde(default, rename = "to")]
        to: Option<UserId>,
        #[serde(default, rename = "from")]
        from: Option<UserId>,
        #[serde(flatten)]
        body: serde_json::Map<String, serde_json::Value>,
    },

    #[serde(rename = "incident")]
    Incident(IncidentBody),

    #[serde(rename = "ai_analysis")]
    AiAnalysis { data: serde_json::Value },

    #[serde(rename = "error")]
    Error { reason: String },

    #[serde(rename = "leave")]
    Leave {},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdpBody {
    pub sdp: String,
    #[serde(default, rename = "trackInfo")]
    pub track_info: Option<Vec<TrackInfo>>,
    #[serde(default)]
    pub to: Option<UserId>,
    #[serde(default)]
    pub from: Option<UserId>,
    #[serde(default)]
    pub renegotiate: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentBody {
    pub tag: String,
    #[serde(default)]
    pub level: Option<Severity>,
    #[serde(default)]
    pub note: Option<String>,
    pub ts: i64,
    pub by: String,
    #[serde(default, rename = "roomId")]
    pub room_id: Option<String>,
    #[serde(default)]
    pub escalated: Option<u32>,
    #[serde(default, rename = "sessionStatus")]
    pub session_status: Option<SessionStatus>,
}
