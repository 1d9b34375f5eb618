use proctor_common::{RoomId, UserId};
use serde::Serialize;

use crate::scenario::{Scenario, SubAnalysis};

/// One `ai_analysis` frame, delivered to the candidate and the room's
/// proctor (never to observers).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFrame {
    pub timestamp: i64,
    pub candidate_id: UserId,
    pub room_id: RoomId,
    pub scenario: &'static str,
    pub analyses: Vec<SubAnalysis>,
}

impl AnalysisFrame {
    pub fn generate(room_id: RoomId, candidate_id: UserId, now_ms: i64, rng: &mut impl rand::Rng) -> Self {
        let scenario = Scenario::sample(rng);
        Self {
            timestamp: now_ms,
            candidate_id,
            room_id,
            scenario: scenario.as_str(),
            analyses: scenario.analyses(rng),
        }
    }
}
