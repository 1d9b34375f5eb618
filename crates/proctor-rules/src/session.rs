use proctor_common::IncidentCode;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A candidate session's lifecycle status. Ordered so escalation can only
/// move forward: `Active < Paused < Ended`, and `SessionStatus::escalate`
/// never moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Ended,
}

impl SessionStatus {
    /// Move to `target` unless that would be a regression in severity.
    pub fn escalate(self, target: SessionStatus) -> SessionStatus {
        self.max(target)
    }
}

/// Per-code alert state tracked within a session.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    /// Timestamp (ms) the current unbroken occurrence run started, or `0`
    /// if none is in progress. Used by the duration-based rules (A1/A4/A6).
    pub first_seen: i64,
    pub count: u32,
    pub last_escalated: i64,
    pub cooldown_until: i64,
    /// Timestamps of recent occurrences within the trailing window, used by
    /// A1's "≥3 in 15 minutes" rule.
    pub(crate) recent_events: VecDeque<i64>,
}

/// All rules-engine state for one `(room_id, user_id)` candidate session.
pub struct SessionState {
    pub started_at: i64,
    pub status: SessionStatus,
    pub alerts: HashMap<IncidentCode, AlertState>,
}

impl SessionState {
    pub fn new(started_at: i64) -> Self {
        Self {
            started_at,
            status: SessionStatus::Active,
            alerts: HashMap::new(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            status: self.status,
            alerts_count: self.alerts.len(),
            alerts: self
                .alerts
                .iter()
                .map(|(code, state)| {
                    (
                        code.as_str().to_string(),
                        AlertSummary {
                            count: state.count,
                            last: state.last_escalated,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub count: u32,
    pub last: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub status: SessionStatus,
    pub alerts_count: usize,
    pub alerts: HashMap<String, AlertSummary>,
}
