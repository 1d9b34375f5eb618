//! # proctor-rules
//!
//! The incident rules engine (C1): classifies and escalates tagged
//! observations into leveled incidents, and owns the per-`(room, user)`
//! session state (status, per-code alert counters) that escalation reads
//! and mutates.
//!
//! The engine does no I/O and never blocks, so every session's state lives
//! behind a plain [`std::sync::Mutex`] rather than an async one — there is
//! never an `.await` while the lock is held (§5 of the design this crate
//! implements).

mod incident;
mod session;

pub use incident::Incident;
pub use session::{AlertSummary, SessionState, SessionStatus, SessionSummary};

use proctor_common::{IncidentCode, RoomId, Severity, UserId};
use session::AlertState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Trailing window for A1's "≥3 occurrences" escalation rule, in ms.
const A1_WINDOW_MS: i64 = 15 * 60 * 1000;
const A1_DURATION_MS: i64 = 30_000;
const A4_DURATION_MS: i64 = 60_000;
const A6_DURATION_MS: i64 = 30_000;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

type SessionKey = (RoomId, UserId);

/// Classifies and escalates incidents; owns all session state in-process.
#[derive(Clone)]
pub struct RulesEngine {
    sessions: Arc<RwLock<HashMap<SessionKey, Arc<Mutex<SessionState>>>>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Process one incident for `(room_id, user_id)`, returning the
    /// authoritative, leveled incident.
    ///
    /// Never fails: an incident whose `tag` isn't a recognized taxonomy
    /// code is returned unchanged.
    pub fn process(&self, room_id: &RoomId, user_id: &UserId, incident: Incident) -> Incident {
        self.process_at(room_id, user_id, incident, now_ms())
    }

    /// Same as [`process`](Self::process) but with an explicit clock value,
    /// so escalation-timing tests don't depend on wall-clock time.
    pub fn process_at(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        mut incident: Incident,
        now: i64,
    ) -> Incident {
        let Some(code) = IncidentCode::parse(&incident.tag) else {
            tracing::debug!(tag = %incident.tag, "incident tag not in taxonomy, passing through");
            return incident;
        };

        let session = self.get_or_create(room_id, user_id, now);
        let mut session = session.lock().expect("session mutex poisoned");

        let alert = session.alerts.entry(code).or_default();
        let level = apply_rule(code, alert, &mut session.status, now);

        alert.last_escalated = now;

        incident.room_id = room_id.clone();
        incident.level = level.max(code.default_level());
        incident.escalated = Some(alert.count);
        incident.session_status = Some(session.status);
        incident
    }

    /// Read-only snapshot of a session's summary, or `None` if no incident
    /// has ever been processed for this `(room, user)`.
    pub fn summary(&self, room_id: &RoomId, user_id: &UserId) -> Option<SessionSummary> {
        let key = (room_id.clone(), user_id.clone());
        let sessions = self.sessions.read().expect("sessions lock poisoned");
        let session = sessions.get(&key)?;
        let session = session.lock().expect("session mutex poisoned");
        Some(session.summary())
    }

    /// Drop all session state for a room. Called by the room registry when
    /// the last participant leaves.
    pub fn destroy_room(&self, room_id: &RoomId) {
        let mut sessions = self.sessions.write().expect("sessions lock poisoned");
        sessions.retain(|(r, _), _| r != room_id);
    }

    fn get_or_create(&self, room_id: &RoomId, user_id: &UserId, now: i64) -> Arc<Mutex<SessionState>> {
        let key = (room_id.clone(), user_id.clone());

        if let Some(existing) = self.sessions.read().expect("sessions lock poisoned").get(&key) {
            return existing.clone();
        }

        let mut sessions = self.sessions.write().expect("sessions lock poisoned");
        sessions
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::new(now))))
            .clone()
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the escalation rule for `code`, mutating `alert` and possibly
/// `status`, and returning the computed severity (before the
/// "never below default" floor applied by the caller).
fn apply_rule(
    code: IncidentCode,
    alert: &mut AlertState,
    status: &mut SessionStatus,
    now: i64,
) -> Severity {
    match code {
        IncidentCode::A1 => {
            if alert.first_seen == 0 {
                alert.first_seen = now;
            }
            alert.recent_events.push_back(now);
            while let Some(&oldest) = alert.recent_events.front() {
                if now - oldest > A1_WINDOW_MS {
                    alert.recent_events.pop_front();
                } else {
                    break;
                }
            }

            let mut level = Severity::S1;
            if now - alert.first_seen > A1_DURATION_MS {
                level = Severity::S2;
                alert.count += 1;
                alert.first_seen = 0;
            }
            if alert.recent_events.len() >= 3 {
                level = level.max(Severity::S2);
            }
            level
        }

        IncidentCode::A2 => {
            alert.count += 1;
            if alert.count >= 2 {
                Severity::S3
            } else {
                Severity::S2
            }
        }

        IncidentCode::A3 => {
            alert.count += 1;
            if alert.count >= 5 {
                *status = status.escalate(SessionStatus::Paused);
                Severity::S3
            } else if alert.count >= 3 {
                Severity::S2
            } else {
                Severity::S1
            }
        }

        IncidentCode::A4 => {
            if alert.first_seen == 0 {
                alert.first_seen = now;
            }
            if now - alert.first_seen > A4_DURATION_MS {
                alert.count += 1;
                alert.first_seen = 0;
                *status = status.escalate(SessionStatus::Paused);
                Severity::S3
            } else {
                Severity::S2
            }
        }

        IncidentCode::A5 => {
            alert.count += 1;
            if alert.count > 1 {
                *status = status.escalate(SessionStatus::Paused);
                Severity::S3
            } else {
                Severity::S2
            }
        }

        IncidentCode::A6 => {
            // Unlike A1/A4, a breach here doesn't reset `first_seen` or bump
            // `count` — once past the duration threshold, every subsequent
            // event for this code keeps reading the same elapsed duration and
            // stays at S3 for the rest of the session.
            if alert.first_seen == 0 {
                alert.first_seen = now;
            }
            if now - alert.first_seen > A6_DURATION_MS {
                Severity::S3
            } else {
                Severity::S2
            }
        }

        IncidentCode::A10 => {
            alert.count += 1;
            *status = status.escalate(SessionStatus::Paused);
            Severity::S3
        }

        IncidentCode::A7 | IncidentCode::A8 | IncidentCode::A9 | IncidentCode::A11 => {
            alert.count += 1;
            code.default_level()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(tag: &str, by: &str, ts: i64) -> Incident {
        Incident {
            room_id: String::new(),
            by: by.to_string(),
            tag: tag.to_string(),
            level: None,
            note: None,
            ts,
            escalated: None,
            session_status: None,
        }
    }

    #[test]
    fn a1_escalates_after_30s_inclusive_boundary() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        let first = engine.process_at(&room, &user, incident("A1", "ai", 0), 0);
        assert_eq!(first.level, Some(Severity::S1));

        // exactly 30s later: not yet > 30s, stays S1
        let boundary = engine.process_at(&room, &user, incident("A1", "ai", 30_000), 30_000);
        assert_eq!(boundary.level, Some(Severity::S1));
    }

    #[test]
    fn a1_escalates_once_past_30s() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        engine.process_at(&room, &user, incident("A1", "ai", 0), 0);
        let after = engine.process_at(&room, &user, incident("A1", "ai", 30_001), 30_001);
        assert_eq!(after.level, Some(Severity::S2));
    }

    #[test]
    fn a3_escalation_table() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        let expected = [
            Severity::S1,
            Severity::S1,
            Severity::S2,
            Severity::S2,
            Severity::S3,
        ];

        for (i, want) in expected.iter().enumerate() {
            let out = engine.process_at(&room, &user, incident("A3", "ai", i as i64), i as i64);
            assert_eq!(out.level, Some(*want), "event #{i}");
        }

        let summary = engine.summary(&room, &user).unwrap();
        assert_eq!(summary.status, SessionStatus::Paused);
    }

    #[test]
    fn a2_escalation_table() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        let first = engine.process_at(&room, &user, incident("A2", "ai", 0), 0);
        assert_eq!(first.level, Some(Severity::S2));
        let second = engine.process_at(&room, &user, incident("A2", "ai", 1), 1);
        assert_eq!(second.level, Some(Severity::S3));
    }

    #[test]
    fn a10_pauses_immediately() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        let out = engine.process_at(&room, &user, incident("A10", "ai", 0), 0);
        assert_eq!(out.level, Some(Severity::S3));
        assert_eq!(out.session_status, Some(SessionStatus::Paused));
    }

    #[test]
    fn status_never_reverts_from_paused() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        engine.process_at(&room, &user, incident("A10", "ai", 0), 0);
        // a low-severity incident afterwards must not un-pause the session
        let out = engine.process_at(&room, &user, incident("A11", "ai", 1), 1);
        assert_eq!(out.session_status, Some(SessionStatus::Paused));
    }

    #[test]
    fn unknown_tag_passes_through_unchanged() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        let out = engine.process_at(&room, &user, incident("Z9", "ai", 0), 0);
        assert_eq!(out.level, None);
        assert_eq!(out.escalated, None);
    }

    #[test]
    fn repeated_incident_is_not_merged() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        let first = engine.process_at(&room, &user, incident("A2", "ai", 0), 0);
        let second = engine.process_at(&room, &user, incident("A2", "ai", 1), 1);
        assert_eq!(first.escalated, Some(1));
        assert_eq!(second.escalated, Some(2));
    }

    #[test]
    fn a6_breach_is_sticky_s3() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        let first = engine.process_at(&room, &user, incident("A6", "ai", 0), 0);
        assert_eq!(first.level, Some(Severity::S2));

        let breach = engine.process_at(&room, &user, incident("A6", "ai", 30_001), 30_001);
        assert_eq!(breach.level, Some(Severity::S3));

        // no reset on breach: later events keep reading S3, not dropping
        // back to S2 the way A1/A4's reset-on-breach codes would.
        let later = engine.process_at(&room, &user, incident("A6", "ai", 30_500), 30_500);
        assert_eq!(later.level, Some(Severity::S3));
    }

    #[test]
    fn destroy_room_clears_sessions() {
        let engine = RulesEngine::new();
        let room = "r1".to_string();
        let user = "c1".to_string();

        engine.process_at(&room, &user, incident("A1", "ai", 0), 0);
        assert!(engine.summary(&room, &user).is_some());

        engine.destroy_room(&room);
        assert!(engine.summary(&room, &user).is_none());
    }
}
