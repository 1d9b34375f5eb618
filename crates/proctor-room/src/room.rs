use std::collections::HashMap;

use proctor_common::{Role, RoomId, UserId};
use proctor_rules::Incident;
use tokio::sync::{mpsc, Mutex};

use crate::protocol::{ControlMessage, RosterEntry};

pub struct Participant {
    pub role: Role,
    outbox: mpsc::UnboundedSender<ControlMessage>,
}

#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error("user_exists")]
    UserExists,
}

struct RoomInner {
    participants: HashMap<UserId, Participant>,
    incidents: Vec<Incident>,
}

/// A single proctoring session room (§3 Data model, §4.3 Broadcaster).
///
/// One mutex covers the participant map and the incident list, per §5: the
/// broadcaster snapshots participants under the lock, then sends outside
/// it so a slow peer never blocks the others.
pub struct Room {
    pub room_id: RoomId,
    inner: Mutex<RoomInner>,
    max_incidents: usize,
}

impl Room {
    pub fn new(room_id: RoomId, max_incidents: usize) -> Self {
        Self {
            room_id,
            inner: Mutex::new(RoomInner {
                participants: HashMap::new(),
                incidents: Vec::new(),
            }),
            max_incidents,
        }
    }

    /// Add a participant. Rejects a `userId` already present in the room
    /// (§3: "a second join with the same userId is a protocol error").
    /// Returns the roster snapshot *including* the joiner, per §4.2 step 1.
    pub async fn join(
        &self,
        user_id: UserId,
        role: Role,
        outbox: mpsc::UnboundedSender<ControlMessage>,
    ) -> Result<Vec<RosterEntry>, JoinError> {
        let mut inner = self.inner.lock().await;
        if inner.participants.contains_key(&user_id) {
            return Err(JoinError::UserExists);
        }
        inner.participants.insert(user_id.clone(), Participant { role, outbox });
        Ok(inner
            .participants
            .iter()
            .map(|(id, p)| RosterEntry { user_id: id.clone(), role: p.role })
            .collect())
    }

    pub async fn leave(&self, user_id: &UserId) -> Option<Role> {
        let mut inner = self.inner.lock().await;
        inner.participants.remove(user_id).map(|p| p.role)
    }

    pub async fn participant_count(&self) -> usize {
        self.inner.lock().await.participants.len()
    }

    pub async fn has_participant(&self, user_id: &UserId) -> bool {
        self.inner.lock().await.participants.contains_key(user_id)
    }

    /// The room's proctor, if one has joined (§3: at most one is
    /// meaningful; the first one found is authoritative).
    pub async fn proctor_id(&self) -> Option<UserId> {
        let inner = self.inner.lock().await;
        inner
            .participants
            .iter()
            .find(|(_, p)| p.role == Role::Proctor)
            .map(|(id, _)| id.clone())
    }

    pub async fn roster(&self) -> Vec<RosterEntry> {
        let inner = self.inner.lock().await;
        inner
            .participants
            .iter()
            .map(|(id, p)| RosterEntry { user_id: id.clone(), role: p.role })
            .collect()
    }

    /// Best-effort delivery to one participant (§4.3). A send failure is
    /// logged and swallowed — it never propagates to the caller.
    pub async fn send_to(&self, user_id: &UserId, msg: ControlMessage) {
        let inner = self.inner.lock().await;
        if let Some(p) = inner.participants.get(user_id) {
            if p.outbox.send(msg).is_err() {
                tracing::debug!(room = %self.room_id, user = %user_id, "dropped message to disconnected peer");
            }
        }
    }

    /// Fan out to every participant except `sender_id` (§4.2 routing
    /// policy default case).
    pub async fn broadcast_except(&self, sender_id: &UserId, msg: ControlMessage) {
        let inner = self.inner.lock().await;
        let targets: Vec<_> = inner
            .participants
            .iter()
            .filter(|(id, _)| *id != sender_id)
            .map(|(id, p)| (id.clone(), p.outbox.clone()))
            .collect();
        drop(inner);
        for (id, outbox) in targets {
            if outbox.send(msg.clone()).is_err() {
                tracing::debug!(room = %self.room_id, user = %id, "dropped broadcast to disconnected peer");
            }
        }
    }

    /// Fan out to every participant, including a would-be sender (used for
    /// server-originated events like `participant_joined`/`_left`).
    pub async fn broadcast_all(&self, msg: ControlMessage) {
        let inner = self.inner.lock().await;
        let targets: Vec<_> = inner.participants.values().map(|p| p.outbox.clone()).collect();
        drop(inner);
        for outbox in targets {
            let _ = outbox.send(msg.clone());
        }
    }

    pub async fn push_incident(&self, incident: Incident) {
        let mut inner = self.inner.lock().await;
        inner.incidents.push(incident);
        if inner.incidents.len() > self.max_incidents {
            let excess = inner.incidents.len() - self.max_incidents;
            inner.incidents.drain(0..excess);
        }
    }

    pub async fn incidents(&self) -> Vec<Incident> {
        self.inner.lock().await.incidents.clone()
    }
}
