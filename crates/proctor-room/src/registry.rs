use std::collections::HashMap;
use std::sync::Arc;

use proctor_common::RoomId;
use tokio::sync::Mutex;

use crate::room::Room;

/// Thread-safe map of `roomId → Room` (§4.1). Rooms are created lazily and
/// garbage-collected the moment they empty; the registry is the only thing
/// allowed to create or destroy them.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, Arc<Room>>>,
    max_incidents_per_room: usize,
}

impl RoomRegistry {
    pub fn new(max_incidents_per_room: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            max_incidents_per_room,
        }
    }

    pub async fn get_or_create(&self, room_id: &RoomId) -> Arc<Room> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(Room::new(room_id.clone(), self.max_incidents_per_room)))
            .clone()
    }

    pub async fn get(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.lock().await.get(room_id).cloned()
    }

    /// Drop the room if it has no participants left. Callers must not hold
    /// onto a `Room` reference across this call if they expect the room to
    /// be freed — "look up, operate, drop".
    pub async fn remove_if_empty(&self, room_id: &RoomId) {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get(room_id) else { return };
        if room.participant_count().await == 0 {
            rooms.remove(room_id);
            tracing::info!(room = %room_id, "room destroyed (empty)");
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Find the room a participant is currently in, scanning every room.
    ///
    /// Used by the `POST /api/analysis/stop/{candidateId}` endpoint, whose
    /// path carries no `roomId` — a candidate's id is expected to be unique
    /// across the server at any one time, so a linear scan over the (small)
    /// set of live rooms is good enough.
    pub async fn find_room_containing(&self, user_id: &str) -> Option<Arc<Room>> {
        let rooms = self.rooms.lock().await;
        for room in rooms.values() {
            if room.has_participant(&user_id.to_string()).await {
                return Some(room.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_common::Role;

    #[tokio::test]
    async fn room_is_destroyed_once_last_participant_leaves() {
        let registry = RoomRegistry::new(100);
        let room_id = "r1".to_string();
        let room = registry.get_or_create(&room_id).await;
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        room.join("u1".to_string(), Role::Candidate, tx).await.unwrap();

        registry.remove_if_empty(&room_id).await;
        assert!(registry.get(&room_id).await.is_some(), "room with a participant must survive");

        room.leave(&"u1".to_string()).await;
        registry.remove_if_empty(&room_id).await;
        assert!(registry.get(&room_id).await.is_none(), "empty room must be destroyed");
    }

    #[tokio::test]
    async fn get_or_create_returns_the_same_room_instance() {
        let registry = RoomRegistry::new(100);
        let room_id = "r1".to_string();
        let a = registry.get_or_create(&room_id).await;
        let b = registry.get_or_create(&room_id).await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
