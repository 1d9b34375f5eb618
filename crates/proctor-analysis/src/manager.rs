use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use proctor_common::{RoomId, UserId};
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;

use crate::frame::AnalysisFrame;

const MIN_INTERVAL_SECS: u64 = 2;
const MAX_INTERVAL_SECS: u64 = 5;
const STOP_GRACE: Duration = Duration::from_secs(1);

/// A frame ready for delivery, tagged with which room/candidate produced
/// it — the caller fans it out to the candidate and the room's proctor.
#[derive(Debug)]
pub struct DeliveredFrame {
    pub room_id: RoomId,
    pub candidate_id: UserId,
    pub frame: AnalysisFrame,
}

struct RunningTask {
    stop_tx: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

/// One emitter task per `(roomId, candidateId)`, per §4.6.
#[derive(Clone)]
pub struct AnalysisManager {
    tasks: Arc<Mutex<HashMap<(RoomId, UserId), RunningTask>>>,
    frame_tx: tokio::sync::mpsc::Sender<DeliveredFrame>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("already_running")]
    AlreadyRunning,
    #[error("not_running")]
    NotRunning,
}

impl AnalysisManager {
    pub fn new(frame_tx: tokio::sync::mpsc::Sender<DeliveredFrame>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            frame_tx,
        }
    }

    /// Start the emitter for a candidate. Returns `AlreadyRunning` if one
    /// is already active for this `(roomId, candidateId)` rather than
    /// spawning a second task.
    pub async fn start(&self, room_id: RoomId, candidate_id: UserId) -> Result<(), AnalysisError> {
        let key = (room_id.clone(), candidate_id.clone());
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&key) {
            return Err(AnalysisError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let frame_tx = self.frame_tx.clone();
        let handle = tokio::spawn(run_emitter(room_id, candidate_id, frame_tx, stop_rx));
        tasks.insert(key, RunningTask { stop_tx, handle });
        Ok(())
    }

    /// Stop the emitter for a candidate, awaiting its exit up to
    /// [`STOP_GRACE`] before abandoning the join (the task itself still
    /// gets the cancellation signal and will wind down).
    pub async fn stop(&self, room_id: &RoomId, candidate_id: &UserId) -> Result<(), AnalysisError> {
        let key = (room_id.clone(), candidate_id.clone());
        let task = {
            let mut tasks = self.tasks.lock().await;
            tasks.remove(&key)
        };
        let Some(task) = task else {
            return Err(AnalysisError::NotRunning);
        };
        let _ = task.stop_tx.send(());
        let _ = tokio::time::timeout(STOP_GRACE, task.handle).await;
        Ok(())
    }

    pub async fn is_running(&self, room_id: &RoomId, candidate_id: &UserId) -> bool {
        self.tasks.lock().await.contains_key(&(room_id.clone(), candidate_id.clone()))
    }
}

async fn run_emitter(
    room_id: RoomId,
    candidate_id: UserId,
    frame_tx: tokio::sync::mpsc::Sender<DeliveredFrame>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut rng = rand::rng();
    loop {
        let delay = jitter_delay(&mut rng);
        tokio::select! {
            _ = &mut stop_rx => {
                tracing::debug!(room = %room_id, candidate = %candidate_id, "analysis emitter stopped");
                return;
            }
            _ = tokio::time::sleep_until(Instant::now() + delay) => {}
        }

        let now_ms = chrono::Utc::now().timestamp_millis();
        let frame = AnalysisFrame::generate(room_id.clone(), candidate_id.clone(), now_ms, &mut rng);
        if frame_tx
            .send(DeliveredFrame {
                room_id: room_id.clone(),
                candidate_id: candidate_id.clone(),
                frame,
            })
            .await
            .is_err()
        {
            return;
        }
    }
}

fn jitter_delay(rng: &mut impl rand::Rng) -> Duration {
    Duration::from_secs(rng.random_range(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn restart_while_running_is_rejected() {
        let (tx, _rx) = tokio::sync::mpsc::channel(16);
        let manager = AnalysisManager::new(tx);
        manager.start("r1".to_string(), "u1".to_string()).await.unwrap();
        let err = manager.start("r1".to_string(), "u1".to_string()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::AlreadyRunning));
        manager.stop(&"r1".to_string(), &"u1".to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn stopping_a_task_that_never_started_errors() {
        let (tx, _rx) = tokio::sync::mpsc::channel(16);
        let manager = AnalysisManager::new(tx);
        let err = manager.stop(&"r1".to_string(), &"u1".to_string()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NotRunning));
    }

    #[tokio::test]
    async fn stop_then_restart_succeeds() {
        let (tx, _rx) = tokio::sync::mpsc::channel(16);
        let manager = AnalysisManager::new(tx);
        manager.start("r1".to_string(), "u1".to_string()).await.unwrap();
        manager.stop(&"r1".to_string(), &"u1".to_string()).await.unwrap();
        assert!(manager.start("r1".to_string(), "u1".to_string()).await.is_ok());
        manager.stop(&"r1".to_string(), &"u1".to_string()).await.unwrap();
    }
}
