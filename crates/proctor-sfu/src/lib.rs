//! # proctor-sfu
//!
//! The SFU (Selective Forwarding Unit) core (§C5): one inbound peer
//! connection per candidate, one outbound peer connection per proctor, and
//! the renegotiation bookkeeping that republishes newly arrived candidate
//! tracks onto the proctor's connection.
//!
//! Built on [`str0m`], a Sans-IO WebRTC engine: this crate owns the UDP
//! sockets and drives `Rtc` instances explicitly rather than delegating to
//! a background media thread. Each room runs as a single actor task
//! ([`room::run_sfu_room`]), so its state needs no internal locking — only
//! the manager's room-lookup table is shared.

mod error;
mod peer;
mod room;
mod stats;
mod track;

pub use error::{SfuError, SfuResult};
pub use room::RenegotiationOffer;
pub use stats::{CandidateStats, ProctorStats, RoomStats};
pub use track::{TrackInfo, TrackLabel};

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use proctor_common::{RoomId, UserId};
use tokio::sync::{mpsc, RwLock};

use room::{PeerRef, SfuCommand, SfuResponse};

/// Manages every room's SFU state across the server.
///
/// Mirrors the reference voice server's `SfuManager`: a room-keyed map of
/// command senders, each backed by its own actor task, created lazily on
/// first use and torn down when the room empties.
#[derive(Clone)]
pub struct SfuManager {
    rooms: Arc<RwLock<HashMap<RoomId, mpsc::Sender<SfuCommand>>>>,
    local_ip: IpAddr,
    reneg_tx: mpsc::Sender<RenegotiationOffer>,
    available: bool,
}

impl SfuManager {
    /// `reneg_tx` receives unsolicited proctor renegotiation offers; the
    /// caller is expected to forward each one onto that room's control
    /// channel as `{type:"offer", from:"server", renegotiate:true}`.
    pub fn new(local_ip: IpAddr, reneg_tx: mpsc::Sender<RenegotiationOffer>) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            local_ip,
            reneg_tx,
            available: probe_bindable(local_ip),
        }
    }

    /// Whether the engine's runtime preconditions are met (§4.5
    /// "Failures"). When `false`, every operation below returns
    /// [`SfuError::NotAvailable`] and callers should fall back to P2P
    /// fan-out of `offer`/`answer`/`ice`.
    pub fn is_available(&self) -> bool {
        self.available
    }

    async fn room_sender(&self, room_id: &RoomId) -> mpsc::Sender<SfuCommand> {
        {
            let rooms = self.rooms.read().await;
            if let Some(tx) = rooms.get(room_id) {
                return tx.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        if let Some(tx) = rooms.get(room_id) {
            return tx.clone();
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let room_id_owned = room_id.clone();
        let local_ip = self.local_ip;
        let reneg_tx = self.reneg_tx.clone();
        let rooms_ref = self.rooms.clone();
        let self_tx = cmd_tx.clone();

        tokio::spawn(async move {
            let room_for_log = room_id_owned.clone();
            room::run_sfu_room(room_id_owned.clone(), local_ip, cmd_rx, self_tx, reneg_tx).await;
            rooms_ref.write().await.remove(&room_id_owned);
            tracing::debug!(room = %room_for_log, "SFU room task reaped");
        });

        rooms.insert(room_id.clone(), cmd_tx.clone());
        cmd_tx
    }

    /// A candidate's offer: first PC creation, or a renegotiation if they
    /// already have one in this room.
    pub async fn candidate_offer(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        offer_sdp: String,
        track_info: Vec<TrackInfo>,
    ) -> SfuResult<String> {
        self.require_available()?;
        let tx = self.room_sender(room_id).await;
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        tx.send(SfuCommand::CandidateOffer {
            user_id,
            offer_sdp,
            track_info,
            reply: reply_tx,
        })
        .await
        .map_err(|_| SfuError::RoomGone)?;
        expect_answer(&mut reply_rx).await
    }

    pub async fn proctor_offer(&self, room_id: &RoomId, offer_sdp: String) -> SfuResult<String> {
        self.require_available()?;
        let tx = self.room_sender(room_id).await;
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        tx.send(SfuCommand::ProctorOffer { offer_sdp, reply: reply_tx })
            .await
            .map_err(|_| SfuError::RoomGone)?;
        expect_answer(&mut reply_rx).await
    }

    pub async fn proctor_answer(&self, room_id: &RoomId, answer_sdp: String) -> SfuResult<()> {
        self.require_available()?;
        let tx = self.room_sender(room_id).await;
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        tx.send(SfuCommand::ProctorAnswer { answer_sdp, reply: reply_tx })
            .await
            .map_err(|_| SfuError::RoomGone)?;
        match reply_rx.recv().await {
            Some(SfuResponse::Ack) => Ok(()),
            Some(SfuResponse::Error(e)) => Err(SfuError::Sdp(e)),
            _ => Err(SfuError::RoomGone),
        }
    }

    pub async fn ice_candidate(&self, room_id: &RoomId, from_proctor: bool, from_user: Option<UserId>, candidate: String) {
        let tx = self.room_sender(room_id).await;
        let from = if from_proctor {
            PeerRef::Proctor
        } else {
            PeerRef::Candidate(from_user.unwrap_or_default())
        };
        let _ = tx.send(SfuCommand::IceCandidate { from, candidate }).await;
    }

    pub async fn remove_candidate(&self, room_id: &RoomId, user_id: UserId) {
        if let Some(tx) = self.rooms.read().await.get(room_id).cloned() {
            let _ = tx.send(SfuCommand::RemoveCandidate { user_id }).await;
        }
    }

    pub async fn remove_proctor(&self, room_id: &RoomId) {
        if let Some(tx) = self.rooms.read().await.get(room_id).cloned() {
            let _ = tx.send(SfuCommand::RemoveProctor).await;
        }
    }

    pub async fn stats(&self, room_id: &RoomId) -> SfuResult<RoomStats> {
        self.require_available()?;
        let Some(tx) = self.rooms.read().await.get(room_id).cloned() else {
            return Ok(RoomStats {
                room_id: room_id.clone(),
                candidates: Vec::new(),
                candidate_count: 0,
                proctor: None,
                has_proctor: false,
            });
        };
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        tx.send(SfuCommand::GetStats { reply: reply_tx })
            .await
            .map_err(|_| SfuError::RoomGone)?;
        match reply_rx.recv().await {
            Some(SfuResponse::Stats(s)) => Ok(s),
            _ => Err(SfuError::RoomGone),
        }
    }

    fn require_available(&self) -> SfuResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(SfuError::NotAvailable("no bindable local address".into()))
        }
    }
}

async fn expect_answer(rx: &mut mpsc::Receiver<SfuResponse>) -> SfuResult<String> {
    match rx.recv().await {
        Some(SfuResponse::Answer(sdp)) => Ok(sdp),
        Some(SfuResponse::Error(e)) => Err(SfuError::Sdp(e)),
        _ => Err(SfuError::RoomGone),
    }
}

/// One-time capability probe: can we bind a UDP socket on the configured
/// local address at all? If not, the whole SFU is unavailable for the
/// life of the process (§4.5 "Failures").
fn probe_bindable(local_ip: IpAddr) -> bool {
    std::net::UdpSocket::bind((local_ip, 0)).is_ok()
}
