//! Peer connections driven by `str0m` in Sans-IO style: we own the UDP
//! socket and feed/drain the `Rtc` state machine ourselves rather than
//! handing media off to a background thread.

use std::net::SocketAddr;
use std::sync::Arc;

use proctor_common::UserId;
use str0m::change::{SdpAnswer, SdpOffer, SdpPendingOffer};
use str0m::media::{MediaKind, Mid};
use str0m::{Candidate, Rtc};
use tokio::net::UdpSocket;

use crate::error::{SfuError, SfuResult};
use crate::track::{LabelFallback, PublishedTrack, TrackInfo, TrackLabel};

/// Build a fresh, server-side `Rtc` bound to a freshly allocated local UDP
/// socket. ICE-lite, since we are always the answerer-side peer and never
/// need full ICE agent behavior.
async fn new_rtc(local_ip: std::net::IpAddr, ice_lite: bool) -> SfuResult<(Rtc, Arc<UdpSocket>, SocketAddr)> {
    let socket = UdpSocket::bind(SocketAddr::new(local_ip, 0))
        .await
        .map_err(|e| SfuError::NotAvailable(e.to_string()))?;
    let local_addr = socket.local_addr()?;

    let mut rtc = Rtc::builder().set_ice_lite(ice_lite).build();

    let candidate = Candidate::host(local_addr, str0m::net::Protocol::Udp)
        .map_err(|e| SfuError::Sdp(e.to_string()))?;
    rtc.add_local_candidate(candidate);

    Ok((rtc, Arc::new(socket), local_addr))
}

/// One candidate's inbound peer connection: receives up to three labeled
/// tracks (camera, screen, audio).
pub struct CandidatePeer {
    pub user_id: UserId,
    pub rtc: Rtc,
    pub socket: Arc<UdpSocket>,
    pub local_addr: SocketAddr,
    /// Tracks published by this candidate, keyed by their negotiated `Mid`.
    pub tracks: std::collections::HashMap<Mid, PublishedTrack>,
    /// `trackId -> label` as announced in `trackInfo`, applied as tracks
    /// negotiate even if they arrive unlabeled.
    pub declared_labels: std::collections::HashMap<String, TrackLabel>,
    pub label_fallback: LabelFallback,
}

impl CandidatePeer {
    /// First offer from a new candidate: §4.5 step 1.
    pub async fn create(
        user_id: UserId,
        local_ip: std::net::IpAddr,
        offer_sdp: &str,
        track_info: &[TrackInfo],
    ) -> SfuResult<(Self, String)> {
        let (mut rtc, socket, local_addr) = new_rtc(local_ip, true).await?;

        let offer = SdpOffer::from_sdp_string(offer_sdp).map_err(|e| SfuError::Sdp(e.to_string()))?;
        let answer = rtc
            .sdp_api()
            .accept_offer(offer)
            .map_err(|e| SfuError::Sdp(e.to_string()))?;

        let declared_labels = track_info
            .iter()
            .map(|t| (t.track_id.clone(), t.label))
            .collect();

        Ok((
            Self {
                user_id,
                rtc,
                socket,
                local_addr,
                tracks: std::collections::HashMap::new(),
                declared_labels,
                label_fallback: LabelFallback::default(),
            },
            answer.to_sdp_string(),
        ))
    }

    /// A later offer from a candidate that already has a PC: §4.5 step 2.
    /// Merges new `trackInfo` and renegotiates; previously negotiated
    /// tracks are untouched.
    pub fn renegotiate(&mut self, offer_sdp: &str, track_info: &[TrackInfo]) -> SfuResult<String> {
        for t in track_info {
            self.declared_labels.insert(t.track_id.clone(), t.label);
        }

        let offer = SdpOffer::from_sdp_string(offer_sdp).map_err(|e| SfuError::Sdp(e.to_string()))?;
        let answer = self
            .rtc
            .sdp_api()
            .accept_offer(offer)
            .map_err(|e| SfuError::Sdp(e.to_string()))?;

        Ok(answer.to_sdp_string())
    }

    /// Resolve the label for a newly negotiated track: declared label if
    /// `trackInfo` named it, otherwise the fallback assignment order.
    pub fn label_for(&mut self, track_id: &str, kind: MediaKind) -> TrackLabel {
        if let Some(label) = self.declared_labels.get(track_id) {
            return *label;
        }
        self.label_fallback.assign(kind)
    }

    pub fn record_track(&mut self, mid: Mid, track_id: String, label: TrackLabel) {
        self.tracks.insert(mid, PublishedTrack { track_id, label, mid });
    }
}

/// Tracks a proctor PC's outstanding renegotiation: an offer sent, waiting
/// on the matching answer.
pub struct PendingRenegotiation {
    pub pending: SdpPendingOffer,
    /// Track ids that this offer added senders for, so coalescing can check
    /// what's already in flight.
    pub adding: Vec<String>,
}

/// The room's single outbound peer connection to the proctor.
pub struct ProctorPeer {
    pub rtc: Rtc,
    pub socket: Arc<UdpSocket>,
    pub local_addr: SocketAddr,
    /// `trackId -> Mid` for each sender currently on this PC.
    pub senders: std::collections::HashMap<String, Mid>,
    pub pending: Option<PendingRenegotiation>,
}

impl ProctorPeer {
    /// §4.5 proctor-join step: answer with whatever outbound tracks
    /// currently exist for the room (possibly none).
    pub async fn create(
        local_ip: std::net::IpAddr,
        offer_sdp: &str,
        existing_tracks: &[(&str, MediaKind)],
    ) -> SfuResult<(Self, String)> {
        let (mut rtc, socket, local_addr) = new_rtc(local_ip, true).await?;

        let offer = SdpOffer::from_sdp_string(offer_sdp).map_err(|e| SfuError::Sdp(e.to_string()))?;
        let mut api = rtc.sdp_api();
        // The answer is produced from `accept_offer` directly; any sender
        // media lines we want are added via a follow-up renegotiation once
        // `create` returns. The offer itself only contains the proctor's
        // own (empty, receive-less) media intent.
        let answer = api.accept_offer(offer).map_err(|e| SfuError::Sdp(e.to_string()))?;

        let senders = std::collections::HashMap::new();
        let _ = existing_tracks; // attached via the first post-join renegotiation

        Ok((
            Self {
                rtc,
                socket,
                local_addr,
                senders,
                pending: None,
            },
            answer.to_sdp_string(),
        ))
    }

    /// Add send-only media for each new track (deduped by id against
    /// current senders by the caller) and produce an offer, per §4.5
    /// "Proctor renegotiation".
    pub fn offer_new_tracks(&mut self, new_tracks: &[(String, MediaKind)]) -> SfuResult<Option<String>> {
        if new_tracks.is_empty() {
            return Ok(None);
        }
        if self.pending.is_some() {
            // A renegotiation is already outstanding; the caller is
            // responsible for coalescing and must not call this twice.
            return Ok(None);
        }

        let mut api = self.rtc.sdp_api();
        let mut mids = Vec::with_capacity(new_tracks.len());
        for (track_id, kind) in new_tracks {
            let mid = api.add_media(*kind, str0m::media::Direction::SendOnly, None, None, None);
            mids.push((track_id.clone(), mid));
        }

        match api.apply() {
            Some((offer, pending)) => {
                for (track_id, mid) in &mids {
                    self.senders.insert(track_id.clone(), *mid);
                }
                self.pending = Some(PendingRenegotiation {
                    pending,
                    adding: new_tracks.iter().map(|(id, _)| id.clone()).collect(),
                });
                Ok(Some(offer.to_sdp_string()))
            }
            None => Ok(None),
        }
    }

    /// Apply the proctor's answer to our outstanding offer. A mismatched
    /// answer (no outstanding offer) is logged by the caller and dropped,
    /// per §4.5.
    pub fn accept_answer(&mut self, answer_sdp: &str) -> SfuResult<()> {
        let Some(PendingRenegotiation { pending, .. }) = self.pending.take() else {
            return Err(SfuError::Sdp("no outstanding offer".into()));
        };
        let answer = SdpAnswer::from_sdp_string(answer_sdp).map_err(|e| SfuError::Sdp(e.to_string()))?;
        self.rtc
            .sdp_api()
            .accept_answer(pending, answer)
            .map_err(|e| SfuError::Sdp(e.to_string()))?;
        Ok(())
    }

    pub fn remove_senders_for(&mut self, track_ids: &[String]) {
        for id in track_ids {
            self.senders.remove(id);
        }
    }
}
