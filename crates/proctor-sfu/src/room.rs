//! One room's SFU state, run as a single actor task.
//!
//! A single task owning every peer in the room means no locking is needed
//! inside it: commands arrive serialized over the channel, str0m state is
//! mutated in place, and renegotiation bookkeeping (coalescing, debounce,
//! the screen-share follow-on) is plain sequential code.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use proctor_common::{RoomId, UserId};
use str0m::media::MediaKind;
use str0m::Input;
use tokio::sync::mpsc;

use crate::error::{SfuError, SfuResult};
use crate::peer::{CandidatePeer, ProctorPeer};
use crate::stats::{CandidateStats, ProctorStats, RoomStats};
use crate::track::TrackInfo;

/// Which peer a raw command targets or a network datagram arrived on.
#[derive(Debug, Clone)]
pub enum PeerRef {
    Candidate(UserId),
    Proctor,
}

#[derive(Debug)]
pub enum SfuCommand {
    CandidateOffer {
        user_id: UserId,
        offer_sdp: String,
        track_info: Vec<TrackInfo>,
        reply: mpsc::Sender<SfuResponse>,
    },
    ProctorOffer {
        offer_sdp: String,
        reply: mpsc::Sender<SfuResponse>,
    },
    ProctorAnswer {
        answer_sdp: String,
        reply: mpsc::Sender<SfuResponse>,
    },
    IceCandidate {
        from: PeerRef,
        candidate: String,
    },
    RemoveCandidate {
        user_id: UserId,
    },
    RemoveProctor,
    GetStats {
        reply: mpsc::Sender<SfuResponse>,
    },
    /// Raw datagram read by a peer's socket pump task.
    Receive {
        from: PeerRef,
        data: Vec<u8>,
        addr: std::net::SocketAddr,
    },
    /// Fired by a debounce timer; flush whatever track batch is queued.
    FlushRenegotiation,
    Shutdown,
}

#[derive(Debug)]
pub enum SfuResponse {
    Answer(String),
    Stats(RoomStats),
    Ack,
    Error(String),
}

/// A new or pending track waiting to be added as a proctor sender.
type PendingTrack = (String, MediaKind);

/// An unsolicited renegotiation offer, handed off to the control channel
/// layer for delivery to the proctor as `{type:"offer", from:"server",
/// renegotiate:true}`.
#[derive(Debug, Clone)]
pub struct RenegotiationOffer {
    pub room_id: RoomId,
    pub sdp: String,
}

const INITIAL_DEBOUNCE_MS: u64 = 200;
const SCREEN_DEBOUNCE_MS: u64 = 50;

pub async fn run_sfu_room(
    room_id: RoomId,
    local_ip: IpAddr,
    mut cmd_rx: mpsc::Receiver<SfuCommand>,
    cmd_tx: mpsc::Sender<SfuCommand>,
    reneg_tx: mpsc::Sender<RenegotiationOffer>,
) {
    let mut candidates: HashMap<UserId, CandidatePeer> = HashMap::new();
    let mut proctor: Option<ProctorPeer> = None;

    // Tracks queued for the in-flight or next renegotiation batch.
    let mut queued: Vec<PendingTrack> = Vec::new();
    let mut debounce_running = false;
    // Tracks that arrived while an offer was already outstanding; they
    // become the next batch once the current one settles.
    let mut deferred: Vec<PendingTrack> = Vec::new();

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            SfuCommand::CandidateOffer {
                user_id,
                offer_sdp,
                track_info,
                reply,
            } => {
                let outcome = if let Some(existing) = candidates.get_mut(&user_id) {
                    existing.renegotiate(&offer_sdp, &track_info)
                } else {
                    match CandidatePeer::create(user_id.clone(), local_ip, &offer_sdp, &track_info).await {
                        Ok((peer, answer)) => {
                            spawn_socket_pump(peer.socket.clone(), PeerRef::Candidate(user_id.clone()), cmd_tx.clone());
                            candidates.insert(user_id.clone(), peer);
                            Ok(answer)
                        }
                        Err(e) => Err(e),
                    }
                };
                match outcome {
                    Ok(answer) => {
                        let _ = reply.send(SfuResponse::Answer(answer)).await;
                        if let Some(peer) = candidates.get_mut(&user_id) {
                            let added = drive_candidate(peer, &mut queued, &mut deferred, debounce_running);
                            if added {
                                let ms = debounce_for(&queued);
                                schedule_debounce(&mut debounce_running, &cmd_tx, ms);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(room = %room_id, user = %user_id, error = %e, "candidate offer failed");
                        let _ = reply.send(SfuResponse::Error(e.to_string())).await;
                    }
                }
            }

            SfuCommand::ProctorOffer { offer_sdp, reply } => {
                let existing_tracks: Vec<(&str, MediaKind)> = Vec::new();
                match ProctorPeer::create(local_ip, &offer_sdp, &existing_tracks).await {
                    Ok((peer, answer)) => {
                        spawn_socket_pump(peer.socket.clone(), PeerRef::Proctor, cmd_tx.clone());
                        proctor = Some(peer);
                        let _ = reply.send(SfuResponse::Answer(answer)).await;

                        // The proctor just joined: every already-published
                        // candidate track is new to it.
                        let all: Vec<PendingTrack> = candidates
                            .values()
                            .flat_map(|c| c.tracks.values().map(|t| (t.track_id.clone(), kind_of(t.label))))
                            .collect();
                        if !all.is_empty() {
                            queued.extend(all);
                            schedule_debounce(&mut debounce_running, &cmd_tx, INITIAL_DEBOUNCE_MS);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(room = %room_id, error = %e, "proctor offer failed");
                        let _ = reply.send(SfuResponse::Error(e.to_string())).await;
                    }
                }
            }

            SfuCommand::ProctorAnswer { answer_sdp, reply } => {
                match proctor.as_mut() {
                    Some(p) => match p.accept_answer(&answer_sdp) {
                        Ok(()) => {
                            let _ = reply.send(SfuResponse::Ack).await;
                            if !deferred.is_empty() {
                                let batch = std::mem::take(&mut deferred);
                                let ms = debounce_for(&batch);
                                queued.extend(batch);
                                schedule_debounce(&mut debounce_running, &cmd_tx, ms);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(room = %room_id, error = %e, "proctor answer mismatch, dropped");
                            let _ = reply.send(SfuResponse::Error(e.to_string())).await;
                        }
                    },
                    None => {
                        let _ = reply.send(SfuResponse::Error(SfuError::NoProctor.to_string())).await;
                    }
                }
            }

            SfuCommand::IceCandidate { from, candidate } => {
                apply_remote_candidate(&mut candidates, &mut proctor, &from, &candidate);
            }

            SfuCommand::RemoveCandidate { user_id } => {
                if let Some(peer) = candidates.remove(&user_id) {
                    let track_ids: Vec<String> = peer.tracks.values().map(|t| t.track_id.clone()).collect();
                    if let Some(p) = proctor.as_mut() {
                        p.remove_senders_for(&track_ids);
                    }
                    tracing::info!(room = %room_id, user = %user_id, "candidate torn down");
                }
                if candidates.is_empty() && proctor.is_none() {
                    break;
                }
            }

            SfuCommand::RemoveProctor => {
                proctor = None;
                queued.clear();
                deferred.clear();
                debounce_running = false;
                tracing::info!(room = %room_id, "proctor torn down");
                if candidates.is_empty() {
                    break;
                }
            }

            SfuCommand::GetStats { reply } => {
                let stats = RoomStats {
                    room_id: room_id.clone(),
                    candidates: candidates
                        .values()
                        .map(|c| CandidateStats {
                            user_id: c.user_id.clone(),
                            tracks: c.tracks.values().map(|t| t.label).collect(),
                        })
                        .collect(),
                    candidate_count: candidates.len(),
                    proctor: proctor.as_ref().map(|p| ProctorStats { senders: p.senders.len() }),
                    has_proctor: proctor.is_some(),
                };
                let _ = reply.send(SfuResponse::Stats(stats)).await;
            }

            SfuCommand::Receive { from, data, addr } => {
                let added = handle_receive(&mut candidates, &mut proctor, &from, &data, addr, &mut queued, &mut deferred, debounce_running);
                if added {
                    let ms = debounce_for(&queued);
                    schedule_debounce(&mut debounce_running, &cmd_tx, ms);
                }
            }

            SfuCommand::FlushRenegotiation => {
                debounce_running = false;
                if queued.is_empty() {
                    continue;
                }
                let batch = dedup_against_senders(std::mem::take(&mut queued), proctor.as_ref());
                let Some(p) = proctor.as_mut() else { continue };
                match p.offer_new_tracks(&batch) {
                    Ok(Some(sdp)) => {
                        let _ = reneg_tx
                            .send(RenegotiationOffer { room_id: room_id.clone(), sdp })
                            .await;
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(room = %room_id, error = %e, "renegotiation offer failed"),
                }
            }

            SfuCommand::Shutdown => break,
        }
    }

    tracing::info!(room = %room_id, "SFU room shut down");
}

fn kind_of(label: crate::track::TrackLabel) -> MediaKind {
    match label {
        crate::track::TrackLabel::Audio => MediaKind::Audio,
        crate::track::TrackLabel::Camera | crate::track::TrackLabel::Screen => MediaKind::Video,
    }
}

fn debounce_for(batch: &[PendingTrack]) -> u64 {
    if batch.len() == 1 && matches!(batch[0].1, MediaKind::Video) {
        SCREEN_DEBOUNCE_MS
    } else {
        INITIAL_DEBOUNCE_MS
    }
}

fn schedule_debounce(running: &mut bool, cmd_tx: &mpsc::Sender<SfuCommand>, ms: u64) {
    if *running {
        return;
    }
    *running = true;
    let tx = cmd_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        let _ = tx.send(SfuCommand::FlushRenegotiation).await;
    });
}

fn dedup_against_senders(batch: Vec<PendingTrack>, proctor: Option<&ProctorPeer>) -> Vec<PendingTrack> {
    match proctor {
        Some(p) => batch.into_iter().filter(|(id, _)| !p.senders.contains_key(id)).collect(),
        None => batch,
    }
}

fn apply_remote_candidate(
    candidates: &mut HashMap<UserId, CandidatePeer>,
    proctor: &mut Option<ProctorPeer>,
    from: &PeerRef,
    candidate: &str,
) {
    let parsed = match str0m::Candidate::from_sdp_string(candidate) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = ?e, "failed to parse ICE candidate");
            return;
        }
    };
    match from {
        PeerRef::Candidate(user_id) => {
            if let Some(peer) = candidates.get_mut(user_id) {
                peer.rtc.add_remote_candidate(parsed);
            }
        }
        PeerRef::Proctor => {
            if let Some(p) = proctor.as_mut() {
                p.rtc.add_remote_candidate(parsed);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_receive(
    candidates: &mut HashMap<UserId, CandidatePeer>,
    proctor: &mut Option<ProctorPeer>,
    from: &PeerRef,
    data: &[u8],
    addr: std::net::SocketAddr,
    queued: &mut Vec<PendingTrack>,
    deferred: &mut Vec<PendingTrack>,
    debounce_running: bool,
) -> bool {
    let now = std::time::Instant::now();
    match from {
        PeerRef::Candidate(user_id) => {
            let Some(peer) = candidates.get_mut(user_id) else { return false };
            let Ok(input) = build_input(data, addr, peer.local_addr, now) else { return false };
            if peer.rtc.handle_input(input).is_err() {
                tracing::warn!(user = %user_id, "candidate PC failed, dropping");
                return false;
            }
            drive_candidate(peer, queued, deferred, debounce_running)
        }
        PeerRef::Proctor => {
            let Some(p) = proctor.as_mut() else { return false };
            let Ok(input) = build_input(data, addr, p.local_addr, now) else { return false };
            let _ = p.rtc.handle_input(input);
            drive_proctor(p);
            false
        }
    }
}

fn build_input(
    data: &[u8],
    source: std::net::SocketAddr,
    destination: std::net::SocketAddr,
    now: std::time::Instant,
) -> Result<Input<'_>, ()> {
    let contents = data.try_into().map_err(|_| ())?;
    Ok(Input::Receive(
        now,
        str0m::net::Receive {
            proto: str0m::net::Protocol::Udp,
            source,
            destination,
            contents,
        },
    ))
}

/// Pump `poll_output` until the PC asks to be woken later, forwarding
/// outbound packets on the wire and surfacing newly negotiated media as
/// renegotiation-batch entries.
fn drive_candidate(peer: &mut CandidatePeer, queued: &mut Vec<PendingTrack>, deferred: &mut Vec<PendingTrack>, debounce_running: bool) -> bool {
    let mut added_to_queue = false;
    loop {
        match peer.rtc.poll_output() {
            Ok(str0m::Output::Timeout(_)) => break,
            Ok(str0m::Output::Transmit(t)) => {
                let _ = peer.socket.try_send_to(&t.contents, t.destination);
            }
            Ok(str0m::Output::Event(str0m::Event::MediaAdded(added))) => {
                let track_id = added.mid.to_string();
                let label = peer.label_for(&track_id, added.kind);
                peer.record_track(added.mid, track_id.clone(), label);
                if debounce_running {
                    deferred.push((track_id, added.kind));
                } else {
                    queued.push((track_id, added.kind));
                    added_to_queue = true;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "candidate PC error");
                break;
            }
        }
    }
    added_to_queue
}

fn drive_proctor(peer: &mut ProctorPeer) {
    loop {
        match peer.rtc.poll_output() {
            Ok(str0m::Output::Timeout(_)) => break,
            Ok(str0m::Output::Transmit(t)) => {
                let _ = peer.socket.try_send_to(&t.contents, t.destination);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "proctor PC error");
                break;
            }
        }
    }
}

fn spawn_socket_pump(socket: std::sync::Arc<tokio::net::UdpSocket>, who: PeerRef, cmd_tx: mpsc::Sender<SfuCommand>) {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 2000];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, addr)) => {
                    let data = buf[..len].to_vec();
                    if cmd_tx
                        .send(SfuCommand::Receive {
                            from: who.clone(),
                            data,
                            addr,
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "UDP recv error, ending socket pump");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_video_track_gets_screen_debounce() {
        let batch = vec![("t1".to_string(), MediaKind::Video)];
        assert_eq!(debounce_for(&batch), SCREEN_DEBOUNCE_MS);
    }

    #[test]
    fn multi_track_batch_gets_initial_debounce() {
        let batch = vec![
            ("t1".to_string(), MediaKind::Video),
            ("t2".to_string(), MediaKind::Audio),
        ];
        assert_eq!(debounce_for(&batch), INITIAL_DEBOUNCE_MS);
    }

    #[test]
    fn solo_audio_track_gets_initial_debounce() {
        let batch = vec![("t1".to_string(), MediaKind::Audio)];
        assert_eq!(debounce_for(&batch), INITIAL_DEBOUNCE_MS);
    }

    #[test]
    fn dedup_drops_tracks_already_sent() {
        let batch = vec![
            ("t1".to_string(), MediaKind::Video),
            ("t2".to_string(), MediaKind::Audio),
        ];
        let sent_ids = ["t1".to_string()];
        // Exercises the same predicate `dedup_against_senders` applies,
        // without needing a live `ProctorPeer` (which owns a real `Rtc`).
        let filtered: Vec<_> = batch.into_iter().filter(|(id, _)| !sent_ids.contains(id)).collect();
        assert_eq!(filtered, vec![("t2".to_string(), MediaKind::Audio)]);
    }
}
