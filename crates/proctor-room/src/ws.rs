//! The control-channel WebSocket handler (§4.2): join validation, roster
//! broadcast, message dispatch (with SFU interception when enabled), and
//! disconnect teardown.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use proctor_common::{Role, RoomId, UserId};
use proctor_rules::Incident;
use proctor_sfu::TrackInfo;
use tokio::sync::mpsc;

use crate::protocol::ControlMessage;
use crate::room::Room;
use crate::state::RoomState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<RoomId>,
    State(state): State<RoomState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, room_id, state))
}

async fn handle_connection(socket: WebSocket, room_id: RoomId, state: RoomState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<ControlMessage>();

    // First message must be a join (§4.2). Anything else is rejected and
    // the connection closed without ever touching the room registry.
    let Some(Ok(Message::Text(text))) = receiver.next().await else {
        return;
    };
    let Ok(ControlMessage::Join { user_id, role }) = serde_json::from_str(&text) else {
        send_raw(&mut sender, &ControlMessage::Error { reason: "expected_join".into() }).await;
        return;
    };
    let Some(user_id) = user_id else {
        send_raw(&mut sender, &ControlMessage::Error { reason: "missing_userId".into() }).await;
        return;
    };
    let role = role.unwrap_or(Role::Observer);

    let room = state.registry.get_or_create(&room_id).await;
    let roster = match room.join(user_id.clone(), role, outbox_tx.clone()).await {
        Ok(roster) => roster,
        Err(_) => {
            send_raw(&mut sender, &ControlMessage::Error { reason: "user_exists".into() }).await;
            return;
        }
    };

    send_raw(&mut sender, &ControlMessage::Roster { participants: roster }).await;
    room.broadcast_except(&user_id, ControlMessage::ParticipantJoined { user_id: user_id.clone(), role }).await;

    if role.is_candidate() && state.ai_enabled {
        if let Err(e) = state.analysis.start(room_id.clone(), user_id.clone()).await {
            tracing::debug!(room = %room_id, user = %user_id, error = %e, "analysis emitter already running");
        }
    }

    tracing::info!(room = %room_id, user = %user_id, ?role, "participant joined");

    // Forward this participant's outbox to the socket.
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else { continue };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let Ok(control) = serde_json::from_str::<ControlMessage>(&text) else {
            let _ = outbox_tx.send(ControlMessage::Error { reason: "unknown_type".into() });
            continue;
        };

        if matches!(control, ControlMessage::Leave {}) {
            break;
        }

        dispatch(&state, &room, &room_id, &user_id, role, control, &outbox_tx).await;
    }

    teardown(&state, &room, &room_id, &user_id, role).await;
    forward_task.abort();
}

async fn dispatch(
    state: &RoomState,
    room: &Room,
    room_id: &RoomId,
    user_id: &UserId,
    role: Role,
    control: ControlMessage,
    outbox_tx: &mpsc::UnboundedSender<ControlMessage>,
) {
    match control {
        ControlMessage::Offer(mut body) => {
            let authoritative_proctor = is_authoritative_proctor(room, user_id, role).await;
            if state.sfu_enabled && (role.is_candidate() || authoritative_proctor) {
                let sfu_result = if role.is_candidate() {
                    let track_info: Vec<TrackInfo> = body.track_info.clone().unwrap_or_default();
                    state.sfu.candidate_offer(room_id, user_id.clone(), body.sdp, track_info).await
                } else {
                    state.sfu.proctor_offer(room_id, body.sdp).await
                };
                match sfu_result {
                    Ok(answer_sdp) => {
                        let _ = outbox_tx.send(ControlMessage::Answer(crate::protocol::SdpBody {
                            sdp: answer_sdp,
                            track_info: None,
                            to: None,
                            from: Some("server".to_string()),
                            renegotiate: None,
                        }));
                    }
                    Err(e) => {
                        let _ = outbox_tx.send(ControlMessage::Error { reason: format!("sfu_error:{e}") });
                    }
                }
                return;
            }
            body.from = Some(user_id.clone());
            route(room, user_id, body.to.clone(), ControlMessage::Offer(body)).await;
        }

        ControlMessage::Answer(mut body) => {
            if state.sfu_enabled && is_authoritative_proctor(room, user_id, role).await {
                if let Err(e) = state.sfu.proctor_answer(room_id, body.sdp).await {
                    tracing::debug!(room = %room_id, error = %e, "proctor answer rejected by SFU");
                }
                return;
            }
            body.from = Some(user_id.clone());
            route(room, user_id, body.to.clone(), ControlMessage::Answer(body)).await;
        }

        ControlMessage::Ice { candidate, to, from: _ } => {
            let authoritative_proctor = is_authoritative_proctor(room, user_id, role).await;
            if state.sfu_enabled && (role.is_candidate() || authoritative_proctor) {
                let candidate_user = if role.is_candidate() { Some(user_id.clone()) } else { None };
                state.sfu.ice_candidate(room_id, authoritative_proctor, candidate_user, candidate.candidate).await;
                return;
            }
            route(room, user_id, to, ControlMessage::Ice { candidate, to: None, from: Some(user_id.clone()) }).await;
        }

        ControlMessage::Chat { to, body, .. } => {
            route(room, user_id, to.clone(), ControlMessage::Chat { to, from: Some(user_id.clone()), body }).await;
        }

        ControlMessage::Incident(mut body) => {
            body.by = user_id.clone();
            let processed = state.rules.process(room_id, user_id, to_incident(body));
            room.push_incident(processed.clone()).await;
            room.broadcast_all(ControlMessage::Incident(from_incident(processed))).await;
        }

        ControlMessage::Leave {} => {}

        _ => {
            let _ = outbox_tx.send(ControlMessage::Error { reason: "unknown_type".into() });
        }
    }
}

/// Route a `to`-addressed payload, falling back to fan-out-except-sender
/// (§4.2 routing policy).
async fn route(room: &Room, sender_id: &UserId, to: Option<UserId>, msg: ControlMessage) {
    match to {
        Some(target) if room.has_participant(&target).await => room.send_to(&target, msg).await,
        _ => room.broadcast_except(sender_id, msg).await,
    }
}

/// Only the room's first, authoritative proctor (`Room::proctor_id`) may
/// drive the SFU's single proctor peer. A second participant who also
/// declared `role: proctor` is accepted on the roster but is otherwise
/// treated as an observer, so its offers/answers/ICE fall through to plain
/// routing instead of reaching the SFU.
async fn is_authoritative_proctor(room: &Room, user_id: &UserId, role: Role) -> bool {
    role.is_proctor() && room.proctor_id().await.as_ref() == Some(user_id)
}

fn to_incident(body: crate::protocol::IncidentBody) -> Incident {
    Incident {
        room_id: body.room_id.unwrap_or_default(),
        by: body.by,
        tag: body.tag,
        level: body.level,
        note: body.note,
        ts: body.ts,
        escalated: body.escalated,
        session_status: body.session_status,
    }
}

fn from_incident(incident: Incident) -> crate::protocol::IncidentBody {
    crate::protocol::IncidentBody {
        tag: incident.tag,
        level: incident.level,
        note: incident.note,
        ts: incident.ts,
        by: incident.by,
        room_id: Some(incident.room_id),
        escalated: incident.escalated,
        session_status: incident.session_status,
    }
}

/// §4.2 termination sequence: cancel the emitter, tear down SFU state,
/// remove the participant, broadcast `participant_left`, GC the room.
async fn teardown(state: &RoomState, room: &Room, room_id: &RoomId, user_id: &UserId, role: Role) {
    if state.ai_enabled {
        if let Err(e) = state.analysis.stop(room_id, user_id).await {
            tracing::debug!(room = %room_id, user = %user_id, error = %e, "analysis emitter was not running");
        }
    }

    if state.sfu_enabled {
        // Checked before `room.leave` below removes this participant, since
        // `proctor_id` reads the still-current roster.
        if is_authoritative_proctor(room, user_id, role).await {
            state.sfu.remove_proctor(room_id).await;
        } else if role.is_candidate() {
            state.sfu.remove_candidate(room_id, user_id.clone()).await;
        }
    }

    let left_role = room.leave(user_id).await.unwrap_or(role);
    room.broadcast_all(ControlMessage::ParticipantLeft { user_id: user_id.clone(), role: Some(left_role) }).await;
    state.registry.remove_if_empty(room_id).await;

    tracing::info!(room = %room_id, user = %user_id, "participant left");
}

async fn send_raw(sender: &mut SplitSink<WebSocket, Message>, msg: &ControlMessage) {
    if let Ok(text) = serde_json::to_string(msg) {
        let _ = sender.send(Message::Text(text.into())).await;
    }
}
