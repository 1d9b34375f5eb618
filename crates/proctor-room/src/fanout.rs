//! Bridges SFU renegotiation offers and analysis frames — both produced
//! outside any single control-channel task — back onto the room
//! broadcaster that owns delivery to participants.

use std::sync::Arc;

use proctor_analysis::DeliveredFrame;
use proctor_sfu::RenegotiationOffer;
use tokio::sync::mpsc;

use crate::protocol::{ControlMessage, SdpBody};
use crate::registry::RoomRegistry;

/// Forward each unsolicited proctor renegotiation offer (§4.5) to that
/// room's proctor as `{type:"offer", from:"server", renegotiate:true}`.
pub fn spawn_renegotiation_forwarder(registry: Arc<RoomRegistry>, mut rx: mpsc::Receiver<RenegotiationOffer>) {
    tokio::spawn(async move {
        while let Some(offer) = rx.recv().await {
            let Some(room) = registry.get(&offer.room_id).await else { continue };
            let Some(proctor_id) = room.proctor_id().await else { continue };
            let msg = ControlMessage::Offer(SdpBody {
                sdp: offer.sdp,
                track_info: None,
                to: Some(proctor_id.clone()),
                from: Some("server".to_string()),
                renegotiate: Some(true),
            });
            room.send_to(&proctor_id, msg).await;
        }
    });
}

/// Forward each analysis frame to the candidate it's about and to the
/// room's proctor, if present (§4.6 step 3; observers are never notified).
pub fn spawn_analysis_forwarder(registry: Arc<RoomRegistry>, mut rx: mpsc::Receiver<DeliveredFrame>) {
    tokio::spawn(async move {
        while let Some(delivered) = rx.recv().await {
            let Some(room) = registry.get(&delivered.room_id).await else { continue };
            let data = serde_json::to_value(&delivered.frame).unwrap_or(serde_json::Value::Null);
            let msg = ControlMessage::AiAnalysis { data };
            room.send_to(&delivered.candidate_id, msg.clone()).await;
            if let Some(proctor_id) = room.proctor_id().await {
                if proctor_id != delivered.candidate_id {
                    room.send_to(&proctor_id, msg).await;
                }
            }
        }
    });
}
