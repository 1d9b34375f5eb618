//! # proctor-room
//!
//! Room registry (C2), control channel (C3), and room broadcaster (C4):
//! the WebSocket core that every participant connects through.
//!
//! One [`Room`] per `roomId`, created lazily and destroyed the moment its
//! last participant leaves; the [`RoomRegistry`] is the only thing allowed
//! to create or destroy one. Everything else — incident escalation, SFU
//! signaling, AI analysis — is delegated to `proctor-rules`,
//! `proctor-sfu`, and `proctor-analysis` respectively and wired together
//! through [`RoomState`].

mod fanout;
mod protocol;
mod registry;
mod room;
mod state;
mod ws;

pub use fanout::{spawn_analysis_forwarder, spawn_renegotiation_forwarder};
pub use protocol::{ControlMessage, IceCandidate, IncidentBody, RosterEntry, SdpBody};
pub use registry::RoomRegistry;
pub use room::{JoinError, Room};
pub use state::RoomState;

use axum::routing::get;
use axum::Router;

/// Build the control-channel router: a single WebSocket route per room.
pub fn build_router(state: RoomState) -> Router {
    Router::new()
        .route("/rooms/{roomId}/ws", get(ws::ws_handler))
        .with_state(state)
}
