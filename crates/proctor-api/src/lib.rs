//! # proctor-api
//!
//! The synchronous Query API (C7): read endpoints over incidents, session
//! summaries, and SFU stats, plus out-of-band analysis-emitter control.
//! Shares [`proctor_room::RoomState`] with the control-channel router so
//! both surfaces see the same rooms, same rules engine, same SFU manager.

mod routes;

use axum::Router;
use proctor_room::RoomState;

/// Build the complete query-API router.
pub fn build_router(state: RoomState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::incidents::router())
        .merge(routes::sessions::router())
        .merge(routes::sfu::router())
        .merge(routes::analysis::router())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
