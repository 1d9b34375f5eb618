//! # proctor-server
//!
//! Main binary: wires the room registry, incident rules engine, SFU
//! manager, and analysis manager together and serves the control-channel
//! WebSocket and the query API from a single process.

use std::net::SocketAddr;
use std::sync::Arc;

use proctor_analysis::AnalysisManager;
use proctor_room::RoomRegistry;
use proctor_rules::RulesEngine;
use proctor_sfu::SfuManager;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = proctor_common::config::init()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proctor=debug,tower_http=debug".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("starting proctor-server v{}", env!("CARGO_PKG_VERSION"));

    let registry = Arc::new(RoomRegistry::new(config.incidents.max_per_room));
    let rules = Arc::new(RulesEngine::new());

    // Unsolicited renegotiation offers from the SFU, and analysis frames
    // from the emitter, both need to reach the control channel outside
    // any single connection's own task — bridged via `fanout`.
    let (reneg_tx, reneg_rx) = mpsc::channel(256);
    let (frame_tx, frame_rx) = mpsc::channel(256);

    let local_ip: std::net::IpAddr = config.server.host.parse().unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
    let sfu = SfuManager::new(local_ip, reneg_tx);
    if !sfu.is_available() {
        tracing::warn!("SFU capability probe failed; falling back to P2P signaling fan-out");
    }

    let analysis = AnalysisManager::new(frame_tx);

    proctor_room::spawn_renegotiation_forwarder(registry.clone(), reneg_rx);
    proctor_room::spawn_analysis_forwarder(registry.clone(), frame_rx);

    let state = proctor_room::RoomState {
        registry,
        rules,
        sfu,
        analysis,
        sfu_enabled: config.sfu.enabled,
        ai_enabled: config.ai_analysis.enabled,
    };

    let router = proctor_room::build_router(state.clone()).merge(proctor_api::build_router(state));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("listening on http://{addr} (control channel + query API)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
