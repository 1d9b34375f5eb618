use std::sync::Arc;

use proctor_analysis::AnalysisManager;
use proctor_rules::RulesEngine;
use proctor_sfu::SfuManager;

use crate::registry::RoomRegistry;

/// Shared state for the control-channel WebSocket router.
#[derive(Clone)]
pub struct RoomState {
    pub registry: Arc<RoomRegistry>,
    pub rules: Arc<RulesEngine>,
    pub sfu: SfuManager,
    pub analysis: AnalysisManager,
    pub sfu_enabled: bool,
    pub ai_enabled: bool,
}
