//! # proctor-analysis
//!
//! The mock AI Analysis Emitter (§C6): one task per `(roomId, candidateId)`
//! that periodically samples a synthetic scenario and turns it into an
//! `ai_analysis` frame, delivered to the candidate and the room's proctor.
//!
//! No real inference happens here — this stands in for a model integration
//! the same way the reference server's mock analyzer does, so the rest of
//! the system (delivery, alert routing into the rules engine, start/stop
//! semantics) can be built and tested independently of one.

mod frame;
mod manager;
mod scenario;

pub use frame::AnalysisFrame;
pub use manager::{AnalysisError, AnalysisManager, DeliveredFrame};
pub use scenario::{Scenario, SubAnalysis};
