//! # proctor-common
//!
//! Shared types, error handling, and configuration used by every crate in
//! the proctoring core: the incident taxonomy, participant roles, the
//! crate-wide error type, and layered app configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod role;
pub mod taxonomy;

pub use error::{ProctorError, ProctorResult};
pub use ids::{RoomId, UserId};
pub use role::Role;
pub use taxonomy::{IncidentCode, Severity};
