use serde::{Deserialize, Serialize};

/// The role a participant declares at `join` time.
///
/// At most one `Proctor` is meaningful per room; additional participants
/// that join as `proctor` are still accepted but treated as observers for
/// every purpose other than the declared role on the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Proctor,
    Candidate,
    Observer,
}

impl Role {
    pub fn is_candidate(self) -> bool {
        matches!(self, Role::Candidate)
    }

    pub fn is_proctor(self) -> bool {
        matches!(self, Role::Proctor)
    }
}
