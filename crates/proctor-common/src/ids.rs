//! Opaque identifiers.
//!
//! `roomId` and `userId` are supplied by clients on the control channel and
//! are never generated server-side, so they're plain strings rather than
//! `Uuid`s — a candidate ID might be a student number, an exam-session
//! token, anything the calling system already uses.

/// Opaque room identifier, supplied by whichever client first joins it.
pub type RoomId = String;

/// Opaque participant identifier, unique within a room.
pub type UserId = String;
