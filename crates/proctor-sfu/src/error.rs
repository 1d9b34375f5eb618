use proctor_common::UserId;

#[derive(Debug, thiserror::Error)]
pub enum SfuError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebRTC error: {0}")]
    Rtc(#[from] str0m::RtcError),

    #[error("SDP error: {0}")]
    Sdp(String),

    #[error("candidate not found: {0}")]
    CandidateNotFound(UserId),

    #[error("no proctor connection in this room")]
    NoProctor,

    #[error("SFU is not available: {0}")]
    NotAvailable(String),

    #[error("room is shutting down")]
    RoomGone,
}

pub type SfuResult<T> = Result<T, SfuError>;
