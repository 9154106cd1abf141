use thiserror::Error;
use uuid::Uuid;

/// Per-frame failures. These never escape the frame loop on their own; they
/// turn into skipped-frame records and feed the consecutive error budget.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("frame analysis failed: {0}")]
    AnalysisFailed(String),
}

impl FrameError {
    /// Short code sent to the client in place of a record.
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::Malformed(_) => "malformed_frame",
            FrameError::AnalysisFailed(_) => "frame_processing",
        }
    }
}

/// Conditions that end a session's frame loop outright.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("too many consecutive frame errors ({count}), closing session")]
    TooManyConsecutiveErrors { count: u32 },
    #[error("session {0} not found")]
    NotFound(Uuid),
}
