mod event;
mod frame;
mod landmarks;
mod session;

pub use event::{DistractionEvent, DistractionKind, EventCounts};
pub use frame::{BoundingBox, Detection, Frame, Observation};
pub use landmarks::{CoordinateSpace, LandmarkSet, Point};
pub use session::{
    FocusStatus, FrameOutcome, FrameRecord, SessionInfo, SessionState, SessionSummary,
    SkippedFrame, SESSION_ENDED_STATUS,
};
