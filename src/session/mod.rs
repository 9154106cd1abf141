pub mod context;
pub mod errors;
pub mod registry;

pub use context::{Admission, SessionContext};
pub use errors::{FrameError, SessionError};
pub use registry::{SessionHandle, SessionRegistry};
