pub mod controller;
pub mod loop_worker;
pub mod mock;
pub mod providers;

pub use controller::{SessionWorker, WorkerChannels};
pub use loop_worker::{LoopExit, LoopReport};
pub use providers::{FrameAnalyzer, LandmarkProvider, ObjectDetector};
