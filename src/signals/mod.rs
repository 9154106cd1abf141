pub mod config;
pub mod features;
pub mod scoring;

pub use config::ScoringConfig;
pub use features::{FeatureError, GeometricFeatureExtractor, GeometricSignals};
pub use scoring::{DistractionConditions, FocusScorer, FrameScore};
