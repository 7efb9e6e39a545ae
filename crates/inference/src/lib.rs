pub mod annotate;
pub mod backend;
pub mod config;
pub mod detector;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{ExecutionProvider, InferenceConfig};
pub use detector::{DetectionOutput, Detector, ObjectDetector};
pub use processing::post::Detection;
