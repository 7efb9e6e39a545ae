use crate::{config::GatewayConfig, metrics::PredictMetrics};
use inference::ObjectDetector;
use std::sync::{Arc, Mutex};

/// The detector needs `&mut` access, so calls are serialised through a mutex.
pub type SharedDetector = Arc<Mutex<Box<dyn ObjectDetector>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    /// `None` when the model failed to load; the service then runs degraded.
    pub detector: Option<SharedDetector>,
    pub metrics: PredictMetrics,
}

impl AppState {
    pub fn new(config: GatewayConfig, detector: Option<Box<dyn ObjectDetector>>) -> Self {
        Self {
            config: Arc::new(config),
            detector: detector.map(|d| Arc::new(Mutex::new(d))),
            metrics: PredictMetrics::new("gateway"),
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.detector.is_some()
    }
}
