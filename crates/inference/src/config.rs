use common::config::env_or;
use std::env;

pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl ExecutionProvider {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "cuda" | "gpu" => ExecutionProvider::Cuda,
            _ => ExecutionProvider::Cpu,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_path: String,
    pub input_size: (u32, u32),
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub execution_provider: ExecutionProvider,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| "best.onnx".to_string());

        let input_width = env_or("INPUT_WIDTH", DEFAULT_INPUT_SIZE.0);
        let input_height = env_or("INPUT_HEIGHT", DEFAULT_INPUT_SIZE.1);

        let execution_provider = env::var("EXECUTION_PROVIDER")
            .map(|s| ExecutionProvider::parse(&s))
            .unwrap_or(ExecutionProvider::Cpu);

        Self {
            model_path,
            input_size: (input_width, input_height),
            confidence_threshold: env_or("CONFIDENCE_THRESHOLD", DEFAULT_CONFIDENCE_THRESHOLD),
            iou_threshold: env_or("IOU_THRESHOLD", DEFAULT_IOU_THRESHOLD),
            max_detections: env_or("MAX_DETECTIONS", DEFAULT_MAX_DETECTIONS),
            execution_provider,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_path: "best.onnx".to_string(),
            input_size: DEFAULT_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            execution_provider: ExecutionProvider::Cpu,
        }
    }
}
