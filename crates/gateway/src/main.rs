use anyhow::Context;
use gateway::{AppState, GatewayConfig, catalog, logging::setup_logging, run_server};
use inference::{Detector, InferenceConfig, ObjectDetector, backend::ort::OrtBackend};
use std::fs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()?;
    let _telemetry = setup_logging(&config)?;

    tracing::info!(
        environment = config.environment.as_str(),
        port = config.port,
        image_delivery = config.image_delivery.as_str(),
        "Constellation gateway starting"
    );

    catalog::validate()?;

    for dir in [&config.upload_dir, &config.results_dir] {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let detector = load_detector(&config.inference);
    let state = AppState::new(config, detector);

    run_server(state).await
}

/// A model that fails to load leaves the service up in degraded mode.
fn load_detector(config: &InferenceConfig) -> Option<Box<dyn ObjectDetector>> {
    tracing::info!(
        model_path = %config.model_path,
        provider = ?config.execution_provider,
        "Loading detection model"
    );

    match Detector::<OrtBackend>::load(config) {
        Ok(detector) => {
            tracing::info!("Model loaded successfully");
            Some(Box::new(detector))
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Error loading model, predictions disabled");
            None
        }
    }
}
