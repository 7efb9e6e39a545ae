use crate::{
    config::ImageDelivery,
    errors::ApiError,
    formatter::{self, AnnotatedImage, ModelInfo, PredictResponse},
    state::AppState,
    upload::{self, ScratchUpload},
};
use anyhow::Context;
use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use inference::DetectionOutput;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

struct ImageField {
    file_name: String,
    bytes: Bytes,
}

#[tracing::instrument(skip_all)]
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let start = Instant::now();

    match run_prediction(&state, multipart).await {
        Ok(response) => {
            state
                .metrics
                .record_success(start.elapsed(), response.total_detections);
            Ok(Json(response))
        }
        Err(e) => {
            state.metrics.record_failure(start.elapsed(), e.kind());
            Err(e)
        }
    }
}

async fn run_prediction(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<PredictResponse, ApiError> {
    let detector = state.detector.clone().ok_or(ApiError::ModelUnavailable)?;

    let mut multipart = multipart.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let field = read_image_field(&mut multipart).await?;

    let extension = upload::validate_filename(&field.file_name)?;
    if field.bytes.is_empty() {
        return Err(ApiError::InvalidInput("Uploaded file is empty".to_string()));
    }

    let scratch = ScratchUpload::persist(&state.config.upload_dir, &extension, &field.bytes).await?;
    tracing::info!(
        request_id = %scratch.id(),
        original = %upload::secure_filename(&field.file_name),
        path = %scratch.path().display(),
        "File saved"
    );

    let run_dir = state.config.results_dir.join(scratch.id().to_string());
    let image_path = scratch.path().to_path_buf();
    let task_run_dir = run_dir.clone();

    let mut task = tokio::task::spawn_blocking(move || {
        let mut detector = detector
            .lock()
            .map_err(|_| anyhow::anyhow!("detector lock poisoned"))?;
        detector.detect(&image_path, &task_run_dir)
    });

    let timeout = state.config.detection_timeout;
    let DetectionOutput {
        detections,
        annotated_path,
    } = match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => {
            return Err(ApiError::DetectionFailure(format!(
                "Detection task failed: {}",
                e
            )));
        }
        Err(_) => {
            // The blocking task cannot be cancelled. The upload is removed
            // when `scratch` drops, so a queued task fails on the missing
            // file and a running one writes output nobody will read.
            tokio::spawn(reap_abandoned_detection(task, scratch.id(), run_dir));
            return Err(ApiError::DetectionFailure(format!(
                "Detection timed out after {}s",
                timeout.as_secs()
            )));
        }
    };

    let annotated = match state.config.image_delivery {
        ImageDelivery::Inline => {
            let bytes = tokio::fs::read(&annotated_path)
                .await
                .with_context(|| format!("failed to read {}", annotated_path.display()))?;
            // Inlined images are never fetched again.
            remove_run_dir(&run_dir).await;
            AnnotatedImage::Inline(formatter::data_uri(scratch.extension(), &bytes))
        }
        ImageDelivery::Url => {
            tokio::fs::metadata(&annotated_path)
                .await
                .with_context(|| format!("annotated image missing at {}", annotated_path.display()))?;
            AnnotatedImage::Url(format!(
                "/api/results/{}/{}",
                scratch.id(),
                scratch.file_name()
            ))
        }
    };

    let response = formatter::build_response(
        &detections,
        annotated,
        ModelInfo::from(&state.config.inference),
    );

    tracing::info!(
        request_id = %scratch.id(),
        detections = response.total_detections,
        constellations_found = response.constellations_found,
        "Successfully processed image"
    );

    Ok(response)
}

async fn read_image_field(multipart: &mut Multipart) -> Result<ImageField, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        // A part without a filename is a plain form value, not a file.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(ImageField { file_name, bytes });
    }

    Err(ApiError::InvalidInput("No image file provided".to_string()))
}

/// Wait out a detection that outlived its request, log how it ended and
/// drop whatever it wrote.
async fn reap_abandoned_detection(
    task: JoinHandle<anyhow::Result<DetectionOutput>>,
    request_id: Uuid,
    run_dir: PathBuf,
) {
    match task.await {
        Ok(Ok(output)) => tracing::warn!(
            %request_id,
            detections = output.detections.len(),
            "Detection finished after its request timed out, discarding result"
        ),
        Ok(Err(e)) => tracing::warn!(
            %request_id,
            error = %format!("{:#}", e),
            "Detection failed after its request timed out"
        ),
        Err(e) => tracing::error!(%request_id, error = %e, "Detection task panicked"),
    }
    remove_run_dir(&run_dir).await;
}

async fn remove_run_dir(run_dir: &Path) {
    match tokio::fs::remove_dir_all(run_dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %run_dir.display(), error = %e, "Failed to remove results"),
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::InvalidInput(e.body_text())
    }
}
