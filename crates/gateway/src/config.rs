use common::{Environment, config::env_or};
use inference::InferenceConfig;
use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
pub const DEFAULT_DETECTION_TIMEOUT_SECS: u64 = 60;

/// How the annotated image travels back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageDelivery {
    /// Base64 data URI embedded in the predict response.
    #[default]
    Inline,
    /// Relative URL under `/api/results`, served from the results directory.
    Url,
}

impl ImageDelivery {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageDelivery::Inline => "inline",
            ImageDelivery::Url => "url",
        }
    }
}

impl TryFrom<String> for ImageDelivery {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "url" => Ok(Self::Url),
            other => Err(format!(
                "{} is not a supported image delivery. Use either `inline` or `url`.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    pub image_delivery: ImageDelivery,
    pub max_upload_bytes: usize,
    pub detection_timeout: Duration,
    pub otel_endpoint: Option<String>,
    pub inference: InferenceConfig,
}

impl GatewayConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let image_delivery = match env::var("IMAGE_DELIVERY") {
            Ok(value) => ImageDelivery::try_from(value).map_err(anyhow::Error::msg)?,
            Err(_) => ImageDelivery::default(),
        };

        let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            environment: Environment::from_env(),
            port: env_or("PORT", DEFAULT_PORT),
            upload_dir: env_or("UPLOAD_DIR", PathBuf::from("uploads")),
            results_dir: env_or("RESULTS_DIR", PathBuf::from("results")),
            image_delivery,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            detection_timeout: Duration::from_secs(env_or(
                "DETECTION_TIMEOUT_SECS",
                DEFAULT_DETECTION_TIMEOUT_SECS,
            )),
            otel_endpoint,
            inference: InferenceConfig::from_env(),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from("uploads"),
            results_dir: PathBuf::from("results"),
            image_delivery: ImageDelivery::Inline,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            detection_timeout: Duration::from_secs(DEFAULT_DETECTION_TIMEOUT_SECS),
            otel_endpoint: None,
            inference: InferenceConfig::default(),
        }
    }
}
