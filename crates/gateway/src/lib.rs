pub mod catalog;
pub mod config;
pub mod errors;
pub mod formatter;
pub mod logging;
pub mod metrics;
pub mod predict;
pub mod server;
pub mod state;
pub mod upload;

pub use config::{GatewayConfig, ImageDelivery};
pub use errors::ApiError;
pub use server::{build_router, run_server};
pub use state::AppState;
