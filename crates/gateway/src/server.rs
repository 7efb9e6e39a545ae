use crate::{
    catalog::{self, ConstellationEntry},
    config::ImageDelivery,
    errors::ApiError,
    predict::predict,
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Request, State},
    http::{Method, StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    total_classes: usize,
    constellations: Vec<&'static str>,
}

#[derive(Serialize)]
struct CatalogResponse {
    total: usize,
    constellations: &'static [ConstellationEntry],
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let mut api = Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/constellations", get(list_constellations))
        .route("/constellation/:name", get(get_constellation));

    if state.config.image_delivery == ImageDelivery::Url {
        api = api.nest_service("/results", ServeDir::new(&state.config.results_dir));
    }

    let api = api
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors)
        .layer(middleware::from_fn(preflight_no_content));

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_addr();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// CORS preflights are answered with `204 No Content` rather than `200`.
async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if is_preflight && response.status().is_success() {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "API is running smoothly!",
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_loaded: state.model_loaded(),
        total_classes: catalog::len(),
        constellations: catalog::names(),
    })
}

async fn list_constellations() -> Json<CatalogResponse> {
    let constellations = catalog::entries();
    Json(CatalogResponse {
        total: constellations.len(),
        constellations,
    })
}

#[tracing::instrument]
async fn get_constellation(
    Path(name): Path<String>,
) -> Result<Json<&'static ConstellationEntry>, ApiError> {
    catalog::lookup(&name).map(Json).ok_or(ApiError::NotFound)
}
