use crate::config::Config;
use crate::error::AssayError;
use crate::pipeline::{self, Experiment};
use crate::stats::SummaryStatistics;
use crate::storage::ResultStore;
use axum::{
    extract::{Multipart, Path as UrlPath, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ResultStore>,
    pub config: Arc<Config>,
}

pub fn app_router(state: AppState) -> Router {
    let static_dir = Path::new(&state.config.static_dir);
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload_file))
        .route("/api/charts/:experiment", get(chart_results))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.listen_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app_router(state)).await?;
    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "nanoassay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Accept one measurement file, run its experiment's pipeline, and persist
/// the batch. Every rejection reason surfaces to the client; nothing is
/// retried and a rejected upload writes no rows.
async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let (filename, bytes) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                match field.bytes().await {
                    Ok(bytes) => break (name, bytes),
                    Err(e) => return bad_request(format!("failed to read upload: {e}")),
                }
            }
            Ok(None) => return bad_request("no file attached to the upload".to_string()),
            Err(e) => return bad_request(format!("malformed multipart request: {e}")),
        }
    };

    let Some(experiment) = Experiment::from_filename(&filename) else {
        return bad_request("Only CSV or Excel files are allowed.".to_string());
    };

    // Keep only the final path component so uploads cannot escape the
    // upload directory.
    let basename = Path::new(&filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.clone());
    // Timestamped filename so repeated uploads never clobber each other.
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%f");
    let upload_dir = Path::new(&state.config.upload_dir);
    let saved_path = upload_dir.join(format!("{timestamp}_{basename}"));

    if let Err(e) = tokio::fs::create_dir_all(upload_dir).await {
        error!("failed to create upload directory: {e}");
        return internal_error(format!("could not store upload: {e}"));
    }
    if let Err(e) = tokio::fs::write(&saved_path, &bytes).await {
        error!("failed to save upload {}: {e}", saved_path.display());
        return internal_error(format!("could not store upload: {e}"));
    }

    match pipeline::ingest_file(state.store.clone(), &state.config, experiment, &saved_path).await {
        Ok(outcome) => Json(serde_json::json!({
            "message": "File uploaded and processed successfully",
            "filename": basename,
            "experiment": outcome.experiment.table_name(),
            "formulations": outcome.formulations,
        }))
        .into_response(),
        Err(AssayError::Persistence { message }) => {
            error!("persistence failed for {basename}: {message}");
            internal_error(format!("failed to persist results: {message}"))
        }
        Err(e) => {
            warn!("upload {basename} rejected: {e}");
            bad_request(format!("Invalid results in file: {basename}: {e}"))
        }
    }
}

/// All stored rows for one experiment plus summary statistics over their
/// calculated values.
async fn chart_results(
    State(state): State<AppState>,
    UrlPath(experiment): UrlPath<String>,
) -> Response {
    let Some(experiment) = Experiment::from_table_name(&experiment) else {
        return not_found(format!("Unknown experiment type: {experiment}"));
    };

    let rows = match state.store.read_all(experiment).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("failed to read {} results: {e}", experiment.table_name());
            return internal_error(format!("failed to read results: {e}"));
        }
    };

    let values: Vec<f64> = rows.iter().map(|row| row.calculated_value).collect();
    let Some(statistics) = SummaryStatistics::compute(&values) else {
        return not_found(format!(
            "No data found for the {} chart. Please upload data first.",
            experiment.table_name()
        ));
    };

    Json(serde_json::json!({
        "results": rows,
        "statistics": statistics,
    }))
    .into_response()
}

fn bad_request(detail: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "detail": detail }))).into_response()
}

fn not_found(detail: String) -> Response {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "detail": detail }))).into_response()
}

fn internal_error(detail: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "detail": detail })),
    )
        .into_response()
}
