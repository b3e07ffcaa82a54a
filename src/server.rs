use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::columns::{build_grid_payload, GridPayload};
use crate::db;
use crate::error::GradebookError;
use crate::icons::IconName;
use crate::models::Student;
use crate::source::RowSource;

pub const FETCH_ERROR: &str = "Failed to fetch students";

#[derive(Clone)]
pub struct AppState {
    pub pool: Option<PgPool>,
    pub source: RowSource,
}

impl AppState {
    pub fn new(pool: Option<PgPool>, source: RowSource) -> Self {
        Self { pool, source }
    }
}

impl IntoResponse for GradebookError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GradebookError::BackendFetch(cause) => {
                error!("Error fetching students: {cause:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, FETCH_ERROR.to_string())
            }
            GradebookError::UnknownIcon(_) => (StatusCode::NOT_FOUND, self.to_string()),
            _ => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/students
pub async fn get_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<Student>>, GradebookError> {
    let pool = state
        .pool
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no database configured"))?;
    let students = db::fetch_students(pool).await?;
    Ok(Json(students))
}

/// GET /api/gradebook
pub async fn get_gradebook(
    State(state): State<AppState>,
) -> Result<Json<GridPayload>, GradebookError> {
    let records = state.source.load(state.pool.as_ref()).await?;
    Ok(Json(build_grid_payload(&records)))
}

pub async fn list_icons() -> Json<Vec<&'static str>> {
    Json(IconName::all().iter().map(|icon| icon.name()).collect())
}

pub async fn get_icon(Path(name): Path<String>) -> Result<Response, GradebookError> {
    let icon: IconName = name.parse()?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], icon.markup()).into_response())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/students", get(get_students))
        .route("/api/gradebook", get(get_gradebook))
        .route("/api/icons", get(list_icons))
        .route("/api/icons/:name", get(get_icon))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("gradebook listening on http://{addr}");
    info!("Grid data: http://{addr}/api/gradebook");

    axum::serve(listener, app).await?;
    Ok(())
}
