// Archivo: http.rs
// Propósito: adaptador HTTP. Decodifica el JSON de entrada, delega en
// `PrimeService` y traduce `JobError` a códigos de estado.
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use primos_domain::{FastQueue, JobError, JobRepository};
use primos_worker::PrimeService;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub type SharedService = PrimeService<dyn JobRepository, dyn FastQueue>;

#[derive(Clone)]
pub struct AppState {
    service: Arc<SharedService>,
}

impl AppState {
    pub fn new(repo: Arc<dyn JobRepository>, queue: Arc<dyn FastQueue>) -> Self {
        Self { service: Arc::new(PrimeService::new(repo, queue)) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/", get(health))
                 .route("/new", post(new_request))
                 .route("/status/{id}", get(status))
                 .route("/result/{id}", get(results))
                 .with_state(state)
}

const DEFAULT_CANTIDAD: i64 = 1;
const DEFAULT_DIGITOS: i64 = 12;

fn default_cantidad() -> i64 {
    DEFAULT_CANTIDAD
}

fn default_digitos() -> i64 {
    DEFAULT_DIGITOS
}

#[derive(Debug, Deserialize)]
struct NewRequestBody {
    #[serde(default = "default_cantidad")]
    cantidad: i64,
    #[serde(default = "default_digitos")]
    digitos: i64,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("JSON inválido: {0}")]
    BadJson(String),
    #[error("id inválido: {0}")]
    BadId(String),
    #[error("solicitud no encontrada")]
    NotFound,
    #[error(transparent)]
    Job(#[from] JobError),
    #[error("tarea interrumpida: {0}")]
    Join(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadJson(_) | ApiError::BadId(_) | ApiError::Job(JobError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = match &self {
            ApiError::Job(JobError::Dispatch { id, .. }) => json!({ "error": self.to_string(), "id": id }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Los repositorios son síncronos: cada llamada corre en el pool de hilos
/// bloqueantes de tokio.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
    where F: FnOnce() -> Result<T, JobError> + Send + 'static,
          T: Send + 'static
{
    tokio::task::spawn_blocking(f).await.map_err(|e| ApiError::Join(e.to_string()))?.map_err(ApiError::from)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadId(raw.to_string()))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn new_request(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let parsed: NewRequestBody = serde_json::from_slice(&body).map_err(|e| ApiError::BadJson(e.to_string()))?;
    let service = state.service.clone();
    let id = blocking(move || service.submit(parsed.cantidad, parsed.digitos)).await?;
    Ok(Json(json!({ "id": id })))
}

async fn status(State(state): State<AppState>, Path(raw): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&raw)?;
    let service = state.service.clone();
    let request = blocking(move || service.status(&id)).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(json!({
        "id": request.id,
        "cantidad": request.cantidad,
        "digitos": request.digitos,
        "generados": request.generados,
    })))
}

async fn results(State(state): State<AppState>, Path(raw): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&raw)?;
    let service = state.service.clone();
    let primos = blocking(move || service.results(&id)).await?;
    Ok(Json(json!({ "id": id, "primos": primos })))
}
