//! HTTP resource endpoints
//!
//! Thin axum adapters translating the REST surface into store and durable
//! writer operations, plus the startup bootstrap for the data files.

use crate::config::DashConfig;
use crate::durable::{CommitOutcome, DurableWriter};
use crate::models::{next_command_id, now_iso, CommandRecord, ServerRecord};
use crate::store::{self, StoreError};
use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("write not confirmed")]
    WriteFailed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Storage(e) => {
                eprintln!("❌ Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                )
            }
            ApiError::WriteFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to save data".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Shared state across all handlers. The per-collection mutexes serialize
/// read-modify-write cycles; two mutations of the same collection never
/// interleave within this process.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashConfig>,
    commands: DurableWriter,
    servers_lock: Arc<Mutex<()>>,
    commands_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Arc<DashConfig>) -> Self {
        Self {
            commands: DurableWriter::new(config.commands_file()),
            config,
            servers_lock: Arc::new(Mutex::new(())),
            commands_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/servers", get(get_servers).post(save_servers))
        .route("/api/commands", get(get_commands).post(add_command))
        .route(
            "/api/commands/:id",
            put(update_command).delete(delete_command),
        )
        .route("/api/export", post(export_csv))
        .route("/api/download/:filename", get(download_csv))
        .with_state(state)
}

/// Ensure both data files and the export directory exist, recreate a corrupt
/// command file, then prove the command file is writable by re-committing
/// its current content. A failed self-test aborts startup.
pub async fn bootstrap(config: &DashConfig) -> anyhow::Result<()> {
    store::ensure(&config.servers_file(), &Vec::<ServerRecord>::new()).await?;

    let commands_file = config.commands_file();
    store::ensure(&commands_file, &Vec::<CommandRecord>::new()).await?;

    let commands: Vec<CommandRecord> = match store::read(&commands_file).await {
        Ok(commands) => commands,
        Err(e) => {
            eprintln!("🔧 Recreating {}: {}", commands_file.display(), e);
            store::write(&commands_file, &Vec::<CommandRecord>::new()).await?;
            Vec::new()
        }
    };

    tokio::fs::create_dir_all(&config.export_dir)
        .await
        .with_context(|| {
            format!(
                "could not create export directory {}",
                config.export_dir.display()
            )
        })?;

    println!("🧪 Testing write access...");
    let writer = DurableWriter::new(&commands_file);
    match writer.commit(&commands).await? {
        CommitOutcome::Committed => {
            println!("✅ Write test successful for {}", commands_file.display());
            Ok(())
        }
        outcome => anyhow::bail!(
            "write self-test failed for {} ({:?})",
            commands_file.display(),
            outcome
        ),
    }
}

/// Run the service: bootstrap the data files, then serve the API.
pub async fn serve(config: DashConfig) -> anyhow::Result<()> {
    bootstrap(&config).await?;

    let port = config.port;
    let config = Arc::new(config);
    let app = router(AppState::new(config.clone()));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    println!("🚀 middash listening on port {}", port);
    println!("📁 Data directory: {}", config.data_dir.display());
    println!("📁 Export directory: {}", config.export_dir.display());

    axum::serve(listener, app).await?;

    Ok(())
}

// ===== Servers =====

async fn get_servers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServerRecord>>, ApiError> {
    let path = state.config.servers_file();
    store::ensure(&path, &Vec::<ServerRecord>::new()).await?;
    let servers: Vec<ServerRecord> = store::read(&path).await?;
    Ok(Json(servers))
}

/// Full-collection replace, not incremental.
async fn save_servers(
    State(state): State<AppState>,
    Json(servers): Json<Vec<ServerRecord>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let _guard = state.servers_lock.lock().await;
    store::write(&state.config.servers_file(), &servers).await?;
    Ok(Json(json!({ "success": true })))
}

// ===== Commands =====

#[derive(Debug, Deserialize)]
struct CommandPayload {
    command: Option<String>,
    description: Option<String>,
}

impl CommandPayload {
    fn validated(self) -> Result<(String, String), ApiError> {
        match (self.command, self.description) {
            (Some(command), Some(description))
                if !command.trim().is_empty() && !description.trim().is_empty() =>
            {
                Ok((command, description))
            }
            _ => Err(ApiError::Validation(
                "command and description are required".to_string(),
            )),
        }
    }
}

/// Read failures degrade to an empty catalog so the dashboard stays usable
/// even when the data file is missing or corrupt.
async fn read_commands(state: &AppState) -> Vec<CommandRecord> {
    match store::read(state.commands.path()).await {
        Ok(commands) => commands,
        Err(e) => {
            eprintln!("❌ Error reading commands: {}", e);
            println!("🔄 Falling back to an empty command list");
            Vec::new()
        }
    }
}

fn confirm(outcome: CommitOutcome) -> Result<(), ApiError> {
    if outcome == CommitOutcome::Committed {
        Ok(())
    } else {
        eprintln!("❌ Command write not confirmed: {:?}", outcome);
        Err(ApiError::WriteFailed)
    }
}

async fn get_commands(State(state): State<AppState>) -> Json<Vec<CommandRecord>> {
    Json(read_commands(&state).await)
}

async fn add_command(
    State(state): State<AppState>,
    Json(payload): Json<CommandPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (command, description) = payload.validated()?;

    let _guard = state.commands_lock.lock().await;
    let mut commands = read_commands(&state).await;
    let record = CommandRecord::new(next_command_id(&commands), command, description);
    commands.push(record.clone());

    confirm(state.commands.commit(&commands).await?)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CommandPayload>,
) -> Result<Json<CommandRecord>, ApiError> {
    let (command, description) = payload.validated()?;

    let _guard = state.commands_lock.lock().await;
    let mut commands = read_commands(&state).await;
    let entry = commands
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| ApiError::NotFound(format!("no command with id {}", id)))?;

    entry.command = command;
    entry.description = description;
    entry.updated_at = Some(now_iso());
    let updated = entry.clone();

    confirm(state.commands.commit(&commands).await?)?;
    Ok(Json(updated))
}

async fn delete_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let _guard = state.commands_lock.lock().await;
    let mut commands = read_commands(&state).await;
    let before = commands.len();
    commands.retain(|c| c.id != id);

    if commands.len() == before {
        return Err(ApiError::NotFound(format!("no command with id {}", id)));
    }

    confirm(state.commands.commit(&commands).await?)?;
    Ok(Json(json!({ "success": true })))
}

// ===== CSV export =====

#[derive(Debug, Deserialize)]
struct ExportPayload {
    filename: Option<String>,
    data: Option<String>,
}

/// Export filenames land directly under the export directory; anything that
/// could escape it is rejected.
fn validate_filename(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ApiError::Validation(format!("invalid filename: {}", name)));
    }
    Ok(())
}

async fn export_csv(
    State(state): State<AppState>,
    Json(payload): Json<ExportPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (filename, data) = match (payload.filename, payload.data) {
        (Some(filename), Some(data)) => (filename, data),
        _ => {
            return Err(ApiError::Validation(
                "filename and data are required".to_string(),
            ))
        }
    };
    validate_filename(&filename)?;

    tokio::fs::create_dir_all(&state.config.export_dir)
        .await
        .map_err(|e| StoreError::Write {
            path: state.config.export_dir.clone(),
            source: e,
        })?;

    let path = state.config.export_dir.join(&filename);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| StoreError::Write {
            path: path.clone(),
            source: e,
        })?;

    println!("📄 CSV exported: {}", path.display());

    Ok(Json(json!({
        "success": true,
        "message": "export written",
        "filename": filename,
        "path": path.to_string_lossy(),
    })))
}

async fn download_csv(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    validate_filename(&filename)?;

    let path = state.config.export_dir.join(&filename);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("no export named {}", filename)));
        }
        Err(e) => return Err(ApiError::Storage(StoreError::Read { path, source: e })),
    };

    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, content).into_response())
}
