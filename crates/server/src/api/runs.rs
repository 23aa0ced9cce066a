//! Run API handlers: upload, status polling, download, eviction.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use broadsheet_core::{ArtifactStatus, DigestJob, RunKind, RunRegistry, RunState, TransformKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::handlers::error_response;
use crate::metrics::{UPLOADS_REJECTED, UPLOADS_TOTAL};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateRunQuery {
    #[serde(default)]
    pub kind: RunKind,
}

#[derive(Debug, Serialize)]
pub struct CreateRunResponse {
    pub run_id: String,
    pub kind: RunKind,
    /// Download kinds the run will produce.
    pub documents: &'static [TransformKind],
    pub status: RunState,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Which document of a combined run; defaults to the run's first.
    pub kind: Option<TransformKind>,
}

#[derive(Debug, Serialize)]
pub struct NotFoundResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub error: String,
    pub status: RunState,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub run_id: String,
    pub removed: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Accept an `.epub` upload and start a run in the background.
pub async fn create_run(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CreateRunQuery>,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                UPLOADS_REJECTED.inc();
                return error_response(e.status(), format!("Invalid multipart body: {}", e.body_text()))
                    .into_response();
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        match field.bytes().await {
            Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
            Err(e) => {
                UPLOADS_REJECTED.inc();
                return error_response(e.status(), format!("Failed to read file: {}", e.body_text()))
                    .into_response();
            }
        }
    }

    let (file_name, bytes) = match upload {
        Some((name, bytes)) if !bytes.is_empty() => (name, bytes),
        _ => {
            UPLOADS_REJECTED.inc();
            return error_response(StatusCode::BAD_REQUEST, "No file provided").into_response();
        }
    };

    let is_epub = file_name
        .as_deref()
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(".epub"));
    if !is_epub {
        UPLOADS_REJECTED.inc();
        return error_response(StatusCode::BAD_REQUEST, "Only .epub files are supported")
            .into_response();
    }

    let run_id = RunRegistry::new_run_id();
    state.runs().begin(&run_id, 0).await;
    UPLOADS_TOTAL.with_label_values(&[query.kind.as_str()]).inc();
    info!(
        run_id = %run_id,
        kind = %query.kind,
        file_name = file_name.as_deref().unwrap_or_default(),
        bytes = bytes.len(),
        "Run accepted"
    );

    let job = DigestJob::new(run_id.clone(), query.kind, file_name, |kind| state.transform(kind));
    let pipeline = state.pipeline().clone();
    tokio::spawn(async move {
        // Failures are recorded in the registry; the client sees them via polling.
        let _ = pipeline.run_upload(job, bytes).await;
    });

    (
        StatusCode::ACCEPTED,
        Json(CreateRunResponse {
            run_id,
            kind: query.kind,
            documents: query.kind.transforms(),
            status: RunState::Processing,
        }),
    )
        .into_response()
}

/// Current status snapshot of a run.
pub async fn get_run(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.runs().snapshot(&id).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(NotFoundResponse {
                status: "not_found",
            }),
        )
            .into_response(),
    }
}

/// Download a rendered document of a completed run.
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Response {
    let document = match state.runs().artifact(&id, query.kind).await {
        ArtifactStatus::Ready(document) => document,
        ArtifactStatus::Missing => {
            return error_response(StatusCode::NOT_FOUND, "Run not found").into_response()
        }
        ArtifactStatus::Unavailable(kind) => {
            return error_response(StatusCode::NOT_FOUND, format!("Run produced no {kind} document"))
                .into_response()
        }
        ArtifactStatus::Pending(status) => {
            return (
                StatusCode::CONFLICT,
                Json(PendingResponse {
                    error: "Run has not completed".to_string(),
                    status,
                }),
            )
                .into_response()
        }
    };

    let disposition = content_disposition(&document.file_name, &document.ascii_file_name);
    let disposition = match HeaderValue::from_str(&disposition) {
        Ok(value) => value,
        Err(e) => {
            warn!(run_id = %id, error = %e, "Invalid Content-Disposition");
            HeaderValue::from_static("attachment")
        }
    };
    let content_type = HeaderValue::from_str(&document.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes.clone(),
    )
        .into_response()
}

/// Evict a run and its document.
pub async fn delete_run(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if state.runs().remove(&id).await {
        info!(run_id = %id, "Run removed");
        Json(RemovedResponse {
            run_id: id,
            removed: true,
        })
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(NotFoundResponse {
                status: "not_found",
            }),
        )
            .into_response()
    }
}

/// RFC 5987 attachment header: ASCII `filename` plus UTF-8 `filename*`.
pub fn content_disposition(file_name: &str, ascii_fallback: &str) -> String {
    format!(
        "attachment; filename=\"{ascii_fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}
