//! services/api/src/web/files.rs
//!
//! Attachment uploads and ZIP export of generated code.

use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use component_forge_core::domain::Attachment;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::archive::{build_archive, ArchiveContents, ArchiveError};
use crate::error::ApiError;
use crate::web::state::{AppState, AuthUser};

pub const MAX_FILES: usize = 5;
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// Body limit for the upload route: a full set of files plus room for part headers.
pub const UPLOAD_BODY_LIMIT: usize = MAX_FILES * MAX_FILE_SIZE + 1024 * 1024;
const FILES_FIELD: &str = "files";

/// Accepted extensions and the MIME types allowed to accompany them.
const ALLOWED_TYPES: &[(&str, &[&str])] = &[
    ("jpeg", &["image/jpeg"]),
    ("jpg", &["image/jpeg"]),
    ("png", &["image/png"]),
    ("gif", &["image/gif"]),
    ("pdf", &["application/pdf"]),
    ("txt", &["text/plain"]),
    ("doc", &["application/msword"]),
    (
        "docx",
        &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
    ),
];

/// Both the extension and the declared MIME type must be on the allow-list.
pub fn is_allowed_upload(file_name: &str, mimetype: &str) -> bool {
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return false;
    };
    let extension = extension.to_ascii_lowercase();
    let mimetype = mimetype.to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .any(|(ext, mimes)| *ext == extension && mimes.contains(&mimetype.as_str()))
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    #[schema(value_type = Vec<Object>)]
    pub files: Vec<Attachment>,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct DownloadRequest {
    pub jsx: Option<String>,
    pub tsx: Option<String>,
    pub css: Option<String>,
    pub filename: Option<String>,
}

struct PendingUpload {
    original_name: String,
    mimetype: String,
    bytes: Vec<u8>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Upload up to five attachments.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "One or more `files` parts."),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "No files, too many files, too large, or invalid type"),
        (status = 401, description = "Access token required")
    ),
    security(("bearer" = []))
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    // 1. Read and validate every part before anything touches the disk
    let mut pending = Vec::new();
    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart upload: {}", e);
        ApiError::Validation(format!("Malformed upload: {}", e))
    })? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        if pending.len() == MAX_FILES {
            return Err(ApiError::Validation(format!(
                "Too many files. At most {} files are allowed",
                MAX_FILES
            )));
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mimetype = field.content_type().unwrap_or_default().to_string();
        if !is_allowed_upload(&original_name, &mimetype) {
            warn!("Rejected upload '{}' ({})", original_name, mimetype);
            return Err(ApiError::Validation("Invalid file type".to_string()));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read upload: {}", e)))?
        {
            if bytes.len() + chunk.len() > MAX_FILE_SIZE {
                warn!("Rejected upload '{}': over {} bytes", original_name, MAX_FILE_SIZE);
                return Err(ApiError::Validation(
                    "File too large. Maximum size is 10MB".to_string(),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        pending.push(PendingUpload {
            original_name,
            mimetype,
            bytes,
        });
    }

    if pending.is_empty() {
        return Err(ApiError::Validation("No files uploaded".to_string()));
    }

    // 2. Store them
    let mut files = Vec::with_capacity(pending.len());
    for upload in pending {
        let stored = state
            .files
            .store(&upload.original_name, &upload.bytes)
            .await?;
        files.push(Attachment {
            url: format!("/uploads/{}", stored.filename),
            filename: stored.filename,
            original_name: upload.original_name,
            mimetype: upload.mimetype,
            size: stored.size,
        });
    }
    info!("User {} uploaded {} file(s)", auth.user_id, files.len());

    Ok(Json(UploadResponse { files }))
}

/// Download the given code as a ZIP archive.
#[utoipa::path(
    post,
    path = "/api/download",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "ZIP archive (application/zip)"),
        (status = 400, description = "No code to download"),
        (status = 401, description = "Access token required")
    ),
    security(("bearer" = []))
)]
pub async fn download_handler(
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DownloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let archive = build_archive(&ArchiveContents {
        jsx: req.jsx,
        tsx: req.tsx,
        css: req.css,
        filename: req.filename,
    })
    .map_err(|e| match e {
        ArchiveError::NoCode => ApiError::Validation(ArchiveError::NoCode.to_string()),
        other => {
            error!("Failed to build archive: {}", other);
            ApiError::Internal("Error creating archive".to_string())
        }
    })?;
    info!("User {} downloaded {}", auth.user_id, archive.file_name());

    let disposition = format!("attachment; filename=\"{}\"", archive.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive.bytes,
    ))
}
