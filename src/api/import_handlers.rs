//! AI Import Handlers
//!
//! Upload endpoints for both extraction modes, job status queries and the
//! webhook callback.
//!
//! # Endpoints
//!
//! - `POST /organizations/{org_id}/imports`: multipart `file`, webhook extraction (202)
//! - `POST /organizations/{org_id}/imports/direct`: multipart `file`, vision extraction (201)
//! - `GET /organizations/{org_id}/imports[/{job_id}]`: job status and summary
//! - `POST /imports/callback`: signed result from the extraction webhook (no bearer token)

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Extension,
};
use uuid::Uuid;

use crate::{
    api::{
        handlers::{respond, ApiResponse, AppState},
        middleware::AuthUser,
    },
    models::{access::Action, import::ImportJob, requests::PageQuery},
    service::{import_webhook::SIGNATURE_HEADER, ImportError, UploadedFile},
    utils::error::{AppError, AppResult},
};

const FILE_FIELD: &str = "file";

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// Reads the `file` field, stopping as soon as it exceeds `max_bytes`
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> AppResult<UploadedFile> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(ImportError::FileTooLarge {
                    size: bytes.len() + chunk.len(),
                    limit: max_bytes,
                }
                .into());
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ImportError::MissingFile.into())
}

/// `ai-import`: hand the image to the extraction webhook
pub async fn start_import(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<(StatusCode, ApiResponse<ImportJob>)> {
    state.authorize(&auth_user, org_id, Action::RunImport).await?;

    let upload = read_upload(multipart, state.import_service.max_upload_bytes()).await?;
    let job = state
        .import_service
        .start_webhook_import(org_id, auth_user.0.user_id, upload)
        .await?;

    Ok((StatusCode::ACCEPTED, respond(job)))
}

/// `ai-import-direct`: extract with the vision API and reconcile before responding
pub async fn run_direct_import(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<(StatusCode, ApiResponse<ImportJob>)> {
    state.authorize(&auth_user, org_id, Action::RunImport).await?;

    let upload = read_upload(multipart, state.import_service.max_upload_bytes()).await?;
    let job = state
        .import_service
        .run_direct_import(org_id, auth_user.0.user_id, upload)
        .await?;

    Ok((StatusCode::CREATED, respond(job)))
}

pub async fn list_imports(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<ImportJob>>> {
    state.authorize(&auth_user, org_id, Action::RunImport).await?;
    let jobs = state
        .import_service
        .list_jobs(org_id, query.pagination())
        .await?;
    Ok(respond(jobs))
}

pub async fn get_import(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, job_id)): Path<(Uuid, Uuid)>,
) -> AppResult<ApiResponse<ImportJob>> {
    state.authorize(&auth_user, org_id, Action::RunImport).await?;
    Ok(respond(state.import_service.get_job(org_id, job_id).await?))
}

/// `ai-import-callback`: the raw body is needed to verify the signature
pub async fn import_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<ApiResponse<ImportJob>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let job = state.import_service.handle_callback(&body, signature).await?;
    Ok(respond(job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::{FromRequest, Request},
        http::header,
    };

    fn multipart(field: &str, bytes: &[u8]) -> Request {
        let mut body = format!(
            "--b\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"schedule.png\"\r\nContent-Type: image/png\r\n\r\n",
            field
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n--b--\r\n");

        Request::builder()
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=b")
            .body(Body::from(body))
            .unwrap()
    }

    async fn read(request: Request, max_bytes: usize) -> AppResult<UploadedFile> {
        let multipart = Multipart::from_request(request, &()).await.unwrap();
        read_upload(multipart, max_bytes).await
    }

    #[tokio::test]
    async fn test_read_upload_within_limit() {
        let upload = read(multipart("file", &[7; 64]), 64).await.unwrap();

        assert_eq!(upload.file_name, "schedule.png");
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.bytes.len(), 64);
    }

    #[tokio::test]
    async fn test_read_upload_stops_past_limit() {
        let err = read(multipart("file", &[7; 65]), 64).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_read_upload_needs_file_field() {
        let err = read(multipart("image", &[7; 8]), 64).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
