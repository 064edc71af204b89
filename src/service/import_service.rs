//! Import Service
//!
//! Runs AI-assisted imports of competition schedules from images.
//!
//! Two extraction modes share the same job lifecycle:
//!
//! - **direct**: the vision API is called while the upload request waits;
//!   the job is completed (or failed) before the response is sent.
//! - **webhook**: the image is handed to an external extraction service that
//!   later posts the result to `/imports/callback`, signed with the shared secret.
//!
//! Extraction results are reconciled inside one transaction that holds a row
//! lock on the job, so concurrent or repeated callbacks apply at most once.

use std::path::{Path, PathBuf};

use sqlx::{types::Json, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ImportConfig, VisionConfig};
use crate::database::Pagination;
use crate::models::import::{
    CallbackStatus, ExtractedImport, ImportCallbackRequest, ImportJob, ImportMode, ImportStatus,
};
use crate::service::{
    extraction::{parse_extraction, parse_model_reply},
    import_reconciler::reconcile,
    import_webhook::ImportWebhookClient,
    vision::VisionClient,
};
use crate::utils::{
    error::AppError,
    security::{sanitize_file_name, verify_signature},
};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No file was uploaded")]
    MissingFile,

    #[error("Unsupported file type: {0}")]
    UnsupportedContentType(String),

    #[error("File is {size} bytes; the limit is {limit}")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Vision extraction is not configured")]
    VisionNotConfigured,

    #[error("Import webhook is not configured")]
    WebhookNotConfigured,

    #[error("Vision API error: {0}")]
    Vision(String),

    #[error("Import webhook error: {0}")]
    Webhook(String),

    #[error("Unreadable extraction result: {0}")]
    InvalidResponse(String),

    #[error("No competitions found in the extraction result")]
    EmptyExtraction,

    #[error("Invalid or missing callback signature")]
    InvalidSignature,

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("Import job not found")]
    JobNotFound,

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ImportError {
    /// Whether this error ends the job it occurred in
    fn fails_job(&self) -> bool {
        !matches!(
            self,
            ImportError::JobNotFound
                | ImportError::InvalidTransition(_)
                | ImportError::InvalidSignature
        )
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MissingFile => AppError::BadRequest(err.to_string()),
            ImportError::UnsupportedContentType(_) | ImportError::EmptyExtraction => {
                AppError::Validation(err.to_string())
            }
            ImportError::FileTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            ImportError::VisionNotConfigured | ImportError::WebhookNotConfigured => {
                AppError::Configuration(err.to_string())
            }
            ImportError::Vision(_) | ImportError::Webhook(_) | ImportError::InvalidResponse(_) => {
                AppError::ExternalService(err.to_string())
            }
            ImportError::InvalidSignature => AppError::Authentication(err.to_string()),
            ImportError::InvalidCallback(_) => AppError::BadRequest(err.to_string()),
            ImportError::JobNotFound => AppError::NotFound(err.to_string()),
            ImportError::InvalidTransition(message) => AppError::Conflict(message),
            ImportError::Storage(e) => AppError::Internal(format!("Upload storage failed: {}", e)),
            ImportError::Database(e) => AppError::Database(e),
        }
    }
}

/// An image received from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ImportService {
    pool: PgPool,
    config: ImportConfig,
    vision: Option<VisionClient>,
    webhook: Option<ImportWebhookClient>,
}

impl ImportService {
    pub fn new(
        pool: PgPool,
        config: ImportConfig,
        vision: Option<VisionConfig>,
    ) -> Result<Self, ImportError> {
        let vision = vision.map(VisionClient::new).transpose()?;

        let webhook = match (&config.webhook_url, &config.webhook_secret) {
            (Some(url), Some(secret)) => Some(ImportWebhookClient::new(
                url.clone(),
                secret.clone(),
                config.callback_url(),
                config.webhook_timeout_seconds,
            )?),
            _ => None,
        };

        Ok(Self {
            pool,
            config,
            vision,
            webhook,
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    /// Checks type and size; returns the canonical content type
    pub fn validate_upload(&self, upload: &UploadedFile) -> Result<String, ImportError> {
        if upload.bytes.is_empty() {
            return Err(ImportError::MissingFile);
        }

        if upload.bytes.len() > self.config.max_upload_bytes {
            return Err(ImportError::FileTooLarge {
                size: upload.bytes.len(),
                limit: self.config.max_upload_bytes,
            });
        }

        let declared = canonical_content_type(&upload.content_type);
        if !self.config.allowed_content_types.iter().any(|t| *t == declared) {
            return Err(ImportError::UnsupportedContentType(declared));
        }

        match sniff_image_type(&upload.bytes) {
            Some(actual) if actual == declared => Ok(declared),
            Some(actual) => Err(ImportError::UnsupportedContentType(format!(
                "{} (declared {})",
                actual, declared
            ))),
            None => Err(ImportError::UnsupportedContentType(format!(
                "unrecognized image data (declared {})",
                declared
            ))),
        }
    }

    /// `ai-import`: stores the upload and hands it to the extraction webhook
    pub async fn start_webhook_import(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        upload: UploadedFile,
    ) -> Result<ImportJob, ImportError> {
        let webhook = self
            .webhook
            .as_ref()
            .ok_or(ImportError::WebhookNotConfigured)?;
        let content_type = self.validate_upload(&upload)?;

        let job = self
            .create_job(
                organization_id,
                user_id,
                ImportMode::Webhook,
                ImportStatus::Pending,
                &upload,
                &content_type,
            )
            .await?;

        let result = match webhook.dispatch(&job, &upload.bytes).await {
            Ok(()) => self.mark_processing(job.id).await,
            Err(err) => Err(err),
        };
        self.settle(job.id, result).await
    }

    /// `ai-import-direct`: extracts with the vision API and reconciles immediately
    pub async fn run_direct_import(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        upload: UploadedFile,
    ) -> Result<ImportJob, ImportError> {
        let vision = self
            .vision
            .as_ref()
            .ok_or(ImportError::VisionNotConfigured)?;
        let content_type = self.validate_upload(&upload)?;

        let job = self
            .create_job(
                organization_id,
                user_id,
                ImportMode::Direct,
                ImportStatus::Processing,
                &upload,
                &content_type,
            )
            .await?;

        let result = async {
            let reply = vision.extract(&upload.bytes, &content_type).await?;
            let extraction = parse_model_reply(&reply)?;
            self.apply_extraction(job.id, &extraction).await
        }
        .await;

        self.settle(job.id, result).await
    }

    /// `ai-import-callback`: verifies and applies a webhook result
    ///
    /// A repeated callback for a completed job returns the stored job unchanged.
    pub async fn handle_callback(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<ImportJob, ImportError> {
        let secret = self
            .config
            .webhook_secret
            .as_deref()
            .ok_or(ImportError::WebhookNotConfigured)?;

        match signature {
            Some(signature) if verify_signature(secret, body, signature) => {}
            _ => return Err(ImportError::InvalidSignature),
        }

        let request: ImportCallbackRequest = serde_json::from_slice(body)
            .map_err(|e| ImportError::InvalidCallback(e.to_string()))?;

        let job = self.find_job(request.job_id).await?;
        if job.mode != ImportMode::Webhook {
            return Err(ImportError::InvalidTransition(
                "Import job does not accept callbacks".to_string(),
            ));
        }
        if job.status.is_terminal() {
            log::info!("Callback for settled import job {} ({})", job.id, job.status.as_str());
            return settled(job);
        }

        match request.status {
            CallbackStatus::Failed => {
                let message = request
                    .error
                    .unwrap_or_else(|| "Extraction failed".to_string());
                self.mark_failed(job.id, &message).await
            }
            CallbackStatus::Completed => {
                let result = match request.data {
                    Some(data) => parse_extraction(&data)
                        .map_err(|e| ImportError::InvalidCallback(e.to_string())),
                    None => Err(ImportError::InvalidCallback(
                        "completed callback carries no data".to_string(),
                    )),
                };
                let result = match result {
                    Ok(extraction) => self.apply_extraction(job.id, &extraction).await,
                    Err(err) => Err(err),
                };
                self.settle(job.id, result).await
            }
        }
    }

    /// Reconciles `extraction` and completes the job in one transaction
    pub async fn apply_extraction(
        &self,
        job_id: Uuid,
        extraction: &ExtractedImport,
    ) -> Result<ImportJob, ImportError> {
        let mut tx = self.pool.begin().await?;

        let job = sqlx::query_as::<_, ImportJob>(
            "SELECT * FROM import_jobs WHERE id = $1 FOR UPDATE",
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ImportError::JobNotFound)?;

        if job.status.is_terminal() {
            return settled(job);
        }

        let summary = reconcile(&mut *tx, job.organization_id, job.id, extraction).await?;

        let job = sqlx::query_as::<_, ImportJob>(
            r#"
            UPDATE import_jobs
            SET status = 'completed', summary = $2, error = NULL,
                updated_at = NOW(), completed_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(Json(&summary))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Import job {} completed: {} competitions created, {} matched, {} warnings",
            job.id,
            summary.competitions.created,
            summary.competitions.matched,
            summary.warnings.len()
        );
        Ok(job)
    }

    pub async fn get_job(
        &self,
        organization_id: Uuid,
        job_id: Uuid,
    ) -> Result<ImportJob, ImportError> {
        sqlx::query_as::<_, ImportJob>(
            "SELECT * FROM import_jobs WHERE organization_id = $1 AND id = $2",
        )
        .bind(organization_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ImportError::JobNotFound)
    }

    pub async fn list_jobs(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> Result<Vec<ImportJob>, ImportError> {
        let jobs = sqlx::query_as::<_, ImportJob>(
            r#"
            SELECT * FROM import_jobs
            WHERE organization_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(organization_id)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// Most recent jobs across all organizations, optionally filtered by status
    pub async fn list_recent(
        &self,
        status: Option<ImportStatus>,
        limit: i64,
    ) -> Result<Vec<ImportJob>, ImportError> {
        let jobs = sqlx::query_as::<_, ImportJob>(
            r#"
            SELECT * FROM import_jobs
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn find_job(&self, job_id: Uuid) -> Result<ImportJob, ImportError> {
        sqlx::query_as::<_, ImportJob>("SELECT * FROM import_jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ImportError::JobNotFound)
    }

    async fn create_job(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        mode: ImportMode,
        status: ImportStatus,
        upload: &UploadedFile,
        content_type: &str,
    ) -> Result<ImportJob, ImportError> {
        let job_id = Uuid::new_v4();
        let file_name = sanitize_file_name(&upload.file_name);
        let path = self.store_upload(job_id, &file_name, &upload.bytes).await?;

        let inserted = sqlx::query_as::<_, ImportJob>(
            r#"
            INSERT INTO import_jobs
                (id, organization_id, created_by, mode, status, file_name, content_type, storage_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(organization_id)
        .bind(user_id)
        .bind(mode.as_str())
        .bind(status.as_str())
        .bind(&file_name)
        .bind(content_type)
        .bind(path.to_string_lossy().as_ref())
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(job) => {
                log::info!(
                    "Created {} import job {} for organization {}",
                    mode.as_str(),
                    job.id,
                    organization_id
                );
                Ok(job)
            }
            Err(err) => {
                if let Some(dir) = path.parent() {
                    if let Err(cleanup) = tokio::fs::remove_dir_all(dir).await {
                        log::warn!("Could not remove upload {}: {}", dir.display(), cleanup);
                    }
                }
                Err(err.into())
            }
        }
    }

    async fn store_upload(
        &self,
        job_id: Uuid,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, ImportError> {
        let dir = Path::new(&self.config.upload_dir).join(job_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Moves a dispatched job to `processing` unless a callback already settled it
    async fn mark_processing(&self, job_id: Uuid) -> Result<ImportJob, ImportError> {
        let updated = sqlx::query_as::<_, ImportJob>(
            r#"
            UPDATE import_jobs SET status = 'processing', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(job) => Ok(job),
            None => self.find_job(job_id).await,
        }
    }

    async fn mark_failed(&self, job_id: Uuid, message: &str) -> Result<ImportJob, ImportError> {
        let updated = sqlx::query_as::<_, ImportJob>(
            r#"
            UPDATE import_jobs
            SET status = 'failed', error = $2, updated_at = NOW(), completed_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'processing')
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(job) => {
                log::warn!("Import job {} failed: {}", job_id, message);
                Ok(job)
            }
            None => self.find_job(job_id).await,
        }
    }

    /// Marks the job failed when `result` carries an error that ends it
    async fn settle(
        &self,
        job_id: Uuid,
        result: Result<ImportJob, ImportError>,
    ) -> Result<ImportJob, ImportError> {
        match result {
            Err(err) if err.fails_job() => {
                if let Err(mark_err) = self.mark_failed(job_id, &err.to_string()).await {
                    log::error!("Could not mark import job {} failed: {}", job_id, mark_err);
                }
                Err(err)
            }
            other => other,
        }
    }
}

/// Outcome for a job that already finished: completed jobs are returned as-is
fn settled(job: ImportJob) -> Result<ImportJob, ImportError> {
    match job.status {
        ImportStatus::Failed => Err(ImportError::InvalidTransition(
            "Import job has already failed".to_string(),
        )),
        _ => Ok(job),
    }
}

/// Lowercases, drops parameters and maps `image/jpg` to `image/jpeg`
pub fn canonical_content_type(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

/// Detects the image format from its leading bytes
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::security::sign_payload;
    use httpmock::prelude::*;
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn import_config(upload_dir: &Path) -> ImportConfig {
        ImportConfig {
            upload_dir: upload_dir.to_string_lossy().into_owned(),
            max_upload_bytes: 64,
            webhook_secret: Some("hook-secret".to_string()),
            ..ImportConfig::default()
        }
    }

    fn lazy_service(config: ImportConfig) -> ImportService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/league_unused")
            .unwrap();
        ImportService::new(pool, config, None).unwrap()
    }

    fn upload(content_type: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: "../schedule 2025.png".to_string(),
            content_type: content_type.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_canonical_content_type() {
        assert_eq!(canonical_content_type("Image/JPG"), "image/jpeg");
        assert_eq!(canonical_content_type("image/png; charset=binary"), "image/png");
    }

    #[test]
    fn test_sniff_image_type() {
        assert_eq!(sniff_image_type(PNG), Some("image/png"));
        assert_eq!(sniff_image_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image_type(b"GIF89a"), Some("image/gif"));
        assert_eq!(sniff_image_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_type(b"%PDF-1.7"), None);
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            AppError::from(ImportError::FileTooLarge { size: 2, limit: 1 }),
            AppError::PayloadTooLarge(_)
        ));
        assert!(matches!(
            AppError::from(ImportError::InvalidSignature),
            AppError::Authentication(_)
        ));
        assert!(matches!(
            AppError::from(ImportError::Webhook("down".into())),
            AppError::ExternalService(_)
        ));
        assert!(matches!(
            AppError::from(ImportError::InvalidTransition("failed".into())),
            AppError::Conflict(_)
        ));
        assert!(!ImportError::JobNotFound.fails_job());
        assert!(ImportError::EmptyExtraction.fails_job());
    }

    #[tokio::test]
    async fn test_validate_upload() {
        let dir = tempfile::tempdir().unwrap();
        let service = lazy_service(import_config(dir.path()));

        assert_eq!(
            service.validate_upload(&upload("image/png", PNG)).unwrap(),
            "image/png"
        );
        assert!(matches!(
            service.validate_upload(&upload("image/png", &[])),
            Err(ImportError::MissingFile)
        ));
        assert!(matches!(
            service.validate_upload(&upload("application/pdf", b"%PDF-1.7")),
            Err(ImportError::UnsupportedContentType(_))
        ));
        // declared type must match the bytes
        assert!(matches!(
            service.validate_upload(&upload("image/jpeg", PNG)),
            Err(ImportError::UnsupportedContentType(_))
        ));
        assert!(matches!(
            service.validate_upload(&upload("image/png", &[0x89; 65])),
            Err(ImportError::FileTooLarge { size: 65, limit: 64 })
        ));
    }

    #[tokio::test]
    async fn test_store_upload_sanitizes_name() {
        let dir = tempfile::tempdir().unwrap();
        let service = lazy_service(import_config(dir.path()));
        let job_id = Uuid::new_v4();

        let name = sanitize_file_name("../schedule 2025.png");
        let path = service.store_upload(job_id, &name, PNG).await.unwrap();

        assert!(path.starts_with(dir.path().join(job_id.to_string())));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), PNG);
    }

    #[tokio::test]
    async fn test_modes_require_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let service = lazy_service(import_config(dir.path()));

        assert!(matches!(
            service
                .run_direct_import(Uuid::new_v4(), Uuid::new_v4(), upload("image/png", PNG))
                .await,
            Err(ImportError::VisionNotConfigured)
        ));
        assert!(matches!(
            service
                .start_webhook_import(Uuid::new_v4(), Uuid::new_v4(), upload("image/png", PNG))
                .await,
            Err(ImportError::WebhookNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_callback_rejects_bad_signature() {
        let dir = tempfile::tempdir().unwrap();
        let service = lazy_service(import_config(dir.path()));
        let body = br#"{"job_id":"7f1c3b3e-4e8a-4f57-9d1a-0b6a2f8f2c11","status":"failed"}"#;

        assert!(matches!(
            service.handle_callback(body, None).await,
            Err(ImportError::InvalidSignature)
        ));
        let forged = sign_payload("other-secret", body);
        assert!(matches!(
            service.handle_callback(body, Some(&forged)).await,
            Err(ImportError::InvalidSignature)
        ));
    }

    async fn seed_org(pool: &PgPool) -> (Uuid, Uuid) {
        let org: Uuid = sqlx::query_scalar(
            "INSERT INTO organizations (name, slug) VALUES ('Club', 'club') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let user: Uuid = sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash) VALUES ('A', 'a@example.com', 'x') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        (org, user)
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_direct_import_end_to_end(pool: PgPool) {
        let (org, user) = seed_org(&pool).await;
        let dir = tempfile::tempdir().unwrap();

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "content":
                        "```json\n{\"competitions\":[{\"name\":\"Spring Open\",\"date\":\"10/05/2025\",\"venue\":\"City Stadium\",\"events\":[\"100m\"]}]}\n```"
                    } }]
                }));
            })
            .await;

        let vision = VisionConfig {
            api_base_url: server.base_url(),
            api_key: "key".to_string(),
            model: "vision-test".to_string(),
            max_tokens: 256,
            timeout_seconds: 5,
        };
        let service = ImportService::new(pool, import_config(dir.path()), Some(vision)).unwrap();

        let job = service
            .run_direct_import(org, user, upload("image/png", PNG))
            .await
            .unwrap();

        assert_eq!(job.status, ImportStatus::Completed);
        let summary = job.summary.as_ref().unwrap();
        assert_eq!(summary.competitions.created, 1);
        assert_eq!(summary.locations.created, 1);
        assert_eq!(summary.events.created, 1);
        assert_eq!(service.list_jobs(org, Pagination::default()).await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_direct_import_failure_marks_job(pool: PgPool) {
        let (org, user) = seed_org(&pool).await;
        let dir = tempfile::tempdir().unwrap();

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .json_body(json!({ "choices": [{ "message": { "content": "{\"competitions\": []}" } }] }));
            })
            .await;

        let vision = VisionConfig {
            api_base_url: server.base_url(),
            api_key: "key".to_string(),
            model: "vision-test".to_string(),
            max_tokens: 256,
            timeout_seconds: 5,
        };
        let service = ImportService::new(pool, import_config(dir.path()), Some(vision)).unwrap();

        let err = service
            .run_direct_import(org, user, upload("image/png", PNG))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::EmptyExtraction));

        let jobs = service.list_jobs(org, Pagination::default()).await.unwrap();
        assert_eq!(jobs[0].status, ImportStatus::Failed);
        assert!(jobs[0].error.is_some());
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_webhook_import_and_idempotent_callback(pool: PgPool) {
        let (org, user) = seed_org(&pool).await;
        let dir = tempfile::tempdir().unwrap();

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/extract");
                then.status(202);
            })
            .await;

        let config = ImportConfig {
            webhook_url: Some(server.url("/extract")),
            ..import_config(dir.path())
        };
        let service = ImportService::new(pool, config, None).unwrap();

        let job = service
            .start_webhook_import(org, user, upload("image/png", PNG))
            .await
            .unwrap();
        assert_eq!(job.status, ImportStatus::Processing);

        let body = serde_json::to_vec(&json!({
            "job_id": job.id,
            "status": "completed",
            "data": { "competitions": [{ "name": "Relay Cup", "season": "2025" }] }
        }))
        .unwrap();
        let signature = sign_payload("hook-secret", &body);

        let first = service.handle_callback(&body, Some(&signature)).await.unwrap();
        assert_eq!(first.status, ImportStatus::Completed);

        let second = service.handle_callback(&body, Some(&signature)).await.unwrap();
        assert_eq!(second.completed_at, first.completed_at);
        assert_eq!(
            second.summary.as_ref().unwrap().competition_ids,
            first.summary.as_ref().unwrap().competition_ids
        );
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_callback_after_failure_conflicts(pool: PgPool) {
        let (org, user) = seed_org(&pool).await;
        let dir = tempfile::tempdir().unwrap();

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/extract");
                then.status(202);
            })
            .await;

        let config = ImportConfig {
            webhook_url: Some(server.url("/extract")),
            ..import_config(dir.path())
        };
        let service = ImportService::new(pool, config, None).unwrap();
        let job = service
            .start_webhook_import(org, user, upload("image/png", PNG))
            .await
            .unwrap();

        let failed = serde_json::to_vec(&json!({
            "job_id": job.id, "status": "failed", "error": "unreadable image"
        }))
        .unwrap();
        let job = service
            .handle_callback(&failed, Some(&sign_payload("hook-secret", &failed)))
            .await
            .unwrap();
        assert_eq!(job.status, ImportStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("unreadable image"));

        let late = serde_json::to_vec(&json!({
            "job_id": job.id, "status": "completed", "data": { "name": "Late Cup" }
        }))
        .unwrap();
        assert!(matches!(
            service
                .handle_callback(&late, Some(&sign_payload("hook-secret", &late)))
                .await,
            Err(ImportError::InvalidTransition(_))
        ));
    }

    async fn pending_webhook_job(pool: &PgPool, org: Uuid, user: Uuid) -> Uuid {
        let job = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO import_jobs
                (id, organization_id, created_by, mode, status, file_name, content_type, storage_path)
            VALUES ($1, $2, $3, 'webhook', 'pending', 'a.png', 'image/png', '/tmp/a.png')
            "#,
        )
        .bind(job)
        .bind(org)
        .bind(user)
        .execute(pool)
        .await
        .unwrap();
        job
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_early_callback_survives_dispatch_bookkeeping(pool: PgPool) {
        let (org, user) = seed_org(&pool).await;
        let dir = tempfile::tempdir().unwrap();
        let service = ImportService::new(pool.clone(), import_config(dir.path()), None).unwrap();
        let job_id = pending_webhook_job(&pool, org, user).await;

        // the extraction service answered before the dispatch request returned
        let body = serde_json::to_vec(&json!({
            "job_id": job_id,
            "status": "completed",
            "data": { "name": "Early Cup" }
        }))
        .unwrap();
        let completed = service
            .handle_callback(&body, Some(&sign_payload("hook-secret", &body)))
            .await
            .unwrap();
        assert_eq!(completed.status, ImportStatus::Completed);

        let after = service.mark_processing(job_id).await.unwrap();
        assert_eq!(after.status, ImportStatus::Completed);
        assert_eq!(after.completed_at, completed.completed_at);
        assert_eq!(after.summary.unwrap().competitions.created, 1);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_reconcile_failure_rolls_back_and_fails_job(pool: PgPool) {
        let (org, user) = seed_org(&pool).await;
        let dir = tempfile::tempdir().unwrap();
        let service = ImportService::new(pool.clone(), import_config(dir.path()), None).unwrap();
        let job_id = pending_webhook_job(&pool, org, user).await;

        // the second name overflows the column after the first competition was written
        let body = serde_json::to_vec(&json!({
            "job_id": job_id,
            "status": "completed",
            "data": { "competitions": [
                { "name": "Relay Cup", "season": "2025", "venue": "Track" },
                { "name": "x".repeat(300), "season": "2026" }
            ] }
        }))
        .unwrap();
        let err = service
            .handle_callback(&body, Some(&sign_payload("hook-secret", &body)))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Database(_)), "{:?}", err);

        let job = service.get_job(org, job_id).await.unwrap();
        assert_eq!(job.status, ImportStatus::Failed);
        assert!(job.error.is_some());
        assert!(job.summary.is_none());

        let (competitions, seasons, locations): (i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM competitions), (SELECT COUNT(*) FROM seasons), (SELECT COUNT(*) FROM locations)",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!((competitions, seasons, locations), (0, 0, 0));
    }
}
