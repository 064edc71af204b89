//! Import Webhook Client
//!
//! Hands an uploaded image to a third-party extraction service. The request
//! body is JSON and signed with the shared secret so the receiver can verify it.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use uuid::Uuid;

use crate::models::import::ImportJob;
use crate::service::import_service::ImportError;
use crate::utils::security::sign_payload;

pub const SIGNATURE_HEADER: &str = "X-Import-Signature";
pub const JOB_HEADER: &str = "X-Import-Job";

#[derive(Serialize)]
struct WebhookPayload<'a> {
    job_id: Uuid,
    organization_id: Uuid,
    callback_url: &'a str,
    file_name: &'a str,
    content_type: &'a str,
    file_base64: String,
}

#[derive(Clone)]
pub struct ImportWebhookClient {
    http: reqwest::Client,
    url: String,
    secret: String,
    callback_url: String,
}

impl ImportWebhookClient {
    pub fn new(
        url: String,
        secret: String,
        callback_url: String,
        timeout_seconds: u64,
    ) -> Result<Self, ImportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ImportError::Webhook(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url,
            secret,
            callback_url,
        })
    }

    /// Posts the job's file; any non-2xx answer is a failure
    pub async fn dispatch(&self, job: &ImportJob, file: &[u8]) -> Result<(), ImportError> {
        let payload = WebhookPayload {
            job_id: job.id,
            organization_id: job.organization_id,
            callback_url: &self.callback_url,
            file_name: &job.file_name,
            content_type: &job.content_type,
            file_base64: STANDARD.encode(file),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|e| ImportError::Webhook(format!("Failed to encode payload: {}", e)))?;

        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, sign_payload(&self.secret, &body))
            .header(JOB_HEADER, job.id.to_string())
            .body(body)
            .send()
            .await
            .map_err(|e| ImportError::Webhook(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Webhook(format!(
                "Webhook answered HTTP {}",
                status
            )));
        }

        log::info!("Import job {} handed to extraction webhook", job.id);
        Ok(())
    }
}
