//! Vision Client
//!
//! Sends an uploaded schedule image to an OpenAI-compatible chat-completions
//! endpoint and returns the model's raw text reply.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;

use crate::config::VisionConfig;
use crate::service::import_service::ImportError;

const SYSTEM_PROMPT: &str = "You extract sports competition schedules from images. \
Reply with a single JSON object and nothing else, shaped as \
{\"competitions\": [{\"name\": string, \"season\": string|null, \
\"location\": {\"name\": string, \"city\": string|null, \"address\": string|null, \"country\": string|null}|null, \
\"start_date\": \"YYYY-MM-DD\"|null, \"end_date\": \"YYYY-MM-DD\"|null, \"description\": string|null, \
\"events\": [{\"name\": string, \"date\": \"YYYY-MM-DD\"|null, \"time\": \"HH:MM\"|null}]}]}. \
Use two-letter ISO country codes. Omit anything you cannot read.";

const USER_PROMPT: &str = "Extract every competition, venue and scheduled event shown in this image.";

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    config: VisionConfig,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, ImportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ImportError::Vision(format!("Failed to create HTTP client: {}", e)))?;

        log::info!("Vision extraction enabled with model {}", config.model);
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base_url.trim_end_matches('/')
        )
    }

    /// Returns the model's reply text for one image
    pub async fn extract(&self, image: &[u8], content_type: &str) -> Result<String, ImportError> {
        let data_url = format!("data:{};base64,{}", content_type, STANDARD.encode(image));

        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_PROMPT },
                        { "type": "image_url", "image_url": { "url": data_url, "detail": "high" } }
                    ]
                }
            ]
        });

        log::debug!("Sending {} byte image to {}", image.len(), self.endpoint());

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ImportError::Vision(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ImportError::Vision(format!(
                "HTTP {}: {}",
                status,
                truncate(&detail, 300)
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ImportError::InvalidResponse(format!("Unreadable completion: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ImportError::InvalidResponse("Completion has no content".to_string()))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config(base_url: String) -> VisionConfig {
        VisionConfig {
            api_base_url: base_url,
            api_key: "test-key".to_string(),
            model: "vision-test".to_string(),
            max_tokens: 512,
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_extract_returns_reply_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .body_contains("data:image/png;base64,iVBO")
                    .body_contains("\"model\":\"vision-test\"");
                then.status(200).json_body(serde_json::json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "{\"competitions\": []}" } }
                    ]
                }));
            })
            .await;

        let client = VisionClient::new(config(server.base_url())).unwrap();
        let reply = client
            .extract(&[0x89, b'P', b'N', b'G'], "image/png")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "{\"competitions\": []}");
    }

    #[tokio::test]
    async fn test_extract_surfaces_http_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let client = VisionClient::new(config(format!("{}/", server.base_url()))).unwrap();
        let err = client.extract(b"img", "image/jpeg").await.unwrap_err();

        match err {
            ImportError::Vision(message) => assert!(message.contains("429")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_rejects_empty_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .json_body(serde_json::json!({ "choices": [ { "message": { "content": null } } ] }));
            })
            .await;

        let client = VisionClient::new(config(server.base_url())).unwrap();
        assert!(matches!(
            client.extract(b"img", "image/gif").await,
            Err(ImportError::InvalidResponse(_))
        ));
    }
}
