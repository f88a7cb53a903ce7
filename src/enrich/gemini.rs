//! Gemini `generateContent` client

use crate::enrich::{InlineImage, TextModel};
use crate::error::{EnrichmentError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 500;

/// Credential header; the key never goes in the URL
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Transport errors reach reports and logs, so they are stripped of the URL
fn request_error(e: reqwest::Error) -> EnrichmentError {
    EnrichmentError::Request(e.without_url().to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

/// Model client over the Gemini REST API
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(request_error)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request(&self, body: &GenerateRequest<'_>) -> std::result::Result<reqwest::Request, EnrichmentError> {
        self.client
            .post(self.url())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(body)
            .timeout(self.timeout)
            .build()
            .map_err(request_error)
    }
}

#[async_trait::async_trait]
impl TextModel for GeminiClient {
    #[instrument(skip(self, prompt, image), fields(model = %self.model))]
    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String> {
        let mut parts = vec![Part::Text { text: prompt }];
        if let Some(image) = image {
            parts.push(Part::Image {
                inline_data: InlineData {
                    mime_type: &image.mime_type,
                    data: image.base64(),
                },
            });
        }
        let body = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: "application/json",
            },
        };

        let request = self.build_request(&body)?;
        let response = self.client.execute(request).await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(EnrichmentError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let parsed: GenerateResponse = response.json().await.map_err(request_error)?;
        let text = parsed.text();
        debug!("Model replied with {} chars", text.len());
        if text.trim().is_empty() {
            return Err(EnrichmentError::EmptyResponse.into());
        }
        Ok(text)
    }
}
