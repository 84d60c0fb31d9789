use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::RigspecError;
use crate::schema;
use crate::types::ComponentSpec;

const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024; // 2MB

// ---------------------------------------------------------------------------
// Wire types: generateContent request
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: &'static str,
    pub response_schema: serde_json::Value,
}

impl GenerateContentRequest {
    /// Build the full provider payload: user content, the fixed system
    /// instruction, and the Output Schema Descriptor.
    pub fn new(prompt: &str, hardware_data: Option<&str>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: schema::build_user_prompt(prompt, hardware_data),
                }],
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: schema::SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema::response_schema(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types: generateContent response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// One generateContent attempt. Classifies the provider status:
    /// 400/403 are auth/request faults (non-retryable), 429 and 5xx are
    /// transient (retryable), anything else non-success is terminal with
    /// its own message. Retry policy lives in [`crate::retry`].
    pub async fn generate(
        &self,
        base_url: &str,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, RigspecError> {
        let url = format!("{base_url}/models/{model}:generateContent?key={api_key}");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            // Cap error body reads to MAX_RESPONSE_BYTES to prevent memory exhaustion
            let error_bytes = response.bytes().await.unwrap_or_default();
            let truncated = &error_bytes[..error_bytes.len().min(MAX_RESPONSE_BYTES)];
            let message = format!("{status}: {}", String::from_utf8_lossy(truncated));
            let code = status.as_u16();

            return Err(match code {
                400 | 403 => RigspecError::ProviderAuth {
                    status: code,
                    message,
                },
                429 => RigspecError::ProviderTransient {
                    status: code,
                    message,
                },
                c if c >= 500 => RigspecError::ProviderTransient {
                    status: code,
                    message,
                },
                _ => RigspecError::ProviderStatus {
                    status: code,
                    message,
                },
            });
        }

        // Enforce response size limit before parsing
        let bytes = response.bytes().await?;

        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(RigspecError::ProviderStatus {
                status: status.as_u16(),
                message: format!(
                    "response too large: {} bytes (max {})",
                    bytes.len(),
                    MAX_RESPONSE_BYTES
                ),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            RigspecError::OutputParse(format!("provider response envelope: {e}"))
        })
    }
}

/// Pull the first candidate's text out of the response envelope.
/// Missing candidates, missing content, empty parts, or an empty text all
/// land on the empty-generation path, carrying the candidate's finish
/// reason and the strongest safety signal so the caller can see why
/// generation stopped (e.g. safety filtering).
pub fn extract_text(response: GenerateContentResponse) -> Result<String, RigspecError> {
    let candidate = match response.candidates.into_iter().next() {
        Some(c) => c,
        None => {
            return Err(RigspecError::EmptyGeneration {
                finish_reason: "NO_CANDIDATES".to_string(),
                safety: None,
            });
        }
    };

    let finish_reason = candidate
        .finish_reason
        .unwrap_or_else(|| "UNSPECIFIED".to_string());

    let safety = if candidate.safety_ratings.is_empty() {
        None
    } else {
        Some(
            candidate
                .safety_ratings
                .iter()
                .map(|r| format!("{}={}", r.category, r.probability))
                .collect::<Vec<_>>()
                .join(", "),
        )
    };

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .filter(|t| !t.is_empty());

    match text {
        Some(t) => Ok(t),
        None => Err(RigspecError::EmptyGeneration {
            finish_reason,
            safety,
        }),
    }
}

/// Parse the candidate text as the component list. The schema constraint
/// already forced shape at generation time, so deserialization is the only
/// validation performed; field presence is not re-checked element by element.
pub fn parse_components(text: &str) -> Result<Vec<ComponentSpec>, RigspecError> {
    serde_json::from_str(text).map_err(|e| RigspecError::OutputParse(e.to_string()))
}
