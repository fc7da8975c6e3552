use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::booth::traits::{GeneratedImage, ImageGenerationError, ImageGenerator};
use crate::config::Config;
use crate::llm::media::{detect_mime_type, normalize_image_mime_type};
use crate::utils::http::{get_http_client, summarize_error_body, truncate_for_log};
use crate::utils::timing::log_service_timing;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MAX_RETRY_ATTEMPTS: usize = 2;
const GEMINI_RETRY_BASE_DELAY_MS: u64 = 900;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default)]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

/// Gemini `generateContent` client for image-to-image restyling.
#[derive(Clone)]
pub struct GeminiImageClient {
    api_key: String,
    model: String,
    aspect_ratio: Option<String>,
    safety_profile: String,
    timeout: Duration,
}

impl GeminiImageClient {
    pub fn from_config(config: &Config) -> Self {
        let aspect_ratio = config.gemini_image_aspect_ratio.trim();
        Self {
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_image_model.clone(),
            aspect_ratio: (!aspect_ratio.is_empty()).then(|| aspect_ratio.to_string()),
            safety_profile: config.gemini_safety_settings.clone(),
            timeout: Duration::from_secs(config.gemini_timeout_seconds),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn redact(&self, text: &str) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    fn build_payload(&self, image: &[u8], mime_type: &str, prompt: &str) -> Value {
        let mut generation_config = json!({ "responseModalities": ["IMAGE"] });
        if let Some(aspect_ratio) = self.aspect_ratio.as_deref() {
            if let Some(config_object) = generation_config.as_object_mut() {
                let mut image_config = Map::new();
                image_config.insert("aspectRatio".to_string(), json!(aspect_ratio));
                config_object.insert("imageConfig".to_string(), Value::Object(image_config));
            }
        }

        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": normalize_image_mime_type(mime_type),
                            "data": general_purpose::STANDARD.encode(image),
                        }
                    },
                    { "text": prompt }
                ]
            }],
            "generationConfig": generation_config,
            "safetySettings": build_safety_settings(&self.safety_profile),
        })
    }

    async fn call_api(&self, payload: &Value) -> Result<GeminiResponse, ImageGenerationError> {
        let client = get_http_client();
        let url = format!("{}/models/{}:generateContent", GEMINI_API_BASE, self.model);

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = match client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    let err_text = self.redact(&err.to_string());
                    let should_retry =
                        gemini_should_retry_error(&err) && attempt < GEMINI_MAX_RETRY_ATTEMPTS;
                    warn!(
                        "Gemini request failed to send: {} (timeout={}, connect={}, retrying={})",
                        err_text,
                        err.is_timeout(),
                        err.is_connect(),
                        should_retry
                    );
                    if should_retry {
                        tokio::time::sleep(gemini_retry_delay(attempt)).await;
                        continue;
                    }
                    return Err(ImageGenerationError(format!(
                        "Gemini request failed: {}",
                        err_text
                    )));
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let (message, body_summary) = summarize_error_body(&body);
                let should_retry =
                    gemini_should_retry_status(status) && attempt < GEMINI_MAX_RETRY_ATTEMPTS;
                warn!(
                    "Gemini API error: status={}, body={}, retrying={}",
                    status,
                    self.redact(&body_summary),
                    should_retry
                );
                if should_retry {
                    tokio::time::sleep(gemini_retry_delay(attempt)).await;
                    continue;
                }
                let detail = self.redact(&message.unwrap_or(body_summary));
                return Err(ImageGenerationError(format!(
                    "Gemini request failed with status {}: {}",
                    status, detail
                )));
            }

            return response
                .json::<GeminiResponse>()
                .await
                .map_err(|err| {
                    ImageGenerationError(format!(
                        "Failed to parse Gemini response: {}",
                        self.redact(&err.to_string())
                    ))
                });
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageClient {
    async fn generate(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<GeneratedImage, ImageGenerationError> {
        let payload = self.build_payload(image, mime_type, prompt);
        debug!(
            target: "llm.gemini",
            model = %self.model,
            image_bytes = image.len(),
            prompt = %truncate_for_log(prompt, 200)
        );

        let metadata = json!({ "imageBytes": image.len(), "promptChars": prompt.chars().count() });
        log_service_timing("gemini", &self.model, "generate_fashion_image", Some(metadata), || async {
            let response = self.call_api(&payload).await?;
            extract_first_image(response).ok_or_else(|| {
                ImageGenerationError(format!(
                    "No image was generated by the API (model: {})",
                    self.model
                ))
            })
        })
        .await
    }
}

fn gemini_should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn gemini_should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn gemini_retry_delay(attempt: usize) -> Duration {
    let attempt = attempt.max(1) as u64;
    Duration::from_millis(GEMINI_RETRY_BASE_DELAY_MS.saturating_mul(attempt))
}

fn build_safety_settings(profile: &str) -> Vec<Value> {
    let threshold = match profile {
        "standard" => "BLOCK_MEDIUM_AND_ABOVE",
        "permissive" => "OFF",
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}', using permissive defaults.",
                profile
            );
            "OFF"
        }
    };

    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_CIVIC_INTEGRITY", "threshold": threshold }),
    ]
}

fn extract_first_image(response: GeminiResponse) -> Option<GeneratedImage> {
    for candidate in response.candidates.unwrap_or_default() {
        let Some(parts) = candidate.content.and_then(|content| content.parts) else {
            if let Some(reason) = candidate.finish_reason {
                warn!("Gemini candidate finished without content: {}", reason);
            }
            continue;
        };
        for part in parts {
            let Some(inline_data) = part.inline_data else {
                continue;
            };
            if !inline_data.mime_type.starts_with("image/") {
                continue;
            }
            match general_purpose::STANDARD.decode(inline_data.data) {
                Ok(bytes) => {
                    let mime_type = detect_mime_type(&bytes)
                        .filter(|mime| mime.starts_with("image/"))
                        .unwrap_or(inline_data.mime_type);
                    return Some(GeneratedImage {
                        mime_type: normalize_image_mime_type(&mime_type),
                        bytes,
                    });
                }
                Err(err) => warn!("Gemini returned undecodable image data: {}", err),
            }
        }
    }
    None
}
