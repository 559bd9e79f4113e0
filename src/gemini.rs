//! Gateway for the three Gemini operations: image-to-image simulation,
//! structured style analysis and Maps-grounded salon search. Each call is an
//! isolated failure domain: only analysis propagates an error, the other two
//! degrade to `None` / an empty list.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{Config, ANALYSIS_PROMPT, SIMULATION_PROMPT};
use crate::error::ApiError;
use crate::types::{Photo, Salon, StyleAdvice};

pub const MAX_SALON_RESULTS: usize = 5;

const ANALYSIS_FAILED_MESSAGE: &str = "스타일 분석에 실패했습니다.";
const SALON_ADDRESS_PLACEHOLDER: &str = "지도에서 위치 보기";

/// The upstream seam of the orchestrator. Implemented by [`GeminiClient`]
/// for production and by a counting mock in tests.
#[async_trait]
pub trait StyleGateway {
    /// Best-effort "after" portrait as a data URI. Never fails the request;
    /// any upstream problem is logged and surfaces as `None`.
    async fn simulate(&self, current: &Photo, desired: &Photo) -> Option<String>;

    /// Structured styling advice. The one load-bearing call: any failure
    /// (network, malformed JSON, schema violation) is an error.
    async fn analyze(&self, current: &Photo, desired: &Photo) -> Result<StyleAdvice, ApiError>;

    /// Nearby salons for a style name, deduplicated by name and capped at
    /// [`MAX_SALON_RESULTS`]. Returns an empty list on any failure.
    async fn find_salons(&self, style_name: &str, lat: f64, lng: f64) -> Vec<Salon>;
}

pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    image_model: String,
    analysis_model: String,
    search_model: String,
}

impl GeminiClient {
    /// Fails fast when the credential is absent; every request made through
    /// the returned client carries the configured timeout.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let api_key = config.gemini_api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(ApiError::Configuration("GEMINI_API_KEY is not set".into()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.gemini_timeout_seconds))
            .build()
            .map_err(|err| {
                ApiError::Configuration(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self {
            http,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            api_key,
            image_model: config.gemini_image_model.clone(),
            analysis_model: config.gemini_analysis_model.clone(),
            search_model: config.gemini_search_model.clone(),
        })
    }

    fn redact_api_key(&self, text: &str) -> String {
        text.replace(&self.api_key, "[redacted]")
    }

    async fn generate_content(&self, model: &str, payload: Value) -> Result<GeminiResponse, String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                format!(
                    "Gemini request failed: {}",
                    self.redact_api_key(&err.to_string())
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = summarize_error_body(&body);
            return Err(format!(
                "Gemini request failed with status {status}: {detail}"
            ));
        }

        response
            .json::<GeminiResponse>()
            .await
            .map_err(|err| format!("Gemini response was not valid JSON: {err}"))
    }
}

#[async_trait]
impl StyleGateway for GeminiClient {
    async fn simulate(&self, current: &Photo, desired: &Photo) -> Option<String> {
        let parts = image_pair_parts(SIMULATION_PROMPT, current, desired);
        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });

        match self.generate_content(&self.image_model, payload).await {
            Ok(response) => {
                let image = first_inline_image(response);
                if image.is_none() {
                    warn!("simulation returned no image part (model: {})", self.image_model);
                }
                image.map(|(mime_type, data)| format!("data:{mime_type};base64,{data}"))
            }
            Err(detail) => {
                warn!("simulation degraded to null: {detail}");
                None
            }
        }
    }

    async fn analyze(&self, current: &Photo, desired: &Photo) -> Result<StyleAdvice, ApiError> {
        let parts = image_pair_parts(ANALYSIS_PROMPT, current, desired);
        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "styleName": { "type": "STRING" },
                        "technique": { "type": "STRING" },
                        "growthGuide": { "type": "STRING" },
                        "stylingTips": { "type": "STRING" },
                    },
                    "required": ["styleName", "technique", "growthGuide", "stylingTips"],
                },
            },
        });

        let response = self
            .generate_content(&self.analysis_model, payload)
            .await
            .map_err(|detail| ApiError::upstream(ANALYSIS_FAILED_MESSAGE, detail))?;

        let text = extract_text(&response);
        if text.trim().is_empty() {
            return Err(ApiError::upstream(
                ANALYSIS_FAILED_MESSAGE,
                "analysis response contained no text part",
            ));
        }

        serde_json::from_str::<StyleAdvice>(&text).map_err(|err| {
            ApiError::upstream(
                ANALYSIS_FAILED_MESSAGE,
                format!("analysis response did not match the advice schema: {err}"),
            )
        })
    }

    async fn find_salons(&self, style_name: &str, lat: f64, lng: f64) -> Vec<Salon> {
        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": salon_query(style_name, lat, lng) }] }],
            "tools": [{ "googleMaps": {} }],
            "toolConfig": {
                "retrievalConfig": {
                    "latLng": { "latitude": lat, "longitude": lng },
                },
            },
        });

        match self.generate_content(&self.search_model, payload).await {
            Ok(response) => {
                let chunks = response
                    .candidates
                    .unwrap_or_default()
                    .into_iter()
                    .next()
                    .and_then(|candidate| candidate.grounding_metadata)
                    .map(|metadata| metadata.grounding_chunks)
                    .unwrap_or_default();
                salons_from_chunks(chunks)
            }
            Err(detail) => {
                warn!("salon search degraded to empty list: {detail}");
                Vec::new()
            }
        }
    }
}

fn salon_query(style_name: &str, lat: f64, lng: f64) -> String {
    format!(
        "현재 위치(위도:{lat}, 경도:{lng})에서 5km 반경 내에 있는 미용실 중, '{style_name}' 스타일 시술 경험이 있거나 평점이 4.0 이상인 곳을 5곳 추천해주세요.\n\
**중요**: 사용자가 지도 앱에서 바로 찾을 수 있도록 정확한 '상호명(Place Name)'을 찾아주세요. 프랜차이즈인 경우 지점명까지 정확히 포함해야 합니다."
    )
}

fn image_pair_parts(prompt: &str, current: &Photo, desired: &Photo) -> Vec<Value> {
    let mut parts = vec![json!({ "text": prompt })];
    for photo in [current, desired] {
        parts.push(json!({
            "inlineData": {
                "mimeType": photo.mime_type,
                "data": general_purpose::STANDARD.encode(&photo.bytes),
            }
        }));
    }
    parts
}

/// Maps grounding chunks to salons, keeping the first occurrence of each
/// name and at most [`MAX_SALON_RESULTS`] entries.
fn salons_from_chunks(chunks: Vec<GroundingChunk>) -> Vec<Salon> {
    let mut salons: Vec<Salon> = Vec::new();
    for chunk in chunks {
        let Some(maps) = chunk.maps else { continue };
        let Some(name) = maps.title.filter(|title| !title.trim().is_empty()) else {
            continue;
        };
        if salons.iter().any(|salon| salon.name == name) {
            continue;
        }
        salons.push(Salon {
            name,
            address: Some(SALON_ADDRESS_PLACEHOLDER.to_string()),
            url: maps.uri,
        });
        if salons.len() == MAX_SALON_RESULTS {
            break;
        }
    }
    salons
}

fn extract_text(response: &GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    for candidate in response.candidates.as_deref().unwrap_or_default() {
        if let Some(content) = &candidate.content {
            for part in content.parts.as_deref().unwrap_or_default() {
                if let GeminiPart::Text { text } = part {
                    if !text.trim().is_empty() {
                        text_parts.push(text.clone());
                    }
                }
            }
        }
    }
    text_parts.join("\n")
}

fn first_inline_image(response: GeminiResponse) -> Option<(String, String)> {
    for candidate in response.candidates.unwrap_or_default() {
        let Some(content) = candidate.content else { continue };
        for part in content.parts.unwrap_or_default() {
            if let GeminiPart::InlineData { inline_data } = part {
                if inline_data.mime_type.starts_with("image/") {
                    return Some((inline_data.mime_type, inline_data.data));
                }
            }
        }
    }
    None
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = value.pointer("/error/message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        debug!("unstructured Gemini error body");
        return truncate_for_log(&value.to_string(), 2000);
    }

    truncate_for_log(trimmed, 2000)
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    maps: Option<MapsChunk>,
}

#[derive(Debug, Deserialize)]
struct MapsChunk {
    title: Option<String>,
    uri: Option<String>,
}
