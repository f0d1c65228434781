use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::{GenerationRequest, GenerativeModel, ModelInfo, TextStream};
use crate::config::GeminiConfig;
use crate::error::{Error, Result};

/// Google Gemini `streamGenerateContent` backend (SSE mode).
pub struct GeminiModel {
    client: Client,
    /// Base URL, e.g. "https://generativelanguage.googleapis.com"
    pub api_base: String,
    api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Inline { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Finish reasons that mean the answer was cut off by the service.
const ABORT_REASONS: &[&str] = &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

impl GeminiModel {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::TranslationRequest(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: "Gemini",
            model: self.model.clone(),
        }
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn stream_generate(&self, request: GenerationRequest) -> Result<TextStream> {
        let Some(ref key) = self.api_key else {
            return Err(Error::MissingApiKey);
        };

        let body = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: &request.media_type,
                            data: &request.data_base64,
                        },
                    },
                    Part::Text {
                        text: &request.prompt,
                    },
                ],
            }],
        };

        let url = self.endpoint();
        debug!("Opening generation stream at {} ({} payload bytes)", url, request.data_base64.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Request failed: {}", e);
                Error::TranslationRequest(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("API error: {} - {}", status, text);
            let body = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or(text);
            return Err(Error::TranslationApi {
                status: status.as_u16(),
                body,
            });
        }

        let fragments = response.bytes_stream().eventsource().filter_map(|event| async move {
            match event {
                Ok(event) => parse_chunk(&event.data).transpose(),
                Err(e) => Some(Err(Error::TranslationStream(e.to_string()))),
            }
        });

        Ok(Box::pin(fragments))
    }
}

/// Extract the text of one SSE `data:` payload.
///
/// `Ok(None)` for chunks without text (e.g. a trailing usage report).
fn parse_chunk(data: &str) -> Result<Option<String>> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| Error::TranslationStream(format!("Malformed stream chunk: {e}")))?;

    if let Some(err) = chunk.error {
        return Err(Error::TranslationStream(err.message));
    }
    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::TranslationStream(format!("Request blocked: {reason}")));
    }

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(None);
    };

    if let Some(reason) = candidate.finish_reason.as_deref()
        && ABORT_REASONS.contains(&reason)
    {
        return Err(Error::TranslationStream(format!("Generation stopped: {reason}")));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_chunk() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"<p>"},{"text":"Hi"}],"role":"model"}}]}"#;
        assert_eq!(parse_chunk(data).unwrap().as_deref(), Some("<p>Hi"));
    }

    #[test]
    fn test_parse_empty_and_usage_chunks() {
        assert!(parse_chunk("").unwrap().is_none());
        let usage = r#"{"candidates":[{"content":{"parts":[{"text":""}]},"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":10}}"#;
        assert!(parse_chunk(usage).unwrap().is_none());
    }

    #[test]
    fn test_parse_error_chunk() {
        let data = r#"{"error":{"code":500,"message":"Internal error","status":"INTERNAL"}}"#;
        let err = parse_chunk(data).unwrap_err();
        assert_eq!(err.to_string(), "Internal error");
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let data = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(parse_chunk(data).unwrap_err().to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_safety_stop() {
        let data = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert!(parse_chunk(data).is_err());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_chunk("{not json"),
            Err(Error::TranslationStream(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "application/pdf",
                            data: "QUJD",
                        },
                    },
                    Part::Text { text: "translate" },
                ],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["inline_data"]["mime_type"], "application/pdf");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "translate");
    }

    #[test]
    fn test_endpoint() {
        let model = GeminiModel::new(&GeminiConfig::new(
            "http://localhost:9/",
            Some("k".to_string()),
            "gemini-test",
        ))
        .unwrap();
        assert_eq!(
            model.endpoint(),
            "http://localhost:9/v1beta/models/gemini-test:streamGenerateContent?alt=sse"
        );
        assert!(model.is_configured());
    }
}
