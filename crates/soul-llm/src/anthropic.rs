//! Anthropic Claude provider: SSE streaming at the raw layer, buffered
//! classify/compare/generate at the [`SoulLlm`] layer.
//!
//! The SSE parser below is adapted line-for-line from the teacher's
//! `agenticlaw-llm::anthropic::parse_sse_stream`, trimmed of the tool-call
//! branches this crate never drives.

use crate::provider::{
    BestOfNOutcome, CompareOutcome, LlmError, LlmResult, LlmStream, RawLlmProvider, SoulLlm,
    ERROR_SENTINEL,
};
use crate::types::{LlmMessage, LlmRequest, StreamDelta, Usage};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait::async_trait]
impl RawLlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete_stream(&self, mut request: LlmRequest) -> LlmResult<LlmStream> {
        if request.model.is_empty() {
            request.model = self.model.clone();
        }

        let body = AnthropicRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| AnthropicMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: request.max_tokens.unwrap_or(1024),
            temperature: request.temperature,
            stream: true,
            system: request.system.clone(),
        };

        debug!(model = %body.model, "anthropic request");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, body = %error_text, "anthropic error");

            return Err(if status.as_u16() == 401 {
                LlmError::AuthFailed(error_text)
            } else if status.as_u16() == 429 {
                LlmError::RateLimited { retry_after_ms: 60_000 }
            } else {
                LlmError::RequestFailed(format!("{status}: {error_text}"))
            });
        }

        let stream = parse_sse_stream(response.bytes_stream());
        Ok(Box::pin(stream))
    }
}

fn parse_sse_stream(
    bytes_stream: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> impl futures::Stream<Item = LlmResult<StreamDelta>> + Send {
    async_stream::stream! {
        let mut buffer = String::new();

        tokio::pin!(bytes_stream);

        while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(LlmError::StreamError(e.to_string()));
                    continue;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(event_end) = buffer.find("\n\n") {
                let event_str = buffer[..event_end].to_string();
                buffer = buffer[event_end + 2..].to_string();

                let mut event_type = String::new();
                let mut event_data = String::new();

                for line in event_str.lines() {
                    if let Some(rest) = line.strip_prefix("event: ") {
                        event_type = rest.to_string();
                    } else if let Some(rest) = line.strip_prefix("data: ") {
                        event_data = rest.to_string();
                    }
                }

                if event_data.is_empty() {
                    continue;
                }

                match event_type.as_str() {
                    "content_block_delta" => {
                        if let Ok(data) = serde_json::from_str::<ContentBlockDelta>(&event_data) {
                            if let DeltaType::TextDelta { text } = data.delta {
                                yield Ok(StreamDelta::Text(text));
                            }
                        }
                    }
                    "message_delta" => {
                        if let Ok(data) = serde_json::from_str::<MessageDelta>(&event_data) {
                            if let Some(stop_reason) = data.delta.stop_reason {
                                debug!(%stop_reason, "anthropic message complete");
                            }
                        }
                    }
                    "message_stop" => {
                        yield Ok(StreamDelta::Done {
                            stop_reason: Some("end_turn".to_string()),
                            usage: None,
                        });
                    }
                    "error" => {
                        if let Ok(data) = serde_json::from_str::<ErrorEvent>(&event_data) {
                            yield Err(LlmError::StreamError(data.error.message));
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ContentBlockDelta {
    delta: DeltaType,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum DeltaType {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "thinking_delta")]
    #[allow(dead_code)]
    ThinkingDelta { thinking: String },
    #[serde(rename = "input_json_delta")]
    #[allow(dead_code)]
    InputJsonDelta { partial_json: String },
}

#[derive(Deserialize)]
struct MessageDelta {
    delta: MessageDeltaContent,
    #[allow(dead_code)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct MessageDeltaContent {
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEvent {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[allow(dead_code)]
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Buffers a [`RawLlmProvider`] stream to a single string, applying the
/// per-call timeout (spec §5) and rejecting sentinel-smuggled errors
/// (spec §6/§9).
pub struct AnthropicSoulLlm<P: RawLlmProvider> {
    provider: P,
    timeout: Duration,
}

impl<P: RawLlmProvider> AnthropicSoulLlm<P> {
    pub fn new(provider: P, timeout_ms: u64) -> Self {
        Self {
            provider,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn buffered_completion(&self, system: &str, prompt: &str) -> LlmResult<String> {
        let request = LlmRequest::single_turn(system, prompt);
        let completion = tokio::time::timeout(self.timeout, self.run_stream(request)).await;

        match completion {
            Ok(result) => result,
            Err(_) => Err(LlmError::RequestFailed(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn run_stream(&self, request: LlmRequest) -> LlmResult<String> {
        let mut stream = self.provider.complete_stream(request).await?;
        let mut text = String::new();

        while let Some(delta) = stream.next().await {
            match delta? {
                StreamDelta::Text(chunk) => text.push_str(&chunk),
                StreamDelta::Done { .. } => break,
                StreamDelta::Error(message) => return Err(LlmError::StreamError(message)),
            }
        }

        if text.trim_start().starts_with(ERROR_SENTINEL) {
            return Err(LlmError::InvalidResponse(format!(
                "response smuggled an error sentinel: {text}"
            )));
        }

        Ok(text)
    }
}

/// Extracts the first balanced `{...}` substring, tolerating prose the
/// model wrapped the JSON envelope in.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[derive(Deserialize)]
struct CompareEnvelope {
    equivalent: bool,
    #[serde(default)]
    confidence: f64,
}

#[derive(Deserialize)]
struct BestOfNEnvelope {
    index: i64,
    #[serde(default)]
    confidence: f64,
}

#[async_trait::async_trait]
impl<P: RawLlmProvider> SoulLlm for AnthropicSoulLlm<P> {
    async fn generate(&self, system: &str, prompt: &str) -> LlmResult<String> {
        self.buffered_completion(system, prompt).await
    }

    async fn compare(&self, a: &str, b: &str) -> LlmResult<CompareOutcome> {
        let system = "Respond with exactly one JSON object: {\"equivalent\": <bool>, \"confidence\": <0..1>}. No prose outside the JSON.";
        let prompt = format!("Statement A: {a}\nStatement B: {b}\nDo these express the same underlying value or trait?");
        let text = self.buffered_completion(system, &prompt).await?;

        let Some(json) = extract_json_object(&text) else {
            return Ok(CompareOutcome {
                equivalent: false,
                confidence: 0.0,
            });
        };

        match serde_json::from_str::<CompareEnvelope>(json) {
            Ok(envelope) => Ok(CompareOutcome {
                equivalent: envelope.equivalent,
                confidence: envelope.confidence,
            }),
            Err(_) => Ok(CompareOutcome {
                equivalent: false,
                confidence: 0.0,
            }),
        }
    }

    async fn compare_best_of_n(&self, target: &str, candidates: &[&str]) -> LlmResult<BestOfNOutcome> {
        if candidates.is_empty() {
            return Ok(BestOfNOutcome::no_match());
        }

        let listed = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{i}: {c}"))
            .collect::<Vec<_>>()
            .join("\n");

        let system = "Respond with exactly one JSON object: {\"index\": <integer, -1 if none match>, \"confidence\": <0..1>}. No prose outside the JSON.";
        let prompt = format!(
            "Target statement: {target}\nCandidates:\n{listed}\nWhich candidate index expresses the same underlying value as the target, if any?"
        );
        let text = self.buffered_completion(system, &prompt).await?;

        let Some(json) = extract_json_object(&text) else {
            return Ok(BestOfNOutcome::malformed());
        };

        match serde_json::from_str::<BestOfNEnvelope>(json) {
            Ok(envelope) if envelope.index >= 0 && (envelope.index as usize) < candidates.len() => {
                Ok(BestOfNOutcome {
                    index: Some(envelope.index as usize),
                    confidence: envelope.confidence,
                    malformed: false,
                })
            }
            Ok(_) => Ok(BestOfNOutcome::no_match()),
            Err(_) => Ok(BestOfNOutcome::malformed()),
        }
    }
}
