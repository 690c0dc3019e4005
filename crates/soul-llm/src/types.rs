//! Wire types for the buffered LLM request/response shape
//!
//! Adapted from the teacher's `agenticlaw-llm::types` module: same request
//! envelope and streaming-delta shape, trimmed of tool-call plumbing that
//! this crate's text-in/text-out capability never needs.

use serde::{Deserialize, Serialize};

/// A single completion request.
#[derive(Clone, Debug, Serialize)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<LlmMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl Default for LlmRequest {
    fn default() -> Self {
        Self {
            model: "claude-opus-4-6-20250929".to_string(),
            messages: Vec::new(),
            max_tokens: Some(1024),
            temperature: Some(0.0),
            system: None,
        }
    }
}

impl LlmRequest {
    /// Build a single-turn user-message request, the shape every classifier
    /// and generalizer prompt in this workspace uses.
    pub fn single_turn(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            messages: vec![LlmMessage {
                role: "user".to_string(),
                content: user.into(),
            }],
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

/// Streaming delta from a completion call.
#[derive(Clone, Debug)]
pub enum StreamDelta {
    Text(String),
    Done {
        stop_reason: Option<String>,
        usage: Option<Usage>,
    },
    Error(String),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
