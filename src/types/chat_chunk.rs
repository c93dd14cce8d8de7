use serde::{Deserialize, Serialize};

/// Error object the service may embed in a stream chunk or error body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorObject {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Provider error code; numeric or string depending on the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,

    /// Error type, when the provider reports one.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ErrorObject {
    /// The code rendered as a string, if present.
    pub fn code_string(&self) -> Option<String> {
        match &self.code {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// The code as an HTTP-like status, if it is numeric.
    pub fn status(&self) -> Option<u16> {
        self.code
            .as_ref()
            .and_then(|code| code.as_u64())
            .and_then(|code| u16::try_from(code).ok())
    }
}

/// The incremental part of a streamed choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkDelta {
    /// Role, sent on the first chunk only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The text fragment; absent or empty on bookkeeping chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One streamed choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkChoice {
    /// Index of the choice.
    #[serde(default)]
    pub index: u32,

    /// The delta carried by this chunk.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Why generation stopped, on the last chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// One server-sent chunk of a streamed chat completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatCompletionChunk {
    /// Completion id.
    #[serde(default)]
    pub id: String,

    /// Model that produced the chunk.
    #[serde(default)]
    pub model: String,

    /// The choices; the first carries the reply.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// Set when the provider fails mid-stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl ChatCompletionChunk {
    /// The non-empty text fragment of the first choice, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}
