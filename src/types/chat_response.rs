use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{ChatMessage, ChatMessageDelta, FinishReason, Usage};
use crate::utils::time::epoch;

/// One choice of a chat response.
///
/// Streamed chunks fill `delta`; buffered responses fill `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatChoice {
    /// Position of the choice when `n > 1`.
    #[serde(default)]
    pub index: u32,

    /// The fragment carried by a streamed chunk.
    #[serde(default)]
    pub delta: ChatMessageDelta,

    /// The complete message of a buffered response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,

    /// Why generation stopped, on the final chunk or buffered response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl ChatChoice {
    /// The text this choice contributes, whichever mode produced it.
    pub fn text(&self) -> &str {
        if let Some(content) = self.delta.content.as_deref() {
            content
        } else if let Some(message) = &self.message {
            &message.content
        } else {
            ""
        }
    }
}

/// A chat completion: either a whole buffered response or one streamed chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// Identifier shared by every chunk of one completion.
    #[serde(default)]
    pub id: String,

    /// `chat.completion` or `chat.completion.chunk`.
    #[serde(default)]
    pub object: String,

    /// When the completion was created.
    #[serde(with = "crate::utils::time", default = "epoch")]
    pub created: OffsetDateTime,

    /// The model that produced the completion.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,

    /// The generated choices; may be empty on some chunks.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,

    /// Token accounting, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Returns true if this is a streamed chunk rather than a buffered response.
    pub fn is_chunk(&self) -> bool {
        self.object == "chat.completion.chunk"
    }

    /// The first choice, if any.
    pub fn first_choice(&self) -> Option<&ChatChoice> {
        self.choices.iter().find(|c| c.index == 0).or(self.choices.first())
    }

    /// The text of the first choice, or the empty string.
    pub fn text(&self) -> &str {
        self.first_choice().map(ChatChoice::text).unwrap_or("")
    }
}
