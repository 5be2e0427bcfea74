use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{FinishReason, Model, Usage};
use crate::utils::time::epoch;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Body of a legacy `completions` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// The model that completes the prompt.
    pub model: Model,

    /// The text to complete.
    pub prompt: String,

    /// Text that comes after the completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Maximum number of tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling probability mass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Number of choices to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,

    /// Whether the response is delivered as an event stream.
    #[serde(default, skip_serializing_if = "is_false")]
    pub stream: bool,

    /// Number of most likely tokens to return log probabilities for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,

    /// Echo the prompt back in addition to the completion.
    #[serde(default, skip_serializing_if = "is_false")]
    pub echo: bool,

    /// A sequence that ends generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,

    /// Penalty for tokens already present in the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Penalty proportional to how often a token already appeared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    /// Generate this many candidates server-side and return the best.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_of: Option<u32>,
}

impl CompletionRequest {
    /// Create a new request with only the required fields.
    pub fn new(model: impl Into<Model>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            suffix: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            n: None,
            stream: false,
            logprobs: None,
            echo: false,
            stop: None,
            presence_penalty: None,
            frequency_penalty: None,
            best_of: None,
        }
    }

    /// Sets the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Sets the stop sequence.
    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop = Some(stop.into());
        self
    }
}

/// One choice of a completion response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionChoice {
    /// The generated text (a fragment when streamed).
    #[serde(default)]
    pub text: String,

    /// Position of the choice when `n > 1`.
    #[serde(default)]
    pub index: u32,

    /// Log probabilities, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<serde_json::Value>,

    /// Why generation stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Response of a `completions` request, or one chunk of its stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    /// Completion identifier.
    #[serde(default)]
    pub id: String,

    /// Always `text_completion`.
    #[serde(default)]
    pub object: String,

    /// When the completion was created.
    #[serde(with = "crate::utils::time", default = "epoch")]
    pub created: OffsetDateTime,

    /// The model that produced the completion.
    #[serde(default)]
    pub model: String,

    /// The generated choices.
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,

    /// Token accounting, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;
    use serde_json::{json, to_value};

    #[test]
    fn request_serialization() {
        let request = CompletionRequest::new(KnownModel::TextDavinci003, "Say this is a test")
            .with_max_tokens(7)
            .with_temperature(0.0)
            .with_stop("\n");
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "text-davinci-003",
                "prompt": "Say this is a test",
                "max_tokens": 7,
                "temperature": 0.0,
                "stop": "\n"
            })
        );
    }

    #[test]
    fn response_deserialization() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "id": "cmpl-uqkvlQyYK7bGYrRHQ0eXlWi7",
            "object": "text_completion",
            "created": 1589478378,
            "model": "text-davinci-003",
            "choices": [{
                "text": "\n\nThis is indeed a test",
                "index": 0,
                "logprobs": null,
                "finish_reason": "length"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
        }))
        .unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].text, "\n\nThis is indeed a test");
        assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Length));
        assert!(response.choices[0].logprobs.is_none());
        assert_eq!(response.usage, Some(Usage::new(5, 7)));
    }
}
