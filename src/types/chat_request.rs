use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, Model};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Body of a `chat/completions` request.
///
/// Unset optional parameters are left out of the JSON so the server applies
/// its own defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// The model that generates the response.
    pub model: Model,

    /// The conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,

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

    /// Sequences that end generation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    /// Maximum number of tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Penalty for tokens already present in the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Penalty proportional to how often a token already appeared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
}

impl ChatRequest {
    /// Create a new non-streaming request with only the required fields.
    pub fn new(model: impl Into<Model>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            top_p: None,
            n: None,
            stream: false,
            stop: Vec::new(),
            max_tokens: None,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }

    /// Create a new streaming request with only the required fields.
    pub fn new_streaming(model: impl Into<Model>, messages: Vec<ChatMessage>) -> Self {
        Self::new(model, messages).with_stream(true)
    }

    /// Sets whether the response is streamed.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the top-p value.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Sets the number of choices.
    pub fn with_n(mut self, n: u32) -> Self {
        self.n = Some(n);
        self
    }

    /// Adds a stop sequence; duplicates are ignored.
    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        let stop = stop.into();
        if !self.stop.contains(&stop) {
            self.stop.push(stop);
        }
        self
    }

    /// Sets the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the presence penalty.
    pub fn with_presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    /// Sets the frequency penalty.
    pub fn with_frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }
}
