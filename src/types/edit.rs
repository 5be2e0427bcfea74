use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Model, Usage};
use crate::utils::time::epoch;

/// Body of an `edits` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditRequest {
    /// The edit model, usually `text-davinci-edit-001`.
    pub model: Model,

    /// The text to edit.
    pub input: String,

    /// What to do with the input.
    pub instruction: String,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Number of edits to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
}

impl EditRequest {
    /// Create a new edit request.
    pub fn new(
        model: impl Into<Model>,
        input: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            instruction: instruction.into(),
            temperature: None,
            n: None,
        }
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the number of edits to generate.
    pub fn with_n(mut self, n: u32) -> Self {
        self.n = Some(n);
        self
    }
}

/// One edited text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditChoice {
    /// The edited text.
    #[serde(default)]
    pub text: String,

    /// Position of the choice when `n > 1`.
    #[serde(default)]
    pub index: u32,
}

/// Response of an `edits` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditResponse {
    /// Always `edit`.
    #[serde(default)]
    pub object: String,

    /// When the edit was created.
    #[serde(with = "crate::utils::time", default = "epoch")]
    pub created: OffsetDateTime,

    /// The edited texts.
    #[serde(default)]
    pub choices: Vec<EditChoice>,

    /// Token accounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl EditResponse {
    /// The edited texts in choice order.
    pub fn texts(&self) -> Vec<&str> {
        let mut choices: Vec<&EditChoice> = self.choices.iter().collect();
        choices.sort_by_key(|c| c.index);
        choices.into_iter().map(|c| c.text.as_str()).collect()
    }
}
