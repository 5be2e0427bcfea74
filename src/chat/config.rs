//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use arrrg_derive::CommandLine;

use crate::types::{KnownModel, Model};

/// System prompt every conversation starts with unless overridden.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Command-line arguments for the chatter tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gpt-3.5-turbo)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: server decides)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Base URL of an OpenAI-compatible API.
    #[arrrg(optional, "API base URL (default: $OPENAI_BASE_URL or api.openai.com)", "URL")]
    pub base_url: Option<String>,

    /// Wait for whole responses instead of streaming them.
    #[arrrg(flag, "Disable streaming responses")]
    pub no_stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// System prompt seeded at the start of every conversation.
    pub system_prompt: Option<String>,

    /// Maximum tokens per response; `None` lets the server decide.
    pub max_tokens: Option<u32>,

    /// Optional sampling temperature.
    pub temperature: Option<f32>,

    /// Optional top-p nucleus sampling value.
    pub top_p: Option<f32>,

    /// Stop sequences supplied on every request.
    pub stop_sequences: Vec<String>,

    /// Whether responses are streamed.
    pub stream: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// API base URL override.
    pub base_url: Option<String>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gpt-3.5-turbo
    /// - System prompt: "You are a helpful assistant."
    /// - Streaming: enabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::Known(KnownModel::Gpt35Turbo),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop_sequences: Vec::new(),
            stream: true,
            use_color: true,
            base_url: None,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt; `None` starts conversations without one.
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the top-p value.
    pub fn with_top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }

    /// Sets the stop sequences.
    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }

    /// Enables or disables streaming.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            model: args.model.map(Model::from).unwrap_or(defaults.model),
            system_prompt: args.system.or(defaults.system_prompt),
            max_tokens: args.max_tokens,
            stream: !args.no_stream,
            use_color: !args.no_color,
            base_url: args.base_url,
            ..ChatConfig::new()
        }
    }
}
