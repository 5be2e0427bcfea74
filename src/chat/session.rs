//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which manages conversation
//! state and drives one request per user turn.

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::OpenAi;
use crate::chat::accumulator::ChatAccumulator;
use crate::chat::config::ChatConfig;
use crate::error::{Error, Result};
use crate::render::Renderer;
use crate::types::{ChatMessage, ChatRequest, Model, Role, Usage};

/// A chat session that manages conversation state and API interactions.
///
/// The history always starts with the system prompt, when one is set, and
/// only ever holds completed turns: a turn that fails leaves no trace.
pub struct ChatSession {
    client: OpenAi,
    config: ChatConfig,
    messages: Vec<ChatMessage>,
    usage_totals: Usage,
    last_turn_usage: Option<Usage>,
    request_count: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of messages in the conversation, system prompt included.
    pub message_count: usize,
    /// Whether responses are streamed.
    pub stream: bool,
    /// The response token cap, if set.
    pub max_tokens: Option<u32>,
    /// The sampling temperature, if set.
    pub temperature: Option<f32>,
    /// The top-p value, if set.
    pub top_p: Option<f32>,
    /// The configured stop sequences.
    pub stop_sequences: Vec<String>,
    /// Total number of API requests made.
    pub total_requests: u64,
    /// Token usage summed over every turn that reported it.
    pub total_usage: Usage,
    /// Token usage of the last turn, if reported.
    pub last_turn_usage: Option<Usage>,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_default<T: fmt::Display>(value: Option<T>) -> String {
            value.map_or_else(|| "default".to_string(), |v| v.to_string())
        }

        writeln!(f, "model:        {}", self.model)?;
        writeln!(f, "messages:     {}", self.message_count)?;
        writeln!(f, "streaming:    {}", if self.stream { "on" } else { "off" })?;
        writeln!(f, "max_tokens:   {}", or_default(self.max_tokens))?;
        writeln!(f, "temperature:  {}", or_default(self.temperature))?;
        writeln!(f, "top_p:        {}", or_default(self.top_p))?;
        if !self.stop_sequences.is_empty() {
            writeln!(f, "stop:         {:?}", self.stop_sequences)?;
        }
        writeln!(f, "requests:     {}", self.total_requests)?;
        write!(
            f,
            "tokens:       {} prompt, {} completion, {} total",
            self.total_usage.prompt_tokens,
            self.total_usage.completion_tokens,
            self.total_usage.total_tokens
        )?;
        if let Some(last) = self.last_turn_usage {
            write!(f, "\nlast turn:    {} tokens", last.total_tokens)?;
        }
        Ok(())
    }
}

impl ChatSession {
    /// Creates a new chat session with the given client and configuration.
    pub fn new(client: OpenAi, config: ChatConfig) -> Self {
        let mut session = Self {
            client,
            config,
            messages: Vec::new(),
            usage_totals: Usage::default(),
            last_turn_usage: None,
            request_count: 0,
        };
        session.clear();
        session
    }

    /// Sends a user message and renders the response as it arrives.
    ///
    /// On success the user message and the assistant's reply are appended to
    /// the history and the reply is returned.  On any failure, cancellation
    /// included, the history is left exactly as it was before the call.
    pub async fn send(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let previous_len = self.messages.len();
        self.messages.push(ChatMessage::user(user_input));

        match self.take_turn(renderer, cancel).await {
            Ok(reply) => {
                self.messages.push(reply.clone());
                Ok(reply)
            }
            Err(err) => {
                self.messages.truncate(previous_len);
                Err(err)
            }
        }
    }

    async fn take_turn(
        &mut self,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let turn = cancel.child_token();
        let mut stream = self.client.chat(self.request(), turn.clone());
        self.request_count = self.request_count.saturating_add(1);

        let mut accumulator = ChatAccumulator::new();
        while let Some(event) = stream.next_message().await {
            let text = accumulator.push(&event);
            if accumulator.empty_events() > 0 {
                turn.cancel();
                let _ = stream.finish().await;
                return Err(Error::decode("no choices in response", None));
            }
            renderer.print_text(text);
        }
        stream.finish().await?;
        renderer.finish_response();

        if let Some(usage) = accumulator.usage() {
            self.last_turn_usage = Some(usage);
            self.usage_totals = self.usage_totals + usage;
        } else {
            self.last_turn_usage = None;
        }
        Ok(accumulator.into_message())
    }

    /// The request the next turn would send.
    pub fn request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(self.config.model.clone(), self.messages.clone())
            .with_stream(self.config.stream);
        request.temperature = self.config.temperature;
        request.top_p = self.config.top_p;
        request.max_tokens = self.config.max_tokens;
        request.stop = self.config.stop_sequences.clone();
        request
    }

    /// Clears the conversation history, keeping the system prompt.
    pub fn clear(&mut self) {
        self.messages.clear();
        if let Some(prompt) = &self.config.system_prompt {
            self.messages.push(ChatMessage::system(prompt.clone()));
        }
    }

    /// The conversation so far, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: Model) {
        self.config.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Sets or clears the system prompt, rewriting the head of the history.
    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        let has_system = self
            .messages
            .first()
            .is_some_and(|m| m.role == Role::System);
        match (&prompt, has_system) {
            (Some(prompt), true) => self.messages[0] = ChatMessage::system(prompt.clone()),
            (Some(prompt), false) => self.messages.insert(0, ChatMessage::system(prompt.clone())),
            (None, true) => {
                self.messages.remove(0);
            }
            (None, false) => {}
        }
        self.config.system_prompt = prompt;
    }

    /// Returns the current system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.config.system_prompt.as_deref()
    }

    /// Sets the maximum tokens per response.
    pub fn set_max_tokens(&mut self, max_tokens: Option<u32>) {
        self.config.max_tokens = max_tokens;
    }

    /// Sets the sampling temperature.
    pub fn set_temperature(&mut self, temperature: Option<f32>) {
        self.config.temperature = temperature;
    }

    /// Sets the top-p value.
    pub fn set_top_p(&mut self, top_p: Option<f32>) {
        self.config.top_p = top_p;
    }

    /// Adds a stop sequence to the persistent list.
    pub fn add_stop_sequence(&mut self, sequence: String) {
        if !self.config.stop_sequences.contains(&sequence) {
            self.config.stop_sequences.push(sequence);
        }
    }

    /// Clears all stop sequences.
    pub fn clear_stop_sequences(&mut self) {
        self.config.stop_sequences.clear();
    }

    /// Enables or disables streaming for subsequent turns.
    pub fn set_stream(&mut self, stream: bool) {
        self.config.stream = stream;
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            message_count: self.message_count(),
            stream: self.config.stream,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            stop_sequences: self.config.stop_sequences.clone(),
            total_requests: self.request_count,
            total_usage: self.usage_totals,
            last_turn_usage: self.last_turn_usage,
        }
    }
}
