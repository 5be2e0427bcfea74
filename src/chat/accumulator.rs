use crate::types::{ChatMessage, ChatResponse, FinishReason, Role, Usage};

/// Folds the events of one turn into a single assistant message.
///
/// Only the first choice is followed.  Streamed chunks contribute their
/// `delta`; a buffered response contributes its whole `message`.
#[derive(Debug, Clone, Default)]
pub struct ChatAccumulator {
    role: Option<Role>,
    content: String,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    events: usize,
    empty_events: usize,
}

impl ChatAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in, returning the text it contributed.
    pub fn push<'a>(&mut self, event: &'a ChatResponse) -> &'a str {
        self.events += 1;
        if let Some(usage) = event.usage {
            self.usage = Some(usage);
        }
        let Some(choice) = event.first_choice() else {
            self.empty_events += 1;
            return "";
        };
        let role = choice
            .delta
            .role
            .or_else(|| choice.message.as_ref().map(|m| m.role));
        if role.is_some() {
            self.role = role;
        }
        if choice.finish_reason.is_some() {
            self.finish_reason = choice.finish_reason;
        }
        let text = choice.text();
        self.content.push_str(text);
        text
    }

    /// The text accumulated so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The last finish reason seen.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.finish_reason.as_ref()
    }

    /// The last usage report seen.
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Number of events folded in.
    pub fn events(&self) -> usize {
        self.events
    }

    /// Number of events that carried no choices.
    pub fn empty_events(&self) -> usize {
        self.empty_events
    }

    /// The accumulated assistant message.
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::new(self.role.unwrap_or(Role::Assistant), self.content)
    }
}
