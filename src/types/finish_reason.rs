use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reasons why the model stopped generating a choice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model reached a natural stopping point or a stop sequence
    Stop,

    /// The response reached the maximum token limit for the request
    Length,

    /// Content was omitted by the provider's content filter
    ContentFilter,

    /// The model called a tool
    ToolCalls,

    /// The model called a function (legacy)
    FunctionCall,

    /// A reason this client does not know about
    #[serde(other)]
    Unknown,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "stop"),
            FinishReason::Length => write!(f, "length"),
            FinishReason::ContentFilter => write!(f, "content_filter"),
            FinishReason::ToolCalls => write!(f, "tool_calls"),
            FinishReason::FunctionCall => write!(f, "function_call"),
            FinishReason::Unknown => write!(f, "unknown"),
        }
    }
}

/// Error returned when parsing an invalid finish reason string.
#[derive(Debug)]
pub struct FinishReasonParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for FinishReasonParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown finish reason: {}", self.invalid_value)
    }
}

impl std::error::Error for FinishReasonParseError {}

impl FromStr for FinishReason {
    type Err = FinishReasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(FinishReason::Stop),
            "length" => Ok(FinishReason::Length),
            "content_filter" => Ok(FinishReason::ContentFilter),
            "tool_calls" => Ok(FinishReason::ToolCalls),
            "function_call" => Ok(FinishReason::FunctionCall),
            _ => Err(FinishReasonParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}
