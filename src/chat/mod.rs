//! Interactive chat on top of the client.
//!
//! This module provides the pieces of the `chatter` REPL:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: conversation history and one request per turn
//! - [`accumulator`]: folding response events into the assistant's reply
//! - [`commands`]: slash command parsing

mod accumulator;
mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use accumulator::ChatAccumulator;
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_SYSTEM_PROMPT};
pub use session::{ChatSession, SessionStats};
