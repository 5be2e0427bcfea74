// Public modules
pub mod chat;
pub mod chat_stream;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod render;
pub mod sse;
pub mod types;
pub mod utils;

// Re-exports
pub use chat_stream::{ChatStream, EventStream};
pub use client::OpenAi;
pub use client_logger::ClientLogger;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;
