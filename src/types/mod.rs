// Public modules
pub mod chat_message;
pub mod chat_request;
pub mod chat_response;
pub mod completion;
pub mod edit;
pub mod finish_reason;
pub mod model;
pub mod usage;

// Re-exports
pub use chat_message::{ChatMessage, ChatMessageDelta, Role, RoleParseError};
pub use chat_request::ChatRequest;
pub use chat_response::{ChatChoice, ChatResponse};
pub use completion::{CompletionChoice, CompletionRequest, CompletionResponse};
pub use edit::{EditChoice, EditRequest, EditResponse};
pub use finish_reason::{FinishReason, FinishReasonParseError};
pub use model::{KnownModel, Model};
pub use usage::Usage;
