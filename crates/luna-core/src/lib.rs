pub mod ai;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod retrieval;
pub mod session;
pub mod state;
pub mod transcript;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use ai::{AzureOpenAIClient, CompletionBackend, CompletionRequest};
pub use config::{ClientSettings, Config, Settings};
pub use conversation::Conversation;
pub use dispatcher::{DispatchEvent, Dispatcher, RequestId, Submission};
pub use error::{ClientError, ConfigError, ConversationError, RequestError, RequestErrorKind};
pub use retrieval::{QueryType, RetrievalConfig};
pub use session::{ChatSession, RequestState, Status};
pub use state::{ChatMessage, ChatRole};
pub use transcript::Transcript;
