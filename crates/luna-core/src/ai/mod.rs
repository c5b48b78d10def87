pub mod azure;

pub use azure::AzureOpenAIClient;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::RequestError;
use crate::retrieval::{DataSource, RetrievalConfig};
use crate::state::ChatMessage;

/// Body of a retrieval-augmented completion call
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub data_sources: Vec<DataSource>,
}

impl CompletionRequest {
    pub fn new(model: &str, messages: Vec<ChatMessage>, retrieval: &RetrievalConfig) -> Self {
        Self {
            model: model.to_string(),
            messages,
            data_sources: retrieval.data_sources(),
        }
    }
}

/// Anything that can answer a completion request
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, RequestError>;
}
