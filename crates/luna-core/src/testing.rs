//! In-memory completion backend for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ai::{CompletionBackend, CompletionRequest};
use crate::error::RequestError;

/// Answers requests from a fixed script and records what it was sent
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, RequestError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    never_answer: bool,
    panic: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: RequestError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    /// Every request stays in flight forever
    pub fn pending(mut self) -> Self {
        self.never_answer = true;
        self
    }

    /// Every request panics inside the backend
    pub fn panics(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, RequestError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.panic {
            panic!("backend blew up");
        }
        if self.never_answer {
            std::future::pending::<()>().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(RequestError::remote("script exhausted")))
    }
}
