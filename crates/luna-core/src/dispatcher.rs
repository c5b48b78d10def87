//! Request dispatch
//!
//! Each accepted submission appends the user turn synchronously, then runs
//! the completion call on its own tokio task. Results come back to the UI as
//! [`DispatchEvent`]s over an unbounded channel. There is no cancellation and
//! no queueing: two quick submissions produce two tasks racing to append.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::ai::{CompletionBackend, CompletionRequest};
use crate::conversation::Conversation;
use crate::error::RequestError;
use crate::retrieval::RetrievalConfig;
use crate::state::ChatMessage;

pub type RequestId = u64;

/// What `submit` did with a piece of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input, nothing happened
    Ignored,
    /// The local `quit` command
    Quit,
    /// A request is now in flight
    Dispatched { id: RequestId, text: String },
}

/// Result of a finished request, delivered to the UI task
#[derive(Debug)]
pub enum DispatchEvent {
    Completed { id: RequestId, reply: String },
    Failed { id: RequestId, error: RequestError },
}

impl DispatchEvent {
    pub fn id(&self) -> RequestId {
        match self {
            DispatchEvent::Completed { id, .. } | DispatchEvent::Failed { id, .. } => *id,
        }
    }
}

/// Holds one slot of the in-flight count for a spawned request. Dropping it
/// without `finish` (the task panicked or was torn down) still releases the
/// slot and reports the request as failed, so the session never stays pending.
struct InFlight {
    id: RequestId,
    counter: Arc<AtomicUsize>,
    events: mpsc::UnboundedSender<DispatchEvent>,
    settled: bool,
}

impl InFlight {
    fn finish(mut self, event: DispatchEvent) {
        self.settled = true;
        self.release(event);
    }

    fn release(&self, event: DispatchEvent) {
        // Decrement before sending so the receiver sees an up to date count
        self.counter.fetch_sub(1, Ordering::SeqCst);
        if self.events.send(event).is_err() {
            tracing::debug!(request = self.id, "receiver closed, dropping result");
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.settled {
            tracing::error!(request = self.id, "request task ended without a result");
            self.release(DispatchEvent::Failed {
                id: self.id,
                error: RequestError::aborted("request ended unexpectedly"),
            });
        }
    }
}

pub struct Dispatcher {
    backend: Arc<dyn CompletionBackend>,
    conversation: Conversation,
    retrieval: Arc<RetrievalConfig>,
    model: String,
    events: mpsc::UnboundedSender<DispatchEvent>,
    next_id: RequestId,
    in_flight: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        conversation: Conversation,
        model: impl Into<String>,
        retrieval: RetrievalConfig,
        events: mpsc::UnboundedSender<DispatchEvent>,
    ) -> Self {
        Self {
            backend,
            conversation,
            retrieval: Arc::new(retrieval),
            model: model.into(),
            events,
            next_id: 1,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle one line of user input. Must be called from within a tokio
    /// runtime, since accepted input spawns a task.
    pub fn submit(&mut self, input: &str) -> Submission {
        let text = input.trim();
        if text.is_empty() {
            return Submission::Ignored;
        }
        if text.eq_ignore_ascii_case("quit") {
            return Submission::Quit;
        }

        if let Err(e) = self.conversation.append(ChatMessage::user(text)) {
            tracing::warn!(error = %e, "user message rejected");
            return Submission::Ignored;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        tracing::info!(request = id, chars = text.chars().count(), "dispatching question");

        let backend = Arc::clone(&self.backend);
        let conversation = self.conversation.clone();
        let retrieval = Arc::clone(&self.retrieval);
        let model = self.model.clone();

        let guard = InFlight {
            id,
            counter: Arc::clone(&self.in_flight),
            events: self.events.clone(),
            settled: false,
        };

        tokio::spawn(async move {
            let request = CompletionRequest::new(&model, conversation.snapshot(), &retrieval);

            let event = match backend.complete(&request).await {
                Ok(reply) => {
                    if let Err(e) = conversation.append(ChatMessage::assistant(reply.clone())) {
                        tracing::warn!(request = id, error = %e, "assistant reply rejected");
                    }
                    tracing::info!(request = id, chars = reply.chars().count(), "request completed");
                    DispatchEvent::Completed { id, reply }
                }
                Err(error) => {
                    tracing::warn!(request = id, kind = ?error.kind, error = %error, "request failed");
                    DispatchEvent::Failed { id, error }
                }
            };

            guard.finish(event);
        });

        Submission::Dispatched {
            id,
            text: text.to_string(),
        }
    }

    /// Requests dispatched but not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retrieval(&self) -> &RetrievalConfig {
        &self.retrieval
    }
}
