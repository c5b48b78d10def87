//! The single chat session: conversation, transcript and request status.
//!
//! Owned by the entry point and driven from the UI task. Worker tasks only
//! touch the shared [`Conversation`]; everything else changes in [`ChatSession::apply`].

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::ai::CompletionBackend;
use crate::config::Settings;
use crate::conversation::Conversation;
use crate::dispatcher::{DispatchEvent, Dispatcher, Submission};
use crate::retrieval::RetrievalConfig;
use crate::state::ChatRole;
use crate::transcript::Transcript;

/// Per-request lifecycle. `Completed` and `Failed` are reported by
/// [`ChatSession::apply`]; the stored state goes straight back to `Idle`
/// unless another request is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Pending,
    Completed,
    Failed,
}

/// Transient status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Thinking,
    Error,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ready => "",
            Status::Thinking => "Thinking...",
            Status::Error => "Error",
        }
    }
}

pub struct ChatSession {
    dispatcher: Dispatcher,
    transcript: Transcript,
    state: RequestState,
    status: Status,
}

impl ChatSession {
    /// Build a session and the channel its results arrive on
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        model: impl Into<String>,
        retrieval: RetrievalConfig,
        system_prompt: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conversation = Conversation::new(system_prompt);
        let dispatcher = Dispatcher::new(backend, conversation, model, retrieval, tx);

        let session = Self {
            dispatcher,
            transcript: Transcript::new(),
            state: RequestState::Idle,
            status: Status::Ready,
        };
        (session, rx)
    }

    pub fn from_settings(
        backend: Arc<dyn CompletionBackend>,
        settings: &Settings,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        Self::new(
            backend,
            settings.chat_model.clone(),
            settings.retrieval.clone(),
            settings.system_prompt.clone(),
        )
    }

    pub fn submit(&mut self, input: &str) -> Submission {
        let submission = self.dispatcher.submit(input);
        if let Submission::Dispatched { text, .. } = &submission {
            self.transcript.push(ChatRole::User, text.clone());
            self.state = RequestState::Pending;
            self.status = Status::Thinking;
        }
        submission
    }

    /// Fold a finished request into the transcript and status line
    pub fn apply(&mut self, event: DispatchEvent) -> RequestState {
        let outcome = match event {
            DispatchEvent::Completed { reply, .. } => {
                self.transcript.push(ChatRole::Assistant, reply);
                self.status = Status::Ready;
                RequestState::Completed
            }
            DispatchEvent::Failed { error, .. } => {
                self.transcript
                    .push(ChatRole::Error, format!("Something went wrong: {}", error));
                self.status = Status::Error;
                RequestState::Failed
            }
        };

        if self.dispatcher.in_flight() > 0 {
            self.state = RequestState::Pending;
            self.status = Status::Thinking;
        } else {
            self.state = RequestState::Idle;
        }
        outcome
    }

    pub fn is_pending(&self) -> bool {
        self.state == RequestState::Pending
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn conversation(&self) -> &Conversation {
        self.dispatcher.conversation()
    }

    pub fn model(&self) -> &str {
        self.dispatcher.model()
    }

    pub fn retrieval(&self) -> &RetrievalConfig {
        self.dispatcher.retrieval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::state::ChatMessage;
    use crate::testing::ScriptedBackend;

    fn session(backend: Arc<ScriptedBackend>) -> (ChatSession, mpsc::UnboundedReceiver<DispatchEvent>) {
        let retrieval = RetrievalConfig::new("https://search", "travel", "key", "ada");
        ChatSession::new(backend, "gpt-4o", retrieval, "You are Luna.")
    }

    async fn exchange(
        session: &mut ChatSession,
        rx: &mut mpsc::UnboundedReceiver<DispatchEvent>,
        text: &str,
    ) -> RequestState {
        session.submit(text);
        let event = rx.recv().await.unwrap();
        session.apply(event)
    }

    #[tokio::test]
    async fn test_capital_of_france() {
        let backend = Arc::new(ScriptedBackend::new().reply("Paris."));
        let (mut session, mut rx) = session(backend);

        let outcome = exchange(&mut session, &mut rx, "What is the capital of France?").await;

        assert_eq!(outcome, RequestState::Completed);
        assert_eq!(
            session.transcript().entries(),
            &[
                ChatMessage::user("What is the capital of France?"),
                ChatMessage::assistant("Paris."),
            ]
        );
        assert_eq!(session.conversation().len(), 3);
        assert_eq!(session.state(), RequestState::Idle);
        assert_eq!(session.status(), Status::Ready);
    }

    #[tokio::test]
    async fn test_n_turns_give_one_plus_two_n_messages() {
        let mut backend = ScriptedBackend::new();
        for i in 0..5 {
            backend = backend.reply(&format!("answer {}", i));
        }
        let (mut session, mut rx) = session(Arc::new(backend));

        for i in 0..5 {
            exchange(&mut session, &mut rx, &format!("question {}", i)).await;
        }

        let messages = session.conversation().snapshot();
        assert_eq!(messages.len(), 1 + 2 * 5);
        assert_eq!(messages[0].role, ChatRole::System);
        for i in 0..5 {
            assert_eq!(messages[1 + 2 * i], ChatMessage::user(format!("question {}", i)));
            assert_eq!(messages[2 + 2 * i], ChatMessage::assistant(format!("answer {}", i)));
        }
    }

    #[tokio::test]
    async fn test_whitespace_leaves_everything_unchanged() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut session, _rx) = session(backend.clone());

        assert_eq!(session.submit("  \n "), Submission::Ignored);
        assert!(session.transcript().is_empty());
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(session.state(), RequestState::Idle);
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_quit_is_local() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut session, _rx) = session(backend.clone());

        assert_eq!(session.submit("QuIt"), Submission::Quit);
        assert!(session.transcript().is_empty());
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_shows_error_and_keeps_history() {
        let backend = Arc::new(
            ScriptedBackend::new().fail(RequestError::auth("Azure OpenAI error 401 Unauthorized: Access denied")),
        );
        let (mut session, mut rx) = session(backend);

        let outcome = exchange(&mut session, &mut rx, "Best beaches in Crete?").await;

        assert_eq!(outcome, RequestState::Failed);
        assert_eq!(session.status(), Status::Error);
        assert_eq!(session.state(), RequestState::Idle);

        let errors: Vec<_> = session.transcript().errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].content.starts_with("Something went wrong: "));
        assert!(errors[0].content.contains("401 Unauthorized"));

        let messages = session.conversation().snapshot();
        assert_eq!(
            messages,
            vec![
                ChatMessage::system("You are Luna."),
                ChatMessage::user("Best beaches in Crete?"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_turn_does_not_corrupt_later_requests() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .reply("Try the Alfama district.")
                .fail(RequestError::network("connection reset"))
                .reply("Pastéis de nata."),
        );
        let (mut session, mut rx) = session(backend.clone());

        exchange(&mut session, &mut rx, "Where to stay in Lisbon?").await;
        exchange(&mut session, &mut rx, "And in Porto?").await;
        let outcome = exchange(&mut session, &mut rx, "What should I eat?").await;
        assert_eq!(outcome, RequestState::Completed);
        assert_eq!(session.status(), Status::Ready);

        let last_request = backend.requests().pop().unwrap();
        assert_eq!(
            last_request.messages,
            vec![
                ChatMessage::system("You are Luna."),
                ChatMessage::user("Where to stay in Lisbon?"),
                ChatMessage::assistant("Try the Alfama district."),
                ChatMessage::user("And in Porto?"),
                ChatMessage::user("What should I eat?"),
            ]
        );
        assert!(last_request.messages.iter().all(|m| m.role != ChatRole::Error));

        let roles: Vec<ChatRole> = session.transcript().entries().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::User,
                ChatRole::Error,
                ChatRole::User,
                ChatRole::Assistant,
            ]
        );
    }

    #[tokio::test]
    async fn test_pending_until_result_arrives() {
        let backend = Arc::new(ScriptedBackend::new().reply("Yes."));
        let (mut session, mut rx) = session(backend);

        session.submit("Is Iceland expensive?");
        assert!(session.is_pending());
        assert_eq!(session.status(), Status::Thinking);
        assert_eq!(session.status().label(), "Thinking...");

        let event = rx.recv().await.unwrap();
        session.apply(event);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_overlapping_requests_both_land() {
        let backend = Arc::new(ScriptedBackend::new().reply("one").reply("two"));
        let (mut session, mut rx) = session(backend);

        session.submit("first");
        session.submit("second");

        // Wait for both workers before folding anything in
        let a = rx.recv().await.unwrap();
        let b = rx.recv().await.unwrap();

        session.apply(a);
        assert_eq!(session.state(), RequestState::Idle);
        session.apply(b);
        assert_eq!(session.state(), RequestState::Idle);
        assert_eq!(session.conversation().len(), 5);
        assert_eq!(session.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_crashed_request_leaves_session_usable() {
        let backend = Arc::new(ScriptedBackend::new().panics());
        let (mut session, mut rx) = session(backend);

        let outcome = exchange(&mut session, &mut rx, "Hello?").await;

        assert_eq!(outcome, RequestState::Failed);
        assert!(!session.is_pending());
        assert_eq!(session.status(), Status::Error);
        assert_eq!(session.transcript().errors().count(), 1);
    }
}
