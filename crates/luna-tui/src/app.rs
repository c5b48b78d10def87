use luna_core::{ChatSession, DispatchEvent, Submission};
use ratatui::layout::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in chars, not bytes

    // Transcript view
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the transcript, set during render
    pub chat_width: u16,  // Inner width, used for wrap estimates
    pub chat_area: Option<Rect>,
    pub send_area: Option<Rect>, // Clickable "Send" label, set during render

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub session: ChatSession,
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            send_area: None,
            animation_frame: 0,
            session,
        }
    }

    /// Send the current input line. While a request is pending the line is
    /// kept and nothing is sent.
    pub fn submit_input(&mut self) {
        if self.session.is_pending() {
            return;
        }

        match self.session.submit(&self.input) {
            Submission::Ignored => {}
            Submission::Quit => self.should_quit = true,
            Submission::Dispatched { .. } => {
                self.input.clear();
                self.cursor = 0;
                self.scroll_to_bottom();
            }
        }
    }

    pub fn on_dispatch(&mut self, event: DispatchEvent) {
        self.session.apply(event);
        self.scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self) {
        if self.chat_scroll < self.max_scroll() {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = (self.visible_height() / 2).max(1);
        self.chat_scroll = (self.chat_scroll + half_page).min(self.max_scroll());
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = (self.visible_height() / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_sub(half_page);
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    /// Scroll so the newest entry (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    fn max_scroll(&self) -> u16 {
        self.transcript_lines().saturating_sub(self.visible_height())
    }

    /// Estimated rendered height of the transcript at the current width
    pub fn transcript_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.session.transcript().entries() {
            total_lines += 1; // Label line ("You:", "Luna:", "Error:")
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                total_lines += char_count / wrap_width + 1;
            }
            total_lines += 1; // Blank line after message
        }

        if self.session.is_pending() {
            total_lines += 2; // "Luna:" + "Thinking..."
        }

        total_lines.min(u16::MAX as usize) as u16
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use luna_core::{CompletionBackend, CompletionRequest, RequestError, RetrievalConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Replies with a fixed answer, or never replies
    pub(crate) struct FixedBackend {
        pub reply: Option<String>,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for FixedBackend {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, RequestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => std::future::pending().await,
            }
        }
    }

    pub(crate) fn app_with(
        reply: Option<&str>,
    ) -> (App, Arc<FixedBackend>, mpsc::UnboundedReceiver<DispatchEvent>) {
        let backend = Arc::new(FixedBackend {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        let retrieval = RetrievalConfig::new("https://search", "travel", "key", "ada");
        let (session, rx) = ChatSession::new(backend.clone(), "gpt-4o", retrieval, "You are Luna.");
        (App::new(session), backend, rx)
    }

    #[tokio::test]
    async fn test_submit_clears_input_and_dispatches() {
        let (mut app, _backend, mut rx) = app_with(Some("Paris."));
        app.input = "What is the capital of France?".to_string();
        app.cursor = app.input.chars().count();

        app.submit_input();
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.session.is_pending());

        let event = rx.recv().await.unwrap();
        app.on_dispatch(event);
        assert!(!app.session.is_pending());
        assert_eq!(app.session.transcript().len(), 2);
        assert_eq!(app.session.conversation().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_input_is_kept_and_ignored() {
        let (mut app, backend, _rx) = app_with(Some("unused"));
        app.input = "   ".to_string();

        app.submit_input();
        assert_eq!(app.input, "   ");
        assert!(app.session.transcript().is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_quit_command_exits() {
        let (mut app, backend, _rx) = app_with(Some("unused"));
        app.input = "Quit".to_string();

        app.submit_input();
        assert!(app.should_quit);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_submit_waits_for_pending_request() {
        let (mut app, _backend, _rx) = app_with(None);
        app.input = "first".to_string();
        app.submit_input();

        app.input = "second".to_string();
        app.submit_input();

        assert_eq!(app.input, "second");
        assert_eq!(app.session.transcript().len(), 1);
        assert_eq!(app.session.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_scroll_follows_long_transcript() {
        let long_reply = "line\n".repeat(40);
        let (mut app, _backend, mut rx) = app_with(Some(&long_reply));
        app.chat_height = 10;
        app.chat_width = 40;

        app.input = "Tell me everything".to_string();
        app.submit_input();
        let event = rx.recv().await.unwrap();
        app.on_dispatch(event);

        let max = app.transcript_lines() - app.chat_height;
        assert_eq!(app.chat_scroll, max);
        app.scroll_down();
        assert_eq!(app.chat_scroll, max);
        app.scroll_to_top();
        app.scroll_up();
        assert_eq!(app.chat_scroll, 0);
    }
}
