//! Conversation session state machine.
//!
//! One `ChatSession` exists per front-end instance. User actions and relay
//! events are applied sequentially from a single event queue, so the session
//! needs no internal locking. The async streaming read is driven by the
//! caller; the session only records its outcomes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::chat::{Message, Role};
use crate::ollama::ModelInfo;

/// Content used for a user message sent with images but a blank draft.
pub const DEFAULT_IMAGE_PROMPT: &str = "What do you see in this image?";

const IMAGE_FILE_ERROR: &str = "Please select only image files";

#[derive(Default)]
pub struct ChatSession {
    /// Ordered conversation. Append-only, except that the trailing assistant
    /// placeholder is removed when its send fails.
    pub messages: Vec<Message>,
    /// Draft input text.
    pub input: String,
    /// Images staged for the next send, as data-URL base64 strings.
    pub pending_images: Vec<String>,
    pub models: Vec<ModelInfo>,
    pub selected_model: String,
    /// True iff a relay request is outstanding.
    pub loading: bool,
    /// User-visible error; empty means no error.
    pub error: String,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the registry result. The first model becomes the default
    /// selection when nothing is selected yet.
    pub fn set_models(&mut self, models: Vec<ModelInfo>) {
        if self.selected_model.is_empty() {
            if let Some(first) = models.first() {
                self.selected_model = first.name.clone();
            }
        }
        self.models = models;
    }

    pub fn select_model(&mut self, name: impl Into<String>) {
        self.selected_model = name.into();
    }

    /// Reset the conversation. The model list and selection survive.
    pub fn new_chat(&mut self) {
        self.messages.clear();
        self.input.clear();
        self.pending_images.clear();
        self.error.clear();
    }

    /// Stage an image for the next send. Non-image content types are
    /// rejected with an error and no other state change.
    pub fn add_image(&mut self, content_type: &str, data: &[u8]) {
        if !content_type.starts_with("image/") {
            self.error = IMAGE_FILE_ERROR.to_string();
            return;
        }
        let payload = STANDARD.encode(data);
        self.pending_images
            .push(format!("data:{};base64,{}", content_type, payload));
    }

    /// Remove the staged image at `index`. Out of range is a no-op.
    pub fn remove_image(&mut self, index: usize) {
        if index < self.pending_images.len() {
            self.pending_images.remove(index);
        }
    }

    /// Begin a send. Returns the conversation to hand to the relay — the new
    /// user message included, the assistant placeholder excluded — or `None`
    /// when there is nothing to send: blank draft with no staged images, no
    /// model selected, or a send already outstanding.
    pub fn begin_send(&mut self) -> Option<Vec<Message>> {
        if self.loading || self.selected_model.is_empty() {
            return None;
        }
        if self.input.trim().is_empty() && self.pending_images.is_empty() {
            return None;
        }

        let content = if self.input.trim().is_empty() {
            DEFAULT_IMAGE_PROMPT.to_string()
        } else {
            self.input.clone()
        };
        let images = if self.pending_images.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending_images))
        };

        self.messages.push(Message::user(content, images));
        self.input.clear();
        self.error.clear();
        self.loading = true;

        let outgoing = self.messages.clone();
        self.messages.push(Message::assistant(""));
        Some(outgoing)
    }

    /// Apply one streamed delta: the placeholder content always equals the
    /// concatenation of every delta received so far.
    pub fn apply_delta(&mut self, delta: &str) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Assistant {
                last.content.push_str(delta);
            }
        }
    }

    /// The stream completed normally.
    pub fn finish_send(&mut self) {
        self.loading = false;
    }

    /// The send failed. The assistant placeholder is removed — partial
    /// output is discarded — while the user's message stays.
    pub fn fail_send(&mut self, message: impl Into<String>) {
        if self.messages.last().map(|m| m.role) == Some(Role::Assistant) {
            self.messages.pop();
        }
        self.error = message.into();
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llama3() -> ModelInfo {
        ModelInfo {
            name: "llama3".to_string(),
            size: 100,
            modified_at: "t".to_string(),
        }
    }

    fn session_with_model() -> ChatSession {
        let mut session = ChatSession::new();
        session.set_models(vec![llama3()]);
        session
    }

    #[test]
    fn test_first_model_becomes_default_selection() {
        let session = session_with_model();
        assert_eq!(session.selected_model, "llama3");
    }

    #[test]
    fn test_set_models_keeps_existing_selection() {
        let mut session = ChatSession::new();
        session.select_model("gemma3");
        session.set_models(vec![llama3()]);
        assert_eq!(session.selected_model, "gemma3");
    }

    #[test]
    fn test_send_is_noop_with_blank_draft_and_no_images() {
        let mut session = session_with_model();
        session.input = "   ".to_string();
        assert!(session.begin_send().is_none());
        assert!(session.messages.is_empty());
        assert!(!session.loading);
    }

    #[test]
    fn test_send_is_noop_without_model() {
        let mut session = ChatSession::new();
        session.input = "hello".to_string();
        assert!(session.begin_send().is_none());
    }

    #[test]
    fn test_send_is_refused_while_loading() {
        let mut session = session_with_model();
        session.input = "hello".to_string();
        assert!(session.begin_send().is_some());
        session.input = "again".to_string();
        assert!(session.begin_send().is_none());
    }

    #[test]
    fn test_send_appends_user_message_and_placeholder() {
        let mut session = session_with_model();
        session.input = "hello".to_string();
        session.error = "stale".to_string();

        let outgoing = session.begin_send().unwrap();

        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0], Message::user("hello", None));
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1], Message::assistant(""));
        assert!(session.input.is_empty());
        assert!(session.error.is_empty());
        assert!(session.loading);
    }

    #[test]
    fn test_blank_draft_with_image_uses_default_prompt() {
        let mut session = session_with_model();
        session.add_image("image/jpeg", b"fakejpeg");
        let staged = session.pending_images[0].clone();

        let outgoing = session.begin_send().unwrap();

        assert_eq!(outgoing[0].content, DEFAULT_IMAGE_PROMPT);
        assert_eq!(outgoing[0].images, Some(vec![staged]));
        assert!(session.pending_images.is_empty());
    }

    #[test]
    fn test_outgoing_excludes_placeholder() {
        let mut session = session_with_model();
        session.input = "first".to_string();
        let outgoing = session.begin_send().unwrap();
        assert!(outgoing.iter().all(|m| m.role == Role::User));
    }

    #[test]
    fn test_deltas_accumulate_into_placeholder() {
        let mut session = session_with_model();
        session.input = "hello".to_string();
        session.begin_send().unwrap();

        session.apply_delta("Hi");
        session.apply_delta(" there");
        session.finish_send();

        assert_eq!(session.messages[1].content, "Hi there");
        assert!(!session.loading);
    }

    #[test]
    fn test_failed_send_keeps_user_message_only() {
        let mut session = session_with_model();
        session.input = "hello".to_string();
        let before = session.messages.len();
        session.begin_send().unwrap();

        session.fail_send("failed to connect to Ollama: refused");

        assert_eq!(session.messages.len(), before + 1);
        assert_eq!(session.messages.last().unwrap().role, Role::User);
        assert!(!session.loading);
        assert!(!session.error.is_empty());
    }

    #[test]
    fn test_failed_send_discards_partial_output() {
        let mut session = session_with_model();
        session.input = "hello".to_string();
        session.begin_send().unwrap();

        session.apply_delta("Hi th");
        session.fail_send("stream interrupted: reset");

        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, Role::User);
    }

    #[test]
    fn test_add_image_rejects_non_image_files() {
        let mut session = session_with_model();
        session.add_image("application/pdf", b"%PDF");
        assert!(session.pending_images.is_empty());
        assert_eq!(session.error, IMAGE_FILE_ERROR);
    }

    #[test]
    fn test_add_image_builds_data_url() {
        let mut session = session_with_model();
        session.add_image("image/png", b"pngdata");
        assert_eq!(
            session.pending_images[0],
            format!("data:image/png;base64,{}", STANDARD.encode(b"pngdata"))
        );
    }

    #[test]
    fn test_remove_image_out_of_range_is_noop() {
        let mut session = session_with_model();
        session.remove_image(0);
        assert!(session.pending_images.is_empty());

        session.add_image("image/png", b"a");
        session.remove_image(5);
        assert_eq!(session.pending_images.len(), 1);
    }

    #[test]
    fn test_remove_image_drops_the_indexed_entry() {
        let mut session = session_with_model();
        session.add_image("image/png", b"a");
        session.add_image("image/png", b"b");
        session.remove_image(0);
        assert_eq!(session.pending_images.len(), 1);
        assert!(session.pending_images[0].ends_with(&STANDARD.encode(b"b")));
    }

    #[test]
    fn test_new_chat_resets_everything_but_models() {
        let mut session = session_with_model();
        session.input = "draft".to_string();
        session.add_image("image/png", b"a");
        session.messages.push(Message::user("old", None));
        session.error = "boom".to_string();

        session.new_chat();

        assert!(session.messages.is_empty());
        assert!(session.input.is_empty());
        assert!(session.pending_images.is_empty());
        assert!(session.error.is_empty());
        assert_eq!(session.selected_model, "llama3");
        assert_eq!(session.models.len(), 1);
    }
}
