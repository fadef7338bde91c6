use std::path::Path;

use charla_core::{ChatSession, OllamaClient};
use ratatui::widgets::ListState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Conversation starters shown while the chat is empty. Pressing the
/// matching number key fills the draft with the prompt.
pub const SUGGESTIONS: [(&str, &str); 4] = [
    ("Explain a concept", "Describe quantum computing in simple terms"),
    ("Help me write", "Draft an email for a job application"),
    ("Brainstorm ideas", "Creative marketing strategies for a startup"),
    ("Debug my code", "Find issues in my Python function"),
];

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,
    pub ollama: OllamaClient,

    // Chat view state
    pub input_cursor: usize, // cursor position in session.input, in chars
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area, set during render
    pub chat_width: u16,  // inner width, for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub model_picker_state: ListState,

    // Attach-image prompt state
    pub show_attach_prompt: bool,
    pub attach_input: String,
    pub attach_cursor: usize,
}

impl App {
    pub fn new(ollama_url: &str) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            session: ChatSession::new(),
            ollama: OllamaClient::new(ollama_url),

            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            show_model_picker: false,
            model_picker_state: ListState::default(),

            show_attach_prompt: false,
            attach_input: String::new(),
            attach_cursor: 0,
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll the chat so the newest content is visible.
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.session.messages {
            total_lines += 1; // Role line ("You:" or "AI:")
            if let Some(images) = &msg.images {
                total_lines += images.len() as u16; // One "[image]" line each
            }
            if msg.content.is_empty() {
                total_lines += 1; // Placeholder or blank content still takes a line
            } else {
                for line in msg.content.lines() {
                    // Use character count, not byte length, for proper UTF-8 handling
                    let char_count = line.chars().count();
                    if char_count == 0 {
                        total_lines += 1;
                    } else {
                        total_lines += ((char_count / wrap_width) + 1) as u16;
                    }
                }
            }
            total_lines += 1; // Blank line after message
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    // Model picker methods
    pub fn model_picker_nav_down(&mut self) {
        let len = self.session.models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn open_model_picker(&mut self) {
        if self.session.models.is_empty() {
            return;
        }
        // Select current model if in list, otherwise first
        let current_idx = self
            .session
            .models
            .iter()
            .position(|m| m.name == self.session.selected_model)
            .unwrap_or(0);
        self.model_picker_state.select(Some(current_idx));
        self.show_model_picker = true;
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.session.models.get(i) {
                let name = model.name.clone();
                self.session.select_model(name);
                self.show_model_picker = false;
            }
        }
    }

    /// Read the file at `path` and stage it as an attachment. The session
    /// rejects anything whose content type isn't `image/*`.
    pub fn attach_image(&mut self, path: &str) {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                self.session.error = format!("Could not read {}: {}", path, err);
                return;
            }
        };
        self.session.add_image(content_type_for_path(path), &data);
    }
}

fn content_type_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for_path("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for_path("/tmp/cat.png"), "image/png");
        assert_eq!(content_type_for_path("notes.txt"), "application/octet-stream");
        assert_eq!(content_type_for_path("no_extension"), "application/octet-stream");
    }

    #[test]
    fn test_attach_missing_file_sets_error() {
        let mut app = App::new("http://localhost:11434");
        app.attach_image("/nonexistent/cat.png");
        assert!(app.session.pending_images.is_empty());
        assert!(app.session.error.starts_with("Could not read"));
    }
}
