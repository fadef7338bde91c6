use charla_core::Message;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{App, InputMode, SUGGESTIONS};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Models(Ok(models)) => {
            app.session.set_models(models);
        }
        AppEvent::Models(Err(_)) => {
            app.session.error =
                "Failed to fetch models. Make sure Ollama is running.".to_string();
        }
        AppEvent::Delta(delta) => {
            app.session.apply_delta(&delta);
            app.scroll_to_bottom();
        }
        AppEvent::StreamDone => {
            app.session.finish_send();
        }
        AppEvent::StreamFailed(message) => {
            app.session.fail_send(message);
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    // Global quit that works in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_model_picker {
        handle_model_picker(app, key);
        return;
    }
    if app.show_attach_prompt {
        handle_attach_prompt(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key, tx),
        InputMode::Editing => handle_editing_mode(app, key, tx),
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_model_picker = false;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.model_picker_nav_down();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.model_picker_nav_up();
        }
        KeyCode::Enter => {
            app.select_model();
        }
        _ => {}
    }
}

fn handle_attach_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_attach_prompt = false;
            app.attach_input.clear();
            app.attach_cursor = 0;
        }
        KeyCode::Enter => {
            if !app.attach_input.is_empty() {
                let path = app.attach_input.clone();
                app.attach_image(&path);
            }
            app.show_attach_prompt = false;
            app.attach_input.clear();
            app.attach_cursor = 0;
        }
        KeyCode::Backspace => {
            if app.attach_cursor > 0 {
                app.attach_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.attach_input, app.attach_cursor);
                app.attach_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.attach_cursor = app.attach_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.attach_input.chars().count();
            app.attach_cursor = (app.attach_cursor + 1).min(char_count);
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.attach_input, app.attach_cursor);
            app.attach_input.insert(byte_pos, c);
            app.attach_cursor += 1;
        }
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Focus the input
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.session.input.chars().count();
        }

        // New chat
        KeyCode::Char('n') => {
            app.session.new_chat();
            app.chat_scroll = 0;
        }

        // Open model picker; retry the fetch when the list never arrived
        KeyCode::Char('M') => {
            if app.session.models.is_empty() {
                let ollama = app.ollama.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(AppEvent::Models(ollama.list_models().await));
                });
            } else {
                app.open_model_picker();
            }
        }

        // Attach an image by path
        KeyCode::Char('a') => {
            app.show_attach_prompt = true;
        }

        // Remove the newest staged image
        KeyCode::Char('x') => {
            let last = app.session.pending_images.len().saturating_sub(1);
            app.session.remove_image(last);
        }

        // Scroll chat
        KeyCode::Char('j') | KeyCode::Down => {
            app.chat_scroll = app.chat_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.chat_scroll = app.chat_scroll.saturating_sub(1);
        }
        KeyCode::Char('g') => {
            app.chat_scroll = 0;
        }
        KeyCode::Char('G') => {
            app.scroll_to_bottom();
        }

        // Suggestion cards (only while the conversation is empty)
        KeyCode::Char(c @ '1'..='4') if app.session.messages.is_empty() => {
            let idx = (c as usize) - ('1' as usize);
            let (_, prompt) = SUGGESTIONS[idx];
            app.session.input = prompt.to_string();
            app.input_cursor = app.session.input.chars().count();
            app.input_mode = InputMode::Editing;
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            start_send(app, tx);
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.session.input, app.input_cursor);
                app.session.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.session.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.session.input, app.input_cursor);
                app.session.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.session.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.session.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.session.input, app.input_cursor);
            app.session.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Kick off a send: the session stages the user message and placeholder, a
/// background task drives the stream and forwards every outcome onto the
/// shared event queue.
fn start_send(app: &mut App, tx: &UnboundedSender<AppEvent>) {
    let Some(outgoing) = app.session.begin_send() else {
        return;
    };
    app.input_cursor = 0;
    app.scroll_to_bottom();

    let ollama = app.ollama.clone();
    let model = app.session.selected_model.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        relay_chat(ollama, model, outgoing, tx).await;
    });
}

async fn relay_chat(
    ollama: charla_core::OllamaClient,
    model: String,
    messages: Vec<Message>,
    tx: UnboundedSender<AppEvent>,
) {
    match ollama.chat_stream(&model, &messages).await {
        Ok(mut deltas) => {
            while let Some(delta) = deltas.next_delta().await {
                match delta {
                    Ok(delta) => {
                        let _ = tx.send(AppEvent::Delta(delta));
                    }
                    Err(err) => {
                        let _ = tx.send(AppEvent::StreamFailed(err.to_string()));
                        return;
                    }
                }
            }
            let _ = tx.send(AppEvent::StreamDone);
        }
        Err(err) => {
            let _ = tx.send(AppEvent::StreamFailed(err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charla_core::ModelInfo;

    fn app_with_model() -> App {
        let mut app = App::new("http://localhost:11434");
        app.session.set_models(vec![ModelInfo {
            name: "llama3".to_string(),
            size: 100,
            modified_at: "t".to_string(),
        }]);
        app
    }

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[tokio::test]
    async fn test_suggestion_key_fills_draft() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = app_with_model();
        handle_event(&mut app, press(KeyCode::Char('1')), &tx);
        assert_eq!(app.session.input, SUGGESTIONS[0].1);
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn test_suggestion_keys_ignored_mid_conversation() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = app_with_model();
        app.session.messages.push(Message::user("hi", None));
        handle_event(&mut app, press(KeyCode::Char('2')), &tx);
        assert!(app.session.input.is_empty());
    }

    #[tokio::test]
    async fn test_delta_events_fill_the_placeholder() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = app_with_model();
        app.session.input = "hello".to_string();
        app.session.begin_send().unwrap();

        handle_event(&mut app, AppEvent::Delta("Hi".to_string()), &tx);
        handle_event(&mut app, AppEvent::Delta(" there".to_string()), &tx);
        handle_event(&mut app, AppEvent::StreamDone, &tx);

        assert_eq!(app.session.messages.last().unwrap().content, "Hi there");
        assert!(!app.session.loading);
    }

    #[tokio::test]
    async fn test_failed_stream_removes_placeholder() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = app_with_model();
        app.session.input = "hello".to_string();
        app.session.begin_send().unwrap();

        handle_event(
            &mut app,
            AppEvent::StreamFailed("failed to connect to Ollama: refused".to_string()),
            &tx,
        );

        assert_eq!(app.session.messages.len(), 1);
        assert!(!app.session.loading);
        assert!(!app.session.error.is_empty());
    }

    #[tokio::test]
    async fn test_typing_respects_utf8_boundaries() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = app_with_model();
        app.input_mode = InputMode::Editing;
        for c in ['¿', 'q', 'u', 'é', '?'] {
            handle_event(&mut app, press(KeyCode::Char(c)), &tx);
        }
        handle_event(&mut app, press(KeyCode::Backspace), &tx);
        assert_eq!(app.session.input, "¿qué");
    }
}
