use anyhow::Result;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{AppEvent, EventHandler};

const OLLAMA_URL: &str = "http://localhost:11434";

#[tokio::main]
async fn main() -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(OLLAMA_URL);

    // Fetch the model list in the background; the first entry becomes the
    // default selection once the event arrives.
    let ollama = app.ollama.clone();
    let tx = events.sender();
    tokio::spawn(async move {
        let _ = tx.send(AppEvent::Models(ollama.list_models().await));
    });

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;
        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event, &events.sender());
        }
    }

    tui::restore()?;
    Ok(())
}
