use charla_core::Role;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, InputMode, SUGGESTIONS};

pub fn render(app: &mut App, frame: &mut Frame) {
    let attachments_height = if app.session.pending_images.is_empty() {
        0
    } else {
        1
    };

    let [chat_area, attachments_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(attachments_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    render_chat(app, frame, chat_area);
    if attachments_height > 0 {
        render_attachments(app, frame, attachments_area);
    }
    render_input(app, frame, input_area);
    render_status(app, frame, status_area);

    if app.show_model_picker {
        render_model_picker(app, frame);
    }
    if app.show_attach_prompt {
        render_attach_prompt(app, frame);
    }
}

fn render_chat(app: &App, frame: &mut Frame, area: Rect) {
    let title = if app.session.selected_model.is_empty() {
        " Ollama: no model ".to_string()
    } else {
        format!(" Ollama: {} ", app.session.selected_model)
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title);

    let chat_text = if app.session.messages.is_empty() && !app.session.loading {
        welcome_text()
    } else {
        let mut lines: Vec<Line> = Vec::new();
        let last = app.session.messages.len().saturating_sub(1);

        for (idx, msg) in app.session.messages.iter().enumerate() {
            match msg.role {
                Role::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    if let Some(images) = &msg.images {
                        for _ in images {
                            lines.push(Line::from(Span::styled(
                                "[image]",
                                Style::default().fg(Color::Magenta),
                            )));
                        }
                    }
                    for line in msg.content.lines() {
                        lines.push(Line::from(line));
                    }
                    lines.push(Line::default());
                }
                Role::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    let streaming_placeholder =
                        msg.content.is_empty() && app.session.loading && idx == last;
                    if streaming_placeholder {
                        // Animated ellipsis: cycles through ".", "..", "..."
                        let dots = ".".repeat((app.animation_frame as usize) + 1);
                        lines.push(Line::from(Span::styled(
                            format!("Thinking{}", dots),
                            Style::default()
                                .fg(Color::DarkGray)
                                .add_modifier(Modifier::ITALIC),
                        )));
                    } else {
                        for line in msg.content.lines() {
                            lines.push(Line::from(line));
                        }
                    }
                    lines.push(Line::default());
                }
            }
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn welcome_text() -> Text<'static> {
    let mut lines = vec![
        Line::from(Span::styled(
            "Start a conversation with a local model.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::default(),
    ];
    for (i, (title, prompt)) in SUGGESTIONS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}. ", i + 1), Style::default().fg(Color::DarkGray)),
            Span::styled(*title, Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!(": {}", prompt), Style::default().fg(Color::DarkGray)),
        ]));
    }
    Text::from(lines)
}

fn render_attachments(app: &App, frame: &mut Frame, area: Rect) {
    let count = app.session.pending_images.len();
    let label = if count == 1 {
        " 1 image attached (x to remove) ".to_string()
    } else {
        format!(" {} images attached (x to remove) ", count)
    };
    let attachments = Paragraph::new(Span::styled(label, Style::default().fg(Color::Magenta)));
    frame.render_widget(attachments, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (i to type, Enter to send) ");

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.input_cursor >= inner_width {
        app.input_cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .session
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = area.x + 1 + (app.input_cursor - scroll_offset) as u16;
        frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(2)), area.y + 1));
    }
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let status = if !app.session.error.is_empty() {
        Paragraph::new(Span::styled(
            format!(" {} ", app.session.error),
            Style::default().fg(Color::Red),
        ))
    } else {
        let hint = match app.input_mode {
            InputMode::Normal => {
                " i:edit  enter:send  n:new chat  M:models  a:attach  x:remove image  q:quit "
            }
            InputMode::Editing => " enter:send  esc:back ",
        };
        Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    };
    frame.render_widget(status, area);
}

fn render_model_picker(app: &mut App, frame: &mut Frame) {
    let area = centered_rect(50, (app.session.models.len() as u16 + 2).min(12), frame.area());

    let items: Vec<ListItem> = app
        .session
        .models
        .iter()
        .map(|m| ListItem::new(format!(" {}  {} ", m.name, format_size(m.size))))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Select model (Enter) "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut app.model_picker_state);
}

fn render_attach_prompt(app: &App, frame: &mut Frame) {
    let area = centered_rect(60, 3, frame.area());

    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.attach_cursor >= inner_width {
        app.attach_cursor - inner_width + 1
    } else {
        0
    };
    let visible_text: String = app
        .attach_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let prompt = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Attach image (path, Enter to confirm) "),
        );

    frame.render_widget(Clear, area);
    frame.render_widget(prompt, area);
}

fn format_size(bytes: u64) -> String {
    const GB: f64 = 1_000_000_000.0;
    const MB: f64 = 1_000_000.0;
    let bytes = bytes as f64;
    if bytes >= GB {
        format!("({:.1} GB)", bytes / GB)
    } else {
        format!("({:.0} MB)", bytes / MB)
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let width = r.width * percent_x / 100;
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width,
        height: height.min(r.height),
    }
}
