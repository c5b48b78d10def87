use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, Borders, Paragraph, Wrap},
};
use luna_core::{ChatRole, Status};
use crate::app::{App, InputMode};

pub const TITLE: &str = "Luna Travel Assistant";
const SEND_LABEL: &str = " Send ";

/// Split a line on `**` markers, styling the closed pairs bold.
/// An unclosed trailing marker is shown literally.
fn styled_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    // An even number of parts means the last marker was never closed
    let unclosed = parts.len() % 2 == 0;

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let is_bold = i % 2 == 1 && !(unclosed && i == parts.len() - 1);
        if part.is_empty() {
            continue;
        }
        if is_bold {
            spans.push(Span::styled(
                part.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else if unclosed && i == parts.len() - 1 {
            spans.push(Span::raw(format!("**{}", part)));
        } else {
            spans.push(Span::raw(part.to_string()));
        }
    }

    Line::from(spans)
}

fn label(role: ChatRole) -> Span<'static> {
    let (text, color) = match role {
        ChatRole::User => ("You:", Color::Cyan),
        ChatRole::Assistant => ("Luna:", Color::Green),
        ChatRole::Error => ("Error:", Color::Red),
        ChatRole::System => ("System:", Color::DarkGray),
    };
    Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", TITLE), Style::default().fg(Color::Yellow).bold()),
        Span::styled(
            format!("{} / {}", app.session.model(), app.session.retrieval().index_name()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let transcript = app.session.transcript();
    let pending = app.session.is_pending();

    let text = if transcript.is_empty() && !pending {
        Text::from(Span::styled(
            "Ask about destinations, hotels, food, culture or travel tips...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in transcript.entries() {
            lines.push(Line::from(label(msg.role)));
            match msg.role {
                ChatRole::Assistant => lines.extend(msg.content.lines().map(styled_line)),
                ChatRole::Error => lines.extend(msg.content.lines().map(|l| {
                    Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Red)))
                })),
                _ => lines.extend(msg.content.lines().map(|l| Line::from(l.to_string()))),
            }
            lines.push(Line::default());
        }

        if pending {
            lines.push(Line::from(label(ChatRole::Assistant)));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    // Right-aligned titles end one cell before the corner
    let send_width = SEND_LABEL.len() as u16;
    app.send_area = if area.width > send_width + 2 {
        Some(Rect::new(area.right() - 1 - send_width, area.y, send_width, 1))
    } else {
        None
    };

    let can_send = !app.session.is_pending() && !app.input.trim().is_empty();
    let send_style = if can_send {
        Style::default().fg(Color::Black).bg(Color::Green).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask Luna ")
        .title(Title::from(Span::styled(SEND_LABEL, send_style)).alignment(Alignment::Right));

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
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
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" VIEW ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let status = app.session.status();
    let status_span = match status {
        Status::Ready => Span::raw(""),
        Status::Thinking => Span::styled(
            format!(" {} ", status.label()),
            Style::default().fg(Color::Yellow).bg(Color::Black),
        ),
        Status::Error => Span::styled(
            format!(" {} ", status.label()),
            Style::default().fg(Color::White).bg(Color::Red).bold(),
        ),
    };

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter/Send ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" view ", label_style),
            Span::styled(" Ctrl-C ", key_style),
            Span::styled(" quit ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" top/bottom ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            status_span,
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
