//! Status bar with key hints and feedback

use crate::app::App;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

const HINTS: &str = "Tab:field  Enter:next  ^B:back  ^1-9:step  ^R:suggest  ^S:submit";

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(HINTS, Style::default().fg(Color::White))];

    if app.session.is_checking() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled("checking…", Style::default().fg(Color::Yellow)));
    }

    if let Some(msg) = &app.status_message {
        let color = if app.submitted.is_some() {
            Color::Green
        } else {
            Color::LightRed
        };
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg, Style::default().fg(color)));
    }

    let status = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, area);

    // Quit hint on the right
    let quit_hint = " Esc:quit ";
    let quit_area = Rect {
        x: area.x + area.width.saturating_sub(quit_hint.len() as u16),
        y: area.y,
        width: (quit_hint.len() as u16).min(area.width),
        height: 1,
    };
    let quit_widget =
        Paragraph::new(quit_hint).style(Style::default().bg(Color::DarkGray).fg(Color::Gray));
    frame.render_widget(quit_widget, quit_area);
}
