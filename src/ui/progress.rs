//! Step progress bar

use crate::app::App;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::time::Instant;

/// Blend from the resting gray towards red as `intensity` goes to 1
fn highlight_color(intensity: f32) -> Color {
    let t = intensity.clamp(0.0, 1.0);
    let lerp = |from: f32, to: f32| (from + (to - from) * t).round() as u8;
    Color::Rgb(lerp(128.0, 255.0), lerp(128.0, 70.0), lerp(128.0, 70.0))
}

/// Draw the row of step titles with completion markers
pub fn draw(frame: &mut Frame, area: Rect, app: &App, now: Instant) {
    let session = &app.session;
    let completed = session.completed();
    let highlighted = session.incomplete_highlight(now);
    let intensity = session.highlight_intensity(now);
    let current = session.current_step();

    let mut spans = Vec::new();
    for (index, step) in session.schema().steps().iter().enumerate() {
        if index > 0 {
            spans.push(Span::styled(" ─ ", Style::default().fg(Color::DarkGray)));
        }
        let marker = if index == current {
            "●"
        } else if completed[index] {
            "✓"
        } else {
            "○"
        };
        let mut style = if highlighted[index] {
            Style::default().fg(highlight_color(intensity))
        } else if completed[index] {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };
        if index == current {
            style = style.add_modifier(Modifier::BOLD);
        }
        spans.push(Span::styled(
            format!("{marker} {} {}", index + 1, step.title),
            style,
        ));
    }

    let block = Block::default()
        .title(format!(" {} ", session.schema().title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
