//! Field rendering for the current step

use crate::app::App;
use onboarding_wizard::forms::{FieldKind, FieldSpec, FormValue};
use onboarding_wizard::uniqueness::CheckStatus;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// Rows taken by one field: its box, a message line, optionally suggestions
fn field_height(app: &App, spec: &FieldSpec) -> u16 {
    let suggestions = !app.session.suggestions_for(&spec.key).is_empty();
    3 + 1 + u16::from(suggestions)
}

/// Draw every field of the current step, stacked vertically
pub fn draw(frame: &mut Frame, area: Rect, app: &App, now: Instant) {
    let session = &app.session;
    let step = match session.schema().get_step(session.current_step()) {
        Ok(step) => step,
        Err(_) => return,
    };
    let specs: Vec<&FieldSpec> = step
        .fields
        .iter()
        .filter_map(|key| session.schema().field(key))
        .collect();

    let mut constraints: Vec<Constraint> = vec![Constraint::Length(1)];
    constraints.extend(specs.iter().map(|spec| Constraint::Length(field_height(app, spec))));
    constraints.push(Constraint::Min(0));
    let rows = Layout::vertical(constraints).split(area);

    let description = Paragraph::new(Line::from(Span::styled(
        step.description.as_str(),
        Style::default().fg(Color::Gray),
    )));
    frame.render_widget(description, rows[0]);

    let frame_index = (now.saturating_duration_since(app.started).as_millis() / 100) as usize;
    for (index, spec) in specs.iter().enumerate() {
        let is_active = index == app.active_field;
        draw_field(frame, rows[index + 1], app, spec, is_active, frame_index);
    }
}

fn draw_field(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    spec: &FieldSpec,
    is_active: bool,
    frame_index: usize,
) {
    let session = &app.session;
    let value = session.value(&spec.key);
    let error = session.errors().get(&spec.key);
    let status = session.check_status(&spec.key);

    let border_style = match (is_active, error.is_some()) {
        (_, true) => Style::default().fg(Color::Red),
        (true, false) => Style::default().fg(Color::Cyan),
        (false, false) => Style::default().fg(Color::DarkGray),
    };

    let [input_area, message_area, suggestion_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    let mut title = format!(" {} ", spec.label);
    if spec.required {
        title.push_str("* ");
    }
    let block = Block::default()
        .title(title)
        .title(Line::from(check_indicator(spec, &status, error.is_none(), frame_index)).right_aligned())
        .borders(Borders::ALL)
        .border_style(border_style);

    let content = Paragraph::new(value_line(app, spec, &value, is_active));
    frame.render_widget(content.wrap(Wrap { trim: false }).block(block), input_area);

    let message = match (error, &spec.help) {
        (Some(error), _) => Span::styled(format!("  {}", error.message), Style::default().fg(Color::Red)),
        (None, Some(help)) if is_active => {
            Span::styled(format!("  {help}"), Style::default().fg(Color::DarkGray))
        }
        _ => Span::raw(""),
    };
    frame.render_widget(Paragraph::new(Line::from(message)), message_area);

    let suggestions = session.suggestions_for(&spec.key);
    if !suggestions.is_empty() && suggestion_area.height > 0 {
        let mut spans = vec![Span::styled("  Try: ", Style::default().fg(Color::Gray))];
        for (i, suggestion) in suggestions.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            let style = if suggestion == value.as_text() {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Blue)
            };
            spans.push(Span::styled(suggestion.as_str(), style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), suggestion_area);
    }
}

/// Spinner while a check is pending or in flight, ✓ once confirmed available
fn check_indicator(spec: &FieldSpec, status: &CheckStatus, clean: bool, frame_index: usize) -> Span<'static> {
    if !spec.unique {
        return Span::raw("");
    }
    if status.is_busy() {
        let glyph = SPINNER[frame_index % SPINNER.len()];
        return Span::styled(format!(" {glyph} "), Style::default().fg(Color::Yellow));
    }
    if status.checked && clean {
        return Span::styled(" ✓ ", Style::default().fg(Color::Green));
    }
    Span::raw("")
}

fn value_line(app: &App, spec: &FieldSpec, value: &FormValue, is_active: bool) -> Line<'static> {
    let active_style = Style::default().fg(Color::Cyan);
    let idle_style = Style::default().fg(Color::DarkGray);
    let style = if is_active { active_style } else { idle_style };

    match &spec.kind {
        FieldKind::Checkbox => Line::from(Span::styled(value.display_value(), style)),
        FieldKind::Select { options } | FieldKind::MultiSelect { options } if !options.is_empty() => {
            let chosen: Vec<&str> = match value {
                FormValue::Text(text) => vec![text.as_str()],
                FormValue::List(items) => items.iter().map(String::as_str).collect(),
                _ => Vec::new(),
            };
            let spans: Vec<Span> = options
                .iter()
                .enumerate()
                .map(|(i, option)| {
                    let mut option_style = if chosen.contains(&option.as_str()) {
                        Style::default().fg(Color::Green)
                    } else {
                        idle_style
                    };
                    if is_active && i == app.option_cursor {
                        option_style = option_style.add_modifier(Modifier::REVERSED);
                    }
                    Span::styled(format!(" {option} "), option_style)
                })
                .collect();
            Line::from(spans)
        }
        _ => {
            let display_value = value.display_value();
            let display_str = if display_value.is_empty() && !is_active {
                "(empty)".to_string()
            } else {
                display_value
            };
            let cursor = if is_active { "▌" } else { "" };
            Line::from(vec![
                Span::styled(display_str, style),
                Span::styled(cursor, active_style),
            ])
        }
    }
}
