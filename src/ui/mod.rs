//! UI module for rendering the wizard

mod fields;
mod progress;
mod status_bar;

use crate::app::App;
use ratatui::{
    layout::{Constraint, Layout},
    Frame,
};
use std::time::Instant;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let now = Instant::now();
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    progress::draw(frame, header, app, now);
    fields::draw(frame, body, app, now);
    status_bar::draw(frame, footer, app);
}
