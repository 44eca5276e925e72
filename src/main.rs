//! Onboarding wizard - terminal front end for stepped onboarding forms
//!
//! Renders a form from the catalog with ratatui and drives a
//! [`FormSession`] from keyboard input.

mod app;
mod ui;

use anyhow::{anyhow, Result};
use app::App;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use onboarding_wizard::forms::{FieldKind, FormSchema};
use onboarding_wizard::services::{
    HttpCheckService, HttpSubmissionService, InMemoryDirectory, RecordSubmissionService,
    UniquenessCheckService,
};
use onboarding_wizard::{FormKind, FormSession, WizardConfig};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onboarding_wizard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let kind = match std::env::args().nth(1) {
        Some(name) => FormKind::from_name(&name).ok_or_else(|| {
            anyhow!("Unknown form '{name}', expected 'registration' or 'product'")
        })?,
        None => FormKind::default(),
    };

    let config = WizardConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {e}");
        WizardConfig::default()
    });

    let schema = kind.schema();
    let (checks, submissions) = build_services(&config, &schema)?;
    let session = FormSession::new(schema, checks, config.session_options());
    let mut app = App::new(session, submissions);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Handle any errors
    if let Err(err) = result {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }

    if let Some(id) = app.submitted {
        println!("Submitted {} ({id})", kind.schema().title);
    }

    Ok(())
}

type Services = (
    Arc<dyn UniquenessCheckService>,
    Arc<dyn RecordSubmissionService>,
);

/// HTTP services where a URL is configured, the in-memory directory otherwise
fn build_services(config: &WizardConfig, schema: &FormSchema) -> Result<Services> {
    let mut directory = InMemoryDirectory::new();
    for spec in schema.fields().filter(|spec| spec.unique) {
        directory = directory.with_registered(spec.key.as_str(), Vec::<String>::new());
        if spec.kind == FieldKind::Slug {
            directory = directory.with_slug_field(spec.key.as_str());
        }
    }
    let directory = Arc::new(directory);
    let timeout = config.request_timeout();

    let checks: Arc<dyn UniquenessCheckService> = match &config.check_service_url {
        Some(url) => {
            tracing::info!("Using check service at {url}");
            Arc::new(HttpCheckService::new(url.as_str(), timeout)?)
        }
        None => directory.clone(),
    };
    let submissions: Arc<dyn RecordSubmissionService> = match &config.submit_service_url {
        Some(url) => {
            tracing::info!("Using submission service at {url}");
            Arc::new(HttpSubmissionService::new(url.as_str(), timeout)?)
        }
        None => directory,
    };
    Ok((checks, submissions))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Apply uniqueness answers before drawing
        app.tick();

        terminal.draw(|frame| ui::draw(frame, app))?;

        // Faster polling while spinners or the highlight are animating
        let animating = app.session.is_checking()
            || app
                .session
                .incomplete_highlight(std::time::Instant::now())
                .contains(&true);
        let poll_duration = if animating {
            Duration::from_millis(16)
        } else {
            Duration::from_millis(100)
        };

        if event::poll(poll_duration)? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }
                app.handle_key(key).await?;
            }
        }

        // Check if app wants to quit
        if app.should_quit() {
            return Ok(());
        }
    }
}
