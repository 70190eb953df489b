mod config;
mod controller;
mod coordinator;
mod error;
mod logging;
mod model;
mod view;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use config::Config;
use controller::AppController;
use coordinator::{Coordinator, CoordinatorSettings, HttpAssetLoader};
use model::{AppModel, GraphqlClient, ThemeStore};
use view::AppView;

/// Terminal browser for tunemeld's aggregated genre playlists
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Backend base URL (overrides `api.base_url`)
    #[arg(long, env = "TUNEMELD_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Genre to open with; falls back to the backend's default
    #[arg(long, env = "TUNEMELD_GENRE")]
    genre: Option<String>,

    /// Config file path
    #[arg(long, env = "TUNEMELD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(base_url) = args.api_base_url {
        config.api.base_url = base_url;
    }

    if let Err(e) = logging::init_logging(&config.paths.log_dir) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!(
        api = %config.api.base_url,
        genre = ?args.genre,
        "=== tunemeld-rs starting ==="
    );

    let request_timeout = Duration::from_secs(config.api.request_timeout_secs);
    let queries = GraphqlClient::new(&config.api.base_url, request_timeout)?;
    let assets = HttpAssetLoader::new(request_timeout)?;

    let theme_store = ThemeStore::new(&config.paths.cache_dir);
    let model = Arc::new(AppModel::new(theme_store.load()));

    let coordinator = Coordinator::new(
        Arc::new(queries),
        Arc::new(assets),
        model.clone(),
        CoordinatorSettings::from(&config),
    );

    let coordinator_for_init = coordinator.clone();
    let requested_genre = args.genre;
    tokio::spawn(async move {
        if let Err(e) = coordinator_for_init.run(requested_genre).await {
            tracing::error!(error = %e.technical_detail(), "Initial load failed");
        }
    });

    let controller = AppController::new(model.clone(), coordinator, theme_store);

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model, controller).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("tunemeld-rs shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<AppModel>,
    controller: AppController,
) -> io::Result<()> {
    loop {
        let snapshot = model.snapshot().await;

        terminal.draw(|f| {
            AppView::render(f, &snapshot);
        })?;

        // Short poll so skeleton fades show up promptly
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = controller.handle_key_event(key).await {
                    tracing::warn!(error = %e, "Key handling failed");
                }
            }
        }

        if model.should_quit().await {
            break;
        }
    }

    Ok(())
}
