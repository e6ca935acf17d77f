mod ui;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use kanban_store::{config, FileStore, TaskStore};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs, io, path::Path, sync::Mutex};
use tracing_subscriber::EnvFilter;

fn init_logging(path: &Path) -> Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    // Default to WARN; RUST_LOG=info shows every board change
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cfg = config::load_config()?;
    let data_dir = config::get_data_dir(&cfg)?;
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    init_logging(&data_dir.join(&cfg.log.file_name))?;

    // Board setup
    let store = TaskStore::new(FileStore::new(&data_dir));
    tracing::info!(
        data_dir = %store.backend().dir().display(),
        storage_available = store.storage_available(),
        "board loaded"
    );
    let mut app = ui::App::new(store, data_dir.join(&cfg.export.file_name));

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Save tasks
    app.store.persist_all();

    if let Err(err) = result {
        eprintln!("{:?}", err);
    }
    Ok(())
}
