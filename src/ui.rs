use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use kanban_store::{Column, FileStore, StorageInfo, TaskStore};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Terminal,
};
use std::{fs, io, path::PathBuf};

pub struct App {
    pub store: TaskStore<FileStore>,
    pub selected_column: Column,
    pub selected_task: usize,
    pub export_path: PathBuf,
    pub message: String,
    /// Header figures, refreshed only after the board changes.
    pub storage: StorageInfo,
}

impl App {
    pub fn new(mut store: TaskStore<FileStore>, export_path: PathBuf) -> Self {
        let storage = store.storage_info();
        Self {
            store,
            selected_column: Column::Todos,
            selected_task: 0,
            export_path,
            message: String::new(),
            storage,
        }
    }

    /// Returns `false` once the user quits.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let changed = match code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('a') => {
                self.add_task();
                true
            }
            KeyCode::Char('x') => {
                self.export();
                true
            }
            KeyCode::Char('i') => {
                self.import();
                true
            }
            KeyCode::Char('R') => {
                self.store.reset_to_default();
                self.clamp_selection();
                self.message = "Board reset".to_string();
                true
            }
            KeyCode::Char('C') => {
                self.store.clear_persistence();
                self.message = "Saved board cleared".to_string();
                true
            }
            KeyCode::Left => {
                let previous = self.selected_column.previous();
                self.select_column(previous);
                false
            }
            KeyCode::Right => {
                let next = self.selected_column.next();
                self.select_column(next);
                false
            }
            KeyCode::Up => {
                self.selected_task = self.selected_task.saturating_sub(1);
                false
            }
            KeyCode::Down => {
                self.selected_task += 1;
                self.clamp_selection();
                false
            }
            KeyCode::Enter => {
                let next = self.selected_column.next();
                self.move_selected(next);
                true
            }
            KeyCode::Backspace => {
                let previous = self.selected_column.previous();
                self.move_selected(previous);
                true
            }
            _ => false,
        };
        if changed {
            self.storage = self.store.storage_info();
        }
        true
    }

    fn select_column(&mut self, column: Option<Column>) {
        if let Some(column) = column {
            self.selected_column = column;
            self.selected_task = 0;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.store.board(self.selected_column).len();
        self.selected_task = self.selected_task.min(len.saturating_sub(1));
    }

    fn move_selected(&mut self, target: Option<Column>) {
        let Some(target) = target else {
            return;
        };
        let from = self.selected_column;
        let Some(id) = self
            .store
            .board(from)
            .get(self.selected_task)
            .and_then(|task| task.id)
        else {
            return;
        };
        self.message = match self.store.move_task(id, from.id(), target.id()) {
            Ok(()) => format!("Moved #{id} to {}", target.title()),
            Err(err) => err.to_string(),
        };
        self.clamp_selection();
    }

    fn add_task(&mut self) {
        let Some(title) = prompt("Enter task title").filter(|title| !title.is_empty()) else {
            return;
        };
        let mut task = self.store.draft(title);
        if let Some(due_date) = prompt("Enter due date (YYYY-MM-DD)").filter(|d| !d.is_empty()) {
            task = task.with_due_date(due_date);
        }
        self.message = match self.store.add_task(task, self.selected_column.id()) {
            Ok(task) => format!("Added #{}", task.id.map_or(0, |id| id.0)),
            Err(err) => err.to_string(),
        };
    }

    fn export(&mut self) {
        let snapshot = self.store.export_snapshot();
        let result = serde_json::to_string_pretty(&snapshot)
            .map_err(io::Error::from)
            .and_then(|data| fs::write(&self.export_path, data));
        self.message = match result {
            Ok(()) => format!("Exported to {}", self.export_path.display()),
            Err(err) => {
                tracing::error!(path = %self.export_path.display(), error = %err, "export failed");
                format!("Export failed: {err}")
            }
        };
    }

    fn import(&mut self) {
        let data = match fs::read_to_string(&self.export_path) {
            Ok(data) => data,
            Err(err) => {
                self.message = format!("Import failed: {err}");
                return;
            }
        };
        self.message = match self.store.import_json(&data) {
            Ok(report) if report.rejected.is_empty() => {
                format!("Imported {} columns", report.imported.len())
            }
            Ok(report) => format!(
                "Imported {} columns, skipped {}",
                report.imported.len(),
                report.rejected.len()
            ),
            Err(err) => err.to_string(),
        };
        self.clamp_selection();
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![Constraint::Length(1), Constraint::Min(0)])
                .split(f.area());
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Percentage(25); 4])
                .split(rows[1]);

            let info = &app.storage;
            let header = if info.available {
                format!("storage: {} / {} bytes", info.usage, info.total)
            } else {
                "storage: unavailable".to_string()
            };
            f.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(header, Style::default().fg(Color::DarkGray)),
                    Span::raw("  "),
                    Span::raw(app.message.as_str()),
                ])),
                rows[0],
            );

            for column in Column::ALL {
                let items: Vec<ListItem> = app
                    .store
                    .board(column)
                    .iter()
                    .map(|t| {
                        let id = t.id.map_or(0, |id| id.0);
                        let due = t.due_date.as_deref().unwrap_or("-");
                        ListItem::new(Line::from(vec![
                            Span::raw(format!("[#{id}] ")),
                            Span::styled(t.title.as_str(), Style::default().fg(Color::White)),
                            Span::raw(format!(" (Due: {due})")),
                        ]))
                    })
                    .collect();

                let focused = app.selected_column == column;
                let list = List::new(items)
                    .block(
                        Block::default()
                            .title(column.title())
                            .borders(Borders::ALL)
                            .border_style(if focused {
                                Style::default().fg(Color::Cyan)
                            } else {
                                Style::default()
                            }),
                    )
                    .highlight_style(Style::default().add_modifier(Modifier::BOLD));

                let mut state = ListState::default();
                if focused {
                    state.select(Some(app.selected_task));
                }
                f.render_stateful_widget(list, chunks[column.index()], &mut state);
            }
        })?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key.code) {
                return Ok(());
            }
        }
    }
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        enable_raw_mode().ok();
        Some(input.trim().to_string())
    } else {
        enable_raw_mode().ok();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn app(dir: &TempDir) -> App {
        let store = TaskStore::new(FileStore::new(dir.path()));
        App::new(store, dir.path().join("export.json"))
    }

    #[test]
    fn navigation_keeps_cached_storage_info() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        let before = app.storage.clone();
        fs::write(dir.path().join("other.json"), "x".repeat(64)).unwrap();

        assert!(app.handle_key(KeyCode::Right));
        assert!(app.handle_key(KeyCode::Down));
        assert!(app.handle_key(KeyCode::Left));

        assert_eq!(app.storage, before);
    }

    #[test]
    fn board_change_refreshes_storage_info() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        assert!(app.storage.kanban_keys.is_empty());

        assert!(app.handle_key(KeyCode::Enter));

        assert_eq!(app.store.board(Column::Todos).len(), 0);
        assert_eq!(app.storage.kanban_keys.len(), 4);
        assert!(app.storage.usage > 0);
    }

    #[test]
    fn quit_key_stops_the_loop() {
        let dir = TempDir::new().unwrap();
        assert!(!app(&dir).handle_key(KeyCode::Char('q')));
    }
}
