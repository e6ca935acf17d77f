//! Persistence for the four board collections.
//!
//! The backing store is an opaque string-keyed capability; [`StorageAdapter`]
//! layers JSON (de)serialization of task collections on top of it and turns
//! every failure into a log line instead of an error for the caller.

use crate::error::StorageError;
use crate::task::{Column, Task};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{fs, io};

pub type StorageResult<T> = Result<T, StorageError>;

const PROBE_KEY: &str = "__kanban_storage_test__";

/// Nominal quota reported by [`StorageAdapter::info`].
pub const NOMINAL_QUOTA: usize = 5 * 1024 * 1024;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&mut self, key: &str) -> StorageResult<()>;
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// HashMap-backed store. A disabled store fails every call, like a
/// sandboxed or switched-off browser storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    disabled: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            entries: HashMap::new(),
            disabled: true,
        }
    }

    fn check(&self) -> StorageResult<()> {
        if self.disabled {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.check()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.check()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.check()?;
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.check()?;
        Ok(self.entries.keys().cloned().collect())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(path, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }
}

/// The four column collections, in board order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boards {
    pub todos: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub testing: Vec<Task>,
    pub finished: Vec<Task>,
}

impl Boards {
    pub fn get(&self, column: Column) -> &Vec<Task> {
        match column {
            Column::Todos => &self.todos,
            Column::InProgress => &self.in_progress,
            Column::Testing => &self.testing,
            Column::Finished => &self.finished,
        }
    }

    pub fn get_mut(&mut self, column: Column) -> &mut Vec<Task> {
        match column {
            Column::Todos => &mut self.todos,
            Column::InProgress => &mut self.in_progress,
            Column::Testing => &mut self.testing,
            Column::Finished => &mut self.finished,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub available: bool,
    pub usage: usize,
    pub total: usize,
    pub kanban_keys: Vec<String>,
}

impl StorageInfo {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            usage: 0,
            total: 0,
            kanban_keys: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct StorageAdapter<S> {
    backend: S,
}

impl<S: KeyValueStore> StorageAdapter<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Write-then-delete probe. Never fails, only answers.
    pub fn is_available(&mut self) -> bool {
        match self
            .backend
            .set(PROBE_KEY, "test")
            .and_then(|()| self.backend.remove(PROBE_KEY))
        {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "storage probe failed");
                false
            }
        }
    }

    pub fn save_collection(&mut self, key: &str, tasks: &[Task]) {
        let result = serde_json::to_string(tasks)
            .map_err(StorageError::from)
            .and_then(|data| self.backend.set(key, &data));
        if let Err(error) = result {
            tracing::error!(key, %error, "failed to save collection");
        }
    }

    /// Falls back on a missing key and on unreadable or malformed data alike.
    pub fn load_collection(&self, key: &str, fallback: Vec<Task>) -> Vec<Task> {
        let stored = match self.backend.get(key) {
            Ok(Some(data)) if !data.is_empty() => data,
            Ok(_) => return fallback,
            Err(error) => {
                tracing::error!(key, %error, "failed to read collection");
                return fallback;
            }
        };
        match serde_json::from_str(&stored) {
            Ok(tasks) => tasks,
            Err(error) => {
                tracing::error!(key, %error, "failed to parse stored collection");
                fallback
            }
        }
    }

    pub fn save_all(&mut self, boards: &Boards) {
        for column in Column::ALL {
            self.save_collection(column.storage_key(), boards.get(column));
        }
    }

    pub fn load_all(&self, defaults: Boards) -> Boards {
        let Boards {
            todos,
            in_progress,
            testing,
            finished,
        } = defaults;
        Boards {
            todos: self.load_collection(Column::Todos.storage_key(), todos),
            in_progress: self.load_collection(Column::InProgress.storage_key(), in_progress),
            testing: self.load_collection(Column::Testing.storage_key(), testing),
            finished: self.load_collection(Column::Finished.storage_key(), finished),
        }
    }

    pub fn clear_all(&mut self) {
        for column in Column::ALL {
            let key = column.storage_key();
            if let Err(error) = self.backend.remove(key) {
                tracing::error!(key, %error, "failed to clear storage key");
            }
        }
    }

    pub fn info(&mut self) -> StorageInfo {
        if !self.is_available() {
            return StorageInfo::unavailable();
        }
        let keys = match self.backend.keys() {
            Ok(keys) => keys,
            Err(error) => {
                tracing::error!(%error, "failed to list storage keys");
                return StorageInfo {
                    available: true,
                    usage: 0,
                    total: 0,
                    kanban_keys: Vec::new(),
                };
            }
        };
        let usage = keys
            .iter()
            .map(|key| {
                let value_len = self
                    .backend
                    .get(key)
                    .ok()
                    .flatten()
                    .map_or(0, |value| value.len());
                key.len() + value_len
            })
            .sum();
        let kanban_keys = Column::ALL
            .iter()
            .map(|column| column.storage_key())
            .filter(|key| matches!(self.backend.get(key), Ok(Some(_))))
            .map(str::to_string)
            .collect();
        StorageInfo {
            available: true,
            usage,
            total: NOMINAL_QUOTA,
            kanban_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    fn task(id: u64) -> Task {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        Task::new(format!("task {id}"), created).with_id(id)
    }

    #[fixture]
    fn adapter() -> StorageAdapter<MemoryStore> {
        StorageAdapter::new(MemoryStore::new())
    }

    #[rstest]
    fn memory_store_is_available(mut adapter: StorageAdapter<MemoryStore>) {
        assert!(adapter.is_available());
        assert!(adapter.backend().keys().unwrap().is_empty());
    }

    #[test]
    fn disabled_store_is_unavailable() {
        let mut adapter = StorageAdapter::new(MemoryStore::disabled());
        assert!(!adapter.is_available());
        assert_eq!(adapter.info(), StorageInfo::unavailable());
    }

    #[rstest]
    fn saved_collection_loads_back(mut adapter: StorageAdapter<MemoryStore>) {
        adapter.save_collection("kanban_todos", &[task(1), task(2)]);
        let loaded = adapter.load_collection("kanban_todos", Vec::new());
        assert_eq!(loaded, vec![task(1), task(2)]);
    }

    #[rstest]
    fn missing_key_returns_fallback(adapter: StorageAdapter<MemoryStore>) {
        let loaded = adapter.load_collection("kanban_todos", vec![task(9)]);
        assert_eq!(loaded, vec![task(9)]);
    }

    #[rstest]
    fn malformed_data_returns_fallback(mut adapter: StorageAdapter<MemoryStore>) {
        adapter.backend.set("kanban_testing", "{not json").unwrap();
        let loaded = adapter.load_collection("kanban_testing", vec![task(4)]);
        assert_eq!(loaded, vec![task(4)]);
    }

    #[test]
    fn save_on_disabled_store_is_swallowed() {
        let mut adapter = StorageAdapter::new(MemoryStore::disabled());
        adapter.save_collection("kanban_todos", &[task(1)]);
        adapter.clear_all();
        assert_eq!(adapter.load_collection("kanban_todos", Vec::new()), Vec::new());
    }

    #[rstest]
    fn clear_all_removes_only_board_keys(mut adapter: StorageAdapter<MemoryStore>) {
        let boards = Boards {
            todos: vec![task(1)],
            finished: vec![task(2)],
            ..Boards::default()
        };
        adapter.save_all(&boards);
        adapter.backend.set("theme", "dark").unwrap();

        adapter.clear_all();

        let mut keys = adapter.backend().keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["theme".to_string()]);
    }

    #[rstest]
    fn load_all_keeps_defaults_for_missing_columns(mut adapter: StorageAdapter<MemoryStore>) {
        adapter.save_collection(Column::Testing.storage_key(), &[task(3)]);
        let defaults = Boards {
            todos: vec![task(1)],
            ..Boards::default()
        };

        let boards = adapter.load_all(defaults);

        assert_eq!(boards.todos, vec![task(1)]);
        assert_eq!(boards.testing, vec![task(3)]);
        assert!(boards.finished.is_empty());
    }

    #[rstest]
    fn info_reports_usage_and_board_keys(mut adapter: StorageAdapter<MemoryStore>) {
        adapter.backend.set("kanban_todos", "[]").unwrap();
        adapter.backend.set("x", "abc").unwrap();

        let info = adapter.info();

        assert!(info.available);
        assert_eq!(info.usage, "kanban_todos".len() + 2 + 1 + 3);
        assert_eq!(info.total, NOMINAL_QUOTA);
        assert_eq!(info.kanban_keys, vec!["kanban_todos".to_string()]);
    }

    #[test]
    fn file_store_round_trips_and_lists_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("kanban_todos").unwrap(), None);
        assert!(store.keys().unwrap().is_empty());

        store.set("kanban_todos", "[]").unwrap();
        assert_eq!(store.get("kanban_todos").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.keys().unwrap(), vec!["kanban_todos".to_string()]);

        store.remove("kanban_todos").unwrap();
        store.remove("kanban_todos").unwrap();
        assert_eq!(store.get("kanban_todos").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn file_store_adapter_probe_succeeds() {
        let dir = TempDir::new().unwrap();
        let mut adapter = StorageAdapter::new(FileStore::new(dir.path()));
        assert!(adapter.is_available());
        assert!(adapter.backend().keys().unwrap().is_empty());
    }
}
