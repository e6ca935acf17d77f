//! The board's source of truth.
//!
//! [`TaskStore`] owns the four column collections and keeps every task's
//! `status` equal to the column it sits in. Each mutating operation persists
//! the boards itself once it succeeds; nothing relies on an outside observer
//! to flush state.

use crate::error::StoreError;
use crate::seed;
use crate::storage::{Boards, KeyValueStore, StorageAdapter, StorageInfo};
use crate::task::{Column, Status, Task, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Read-only projection of the boards, also the import payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub todos: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub testing: Vec<Task>,
    pub finished: Vec<Task>,
    pub timestamp: DateTime<Utc>,
}

/// A committed list edit reported by the drag-and-drop layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DragChange {
    Added { element: Task, new_index: usize },
    Removed { old_index: usize },
    Moved { old_index: usize, new_index: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<Column>,
    pub rejected: Vec<Column>,
}

pub struct TaskStore<S> {
    boards: Boards,
    storage: StorageAdapter<S>,
    storage_available: bool,
    clock: Box<dyn Clock + Send>,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn new(backend: S) -> Self {
        Self::with_clock(backend, SystemClock)
    }

    /// Probes the backend once, then loads persisted boards or falls back
    /// to the seed data.
    pub fn with_clock(backend: S, clock: impl Clock + Send + 'static) -> Self {
        let mut storage = StorageAdapter::new(backend);
        let storage_available = storage.is_available();
        let boards = if storage_available {
            storage.load_all(seed::boards())
        } else {
            tracing::warn!("storage unavailable, board changes will not persist");
            seed::boards()
        };
        let mut store = Self {
            boards,
            storage,
            storage_available,
            clock: Box::new(clock),
        };
        if store.fill_missing_ids() {
            store.sync();
        }
        store
    }

    pub fn storage_available(&self) -> bool {
        self.storage_available
    }

    pub fn backend(&self) -> &S {
        self.storage.backend()
    }

    pub fn boards(&self) -> &Boards {
        &self.boards
    }

    pub fn board(&self, column: Column) -> &[Task] {
        self.boards.get(column)
    }

    /// `None` means the column id is unknown, not that the board is empty.
    pub fn get_board(&self, column_id: &str) -> Option<&[Task]> {
        Column::from_id(column_id).map(|column| self.board(column))
    }

    /// Unknown ids fall back to [`Status::ToDo`].
    pub fn status_for_column(&self, column_id: &str) -> Status {
        match Column::from_id(column_id) {
            Some(column) => column.status(),
            None => {
                tracing::debug!(column = column_id, "unknown column, defaulting to to-do");
                Status::ToDo
            }
        }
    }

    /// A blank task stamped with today's date, ready for [`TaskStore::add_task`].
    pub fn draft(&self, title: impl Into<String>) -> Task {
        Task::new(title, self.clock.now())
    }

    pub fn add_task(&mut self, mut task: Task, column_id: &str) -> Result<&Task, StoreError> {
        let column = resolve_column(column_id)?;
        if !task.has_id() {
            task.id = Some(self.next_id()?);
        }
        task.status = column.status();
        tracing::info!(task_id = ?task.id, %column, "task added");

        let index = self.boards.get(column).len();
        self.boards.get_mut(column).push(task);
        self.sync();
        Ok(&self.boards.get(column)[index])
    }

    pub fn move_task(
        &mut self,
        id: TaskId,
        from_column_id: &str,
        to_column_id: &str,
    ) -> Result<(), StoreError> {
        let (Some(from), Some(to)) = (
            Column::from_id(from_column_id),
            Column::from_id(to_column_id),
        ) else {
            tracing::error!(from = from_column_id, to = to_column_id, "invalid board type");
            let bad = if Column::from_id(from_column_id).is_none() {
                from_column_id
            } else {
                to_column_id
            };
            return Err(StoreError::UnknownColumn(bad.to_string()));
        };

        let Some(index) = self
            .boards
            .get(from)
            .iter()
            .position(|task| task.id == Some(id))
        else {
            tracing::error!(task_id = %id, column = %from, "task not found");
            return Err(StoreError::TaskNotFound {
                id,
                column: from.id().to_string(),
            });
        };

        let mut task = self.boards.get_mut(from).remove(index);
        task.status = to.status();
        self.boards.get_mut(to).push(task);
        tracing::info!(task_id = %id, %from, %to, "task moved");
        self.sync();
        Ok(())
    }

    /// Applies a drag-and-drop list edit to one column. Only an added
    /// element gets its status corrected; every applied edit is persisted.
    pub fn apply_drag_change(
        &mut self,
        change: DragChange,
        column_id: &str,
    ) -> Result<(), StoreError> {
        let column = resolve_column(column_id)?;
        match change {
            DragChange::Added {
                mut element,
                new_index,
            } => {
                if !element.has_id() {
                    element.id = Some(self.next_id()?);
                }
                element.status = column.status();
                tracing::info!(
                    task_id = ?element.id,
                    %column,
                    status = %element.status,
                    "task dropped into column"
                );
                let board = self.boards.get_mut(column);
                let index = new_index.min(board.len());
                board.insert(index, element);
            }
            DragChange::Removed { old_index } => {
                let board = self.boards.get_mut(column);
                if old_index >= board.len() {
                    return Err(invalid_position(old_index, column));
                }
                board.remove(old_index);
            }
            DragChange::Moved {
                old_index,
                new_index,
            } => {
                let board = self.boards.get_mut(column);
                if old_index >= board.len() {
                    return Err(invalid_position(old_index, column));
                }
                let task = board.remove(old_index);
                let index = new_index.min(board.len());
                board.insert(index, task);
            }
        }
        self.sync();
        Ok(())
    }

    /// Edits a task in place wherever it lives. Its id and status are kept.
    pub fn edit_task(
        &mut self,
        id: TaskId,
        edit: impl FnOnce(&mut Task),
    ) -> Result<&Task, StoreError> {
        let Some((column, index)) = self.locate(id) else {
            tracing::error!(task_id = %id, "task not found");
            return Err(StoreError::UnknownTask(id));
        };
        let task = &mut self.boards.get_mut(column)[index];
        edit(task);
        task.id = Some(id);
        task.status = column.status();
        self.sync();
        Ok(&self.boards.get(column)[index])
    }

    pub fn persist_all(&mut self) {
        if !self.storage_available {
            tracing::warn!("storage is not available");
            return;
        }
        self.storage.save_all(&self.boards);
    }

    /// Reseeds every column and drops the persisted copies.
    pub fn reset_to_default(&mut self) {
        self.boards = seed::boards();
        if self.storage_available {
            self.storage.clear_all();
        }
        tracing::info!("boards reset to defaults");
    }

    /// Drops persisted state, leaving memory untouched until the next mutation.
    pub fn clear_persistence(&mut self) {
        if !self.storage_available {
            tracing::warn!("storage is not available");
            return;
        }
        self.storage.clear_all();
    }

    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot {
            todos: self.boards.todos.clone(),
            in_progress: self.boards.in_progress.clone(),
            testing: self.boards.testing.clone(),
            finished: self.boards.finished.clone(),
            timestamp: self.clock.now(),
        }
    }

    /// Replaces each collection present in `data`. A malformed field is
    /// logged and skipped without blocking the others.
    pub fn import_snapshot(&mut self, data: &Value) -> Result<ImportReport, StoreError> {
        let Some(fields) = data.as_object() else {
            tracing::error!("error importing data: payload is not an object");
            return Err(StoreError::InvalidImport(json_kind(data).to_string()));
        };

        let mut report = ImportReport::default();
        for column in Column::ALL {
            let field = column.snapshot_field();
            let Some(value) = fields.get(field).filter(|value| !value.is_null()) else {
                continue;
            };
            match Vec::<Task>::deserialize(value) {
                Ok(mut tasks) => {
                    for task in &mut tasks {
                        task.status = column.status();
                    }
                    *self.boards.get_mut(column) = tasks;
                    report.imported.push(column);
                }
                Err(error) => {
                    tracing::error!(field, %error, "error importing data");
                    report.rejected.push(column);
                }
            }
        }

        if !report.imported.is_empty() {
            self.fill_missing_ids();
            self.sync();
        }
        Ok(report)
    }

    pub fn import_json(&mut self, json: &str) -> Result<ImportReport, StoreError> {
        let data: Value = serde_json::from_str(json).map_err(|error| {
            tracing::error!(%error, "error importing data");
            StoreError::InvalidImport(error.to_string())
        })?;
        self.import_snapshot(&data)
    }

    /// Every task in column order, copied.
    pub fn all_tasks(&self) -> Vec<Task> {
        Column::ALL
            .iter()
            .flat_map(|column| self.boards.get(*column).iter().cloned())
            .collect()
    }

    pub fn storage_info(&mut self) -> StorageInfo {
        if !self.storage_available {
            return StorageInfo::unavailable();
        }
        self.storage.info()
    }

    fn next_id(&self) -> Result<TaskId, StoreError> {
        let max = Column::ALL
            .iter()
            .flat_map(|column| self.boards.get(*column))
            .filter_map(|task| task.id)
            .max();
        match max {
            None => Ok(TaskId(1)),
            Some(TaskId(id)) => id.checked_add(1).map(TaskId).ok_or_else(|| {
                tracing::error!(max_id = id, "task id space exhausted");
                StoreError::IdSpaceExhausted(TaskId(id))
            }),
        }
    }

    /// Gives every id-less task the next free id, in column order. Returns
    /// whether anything changed.
    fn fill_missing_ids(&mut self) -> bool {
        let mut changed = false;
        for column in Column::ALL {
            for index in 0..self.boards.get(column).len() {
                if self.boards.get(column)[index].has_id() {
                    continue;
                }
                let Ok(id) = self.next_id() else {
                    return changed;
                };
                self.boards.get_mut(column)[index].id = Some(id);
                changed = true;
            }
        }
        changed
    }

    fn locate(&self, id: TaskId) -> Option<(Column, usize)> {
        Column::ALL.iter().find_map(|column| {
            self.boards
                .get(*column)
                .iter()
                .position(|task| task.id == Some(id))
                .map(|index| (*column, index))
        })
    }

    fn sync(&mut self) {
        if self.storage_available {
            self.storage.save_all(&self.boards);
        }
    }
}

fn resolve_column(column_id: &str) -> Result<Column, StoreError> {
    Column::from_id(column_id).ok_or_else(|| {
        tracing::error!(column = column_id, "invalid board type");
        StoreError::UnknownColumn(column_id.to_string())
    })
}

fn invalid_position(index: usize, column: Column) -> StoreError {
    tracing::error!(index, %column, "drag position out of range");
    StoreError::InvalidPosition {
        index,
        column: column.id().to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Cloneable handle that serializes mutations from several callers.
pub struct SharedTaskStore<S> {
    inner: Arc<Mutex<TaskStore<S>>>,
}

impl<S> Clone for SharedTaskStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStore> SharedTaskStore<S> {
    pub fn new(store: TaskStore<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Runs `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut TaskStore<S>) -> R) -> R {
        let mut store = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut store)
    }
}
