use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column-derived state label, stored redundantly on every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    ToDo,
    InProgress,
    Testing,
    Finished,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::ToDo => "to-do",
            Status::InProgress => "in-progress",
            Status::Testing => "testing",
            Status::Finished => "finished",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub name: String,
    /// Avatar image URL.
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// `None` until the store assigns one on insertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Percent complete, clamped to 0..=100 on read.
    #[serde(
        default,
        deserialize_with = "clamped_progress",
        skip_serializing_if = "Option::is_none"
    )]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub assigned_to: Vec<Assignee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl Task {
    /// A bare task with no id, stamped with the given creation date.
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            status: Status::default(),
            due_date: None,
            priority: None,
            progress: None,
            category: None,
            created_at: created_at.format("%Y-%m-%d").to_string(),
            assigned_to: Vec::new(),
            images: None,
        }
    }

    /// Id 0 counts as missing, same as no id at all.
    pub fn has_id(&self) -> bool {
        matches!(self.id, Some(TaskId(id)) if id != 0)
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(TaskId(id));
        self
    }

    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}

fn clamped_progress<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let progress = Option::<f64>::deserialize(deserializer)?;
    Ok(progress.map(|p| p.clamp(0.0, 100.0).round() as u8))
}

/// The closed set of board columns the presentation layer addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Todos,
    InProgress,
    Testing,
    Finished,
}

impl Column {
    /// Fixed display and persistence order.
    pub const ALL: [Column; 4] = [
        Column::Todos,
        Column::InProgress,
        Column::Testing,
        Column::Finished,
    ];

    pub fn from_id(id: &str) -> Option<Column> {
        match id {
            "todos" => Some(Column::Todos),
            "in-progress" => Some(Column::InProgress),
            "testing" => Some(Column::Testing),
            "finished" => Some(Column::Finished),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Column::Todos => "todos",
            Column::InProgress => "in-progress",
            Column::Testing => "testing",
            Column::Finished => "finished",
        }
    }

    pub fn status(self) -> Status {
        match self {
            Column::Todos => Status::ToDo,
            Column::InProgress => Status::InProgress,
            Column::Testing => Status::Testing,
            Column::Finished => Status::Finished,
        }
    }

    /// Persistence key for this column's collection.
    pub fn storage_key(self) -> &'static str {
        match self {
            Column::Todos => "kanban_todos",
            Column::InProgress => "kanban_in_progress",
            Column::Testing => "kanban_testing",
            Column::Finished => "kanban_finished",
        }
    }

    /// Field name used in import/export payloads.
    pub fn snapshot_field(self) -> &'static str {
        match self {
            Column::Todos => "todos",
            Column::InProgress => "inProgress",
            Column::Testing => "testing",
            Column::Finished => "finished",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Column::Todos => "To Do",
            Column::InProgress => "In Progress",
            Column::Testing => "Testing",
            Column::Finished => "Finished",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Column::Todos => 0,
            Column::InProgress => 1,
            Column::Testing => 2,
            Column::Finished => 3,
        }
    }

    pub fn next(self) -> Option<Column> {
        Column::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Column> {
        self.index().checked_sub(1).map(|i| Column::ALL[i])
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("todos", Column::Todos, Status::ToDo)]
    #[case("in-progress", Column::InProgress, Status::InProgress)]
    #[case("testing", Column::Testing, Status::Testing)]
    #[case("finished", Column::Finished, Status::Finished)]
    fn column_ids_map_to_status(#[case] id: &str, #[case] column: Column, #[case] status: Status) {
        assert_eq!(Column::from_id(id), Some(column));
        assert_eq!(column.id(), id);
        assert_eq!(column.status(), status);
    }

    #[rstest]
    #[case("")]
    #[case("done")]
    #[case("Todos")]
    #[case("test")]
    fn unknown_column_ids_are_rejected(#[case] id: &str) {
        assert_eq!(Column::from_id(id), None);
    }

    #[test]
    fn column_neighbours_follow_board_order() {
        assert_eq!(Column::Todos.previous(), None);
        assert_eq!(Column::Todos.next(), Some(Column::InProgress));
        assert_eq!(Column::Testing.previous(), Some(Column::InProgress));
        assert_eq!(Column::Finished.next(), None);
    }

    #[test]
    fn task_uses_camel_case_wire_shape() {
        let task = Task::new("Ship it", Utc::now())
            .with_id(7)
            .with_due_date("2025-01-01")
            .with_priority(Priority::High)
            .with_status(Status::InProgress);

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["status"], "in-progress");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["dueDate"], "2025-01-01");
        assert!(value["assignedTo"].as_array().unwrap().is_empty());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn task_parses_stored_record() {
        let raw = r#"{
            "id": 343,
            "title": "Map search",
            "description": "",
            "status": "to-do",
            "dueDate": "2025-01-01",
            "priority": "low",
            "progress": 0,
            "category": "feature",
            "createdAt": "2024-12-31",
            "assignedTo": [{ "name": "Ann", "src": "https://example.com/a.svg" }]
        }"#;

        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.id, Some(TaskId(343)));
        assert_eq!(task.status, Status::ToDo);
        assert_eq!(task.priority, Some(Priority::Low));
        assert_eq!(task.assigned_to.len(), 1);
    }

    #[rstest]
    #[case("0", Some(0))]
    #[case("42", Some(42))]
    #[case("101", Some(100))]
    #[case("300", Some(100))]
    #[case("-5", Some(0))]
    #[case("37.6", Some(38))]
    #[case("null", None)]
    fn progress_is_clamped_to_percent(#[case] raw: &str, #[case] expected: Option<u8>) {
        let json = format!(r#"{{ "title": "x", "createdAt": "2024-12-31", "progress": {raw} }}"#);
        let task: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task.progress, expected);
    }

    #[rstest]
    #[case(None, false)]
    #[case(Some(0), false)]
    #[case(Some(5), true)]
    fn zero_id_counts_as_missing(#[case] id: Option<u64>, #[case] expected: bool) {
        let mut task = Task::new("x", Utc::now());
        task.id = id.map(TaskId);
        assert_eq!(task.has_id(), expected);
    }

    #[test]
    fn legacy_test_status_is_not_coerced() {
        let raw = r#"{ "id": 1, "title": "x", "status": "test", "createdAt": "2024-12-31" }"#;
        assert!(serde_json::from_str::<Task>(raw).is_err());
    }
}
