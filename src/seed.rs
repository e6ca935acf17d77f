//! Sample tasks shown on a fresh board.

use crate::storage::Boards;
use crate::task::{Assignee, Priority, Status, Task, TaskId};

const AVATAR_SVG: &str =
    "https://gw.alipayobjects.com/zos/antfincdn/aPkFc8Sj7n/method-draw-image.svg";
const AVATAR_JPEG: &str = "https://07akioni.oss-cn-beijing.aliyuncs.com/07akioni.jpeg";

fn team() -> Vec<Assignee> {
    [
        ("Leonardo DiCaprio", AVATAR_SVG),
        ("Jennifer Lawrence", AVATAR_JPEG),
        ("Audrey Hepburn", AVATAR_SVG),
        ("Anne Hathaway", AVATAR_JPEG),
        ("Taylor Swift", AVATAR_SVG),
    ]
    .into_iter()
    .map(|(name, src)| Assignee {
        name: name.to_string(),
        src: src.to_string(),
    })
    .collect()
}

fn sample(id: u64, title: &str, status: Status, category: &str) -> Task {
    Task {
        id: Some(TaskId(id)),
        title: title.to_string(),
        description: Some(String::new()),
        status,
        due_date: Some("2025-01-01".to_string()),
        priority: Some(Priority::Low),
        progress: None,
        category: Some(category.to_string()),
        created_at: "2024-12-31".to_string(),
        assigned_to: team(),
        images: None,
    }
}

pub fn todos() -> Vec<Task> {
    let mut task = sample(
        343,
        "Map: feature title under the icon disappears after a text search",
        Status::ToDo,
        "feature",
    );
    task.progress = Some(0);
    task.images = Some(vec![
        "https://www.figma.com/community/resource/941f0a6f-d691-47a4-85f8-37c0301fc31b/thumbnail"
            .to_string(),
    ]);
    vec![task]
}

pub fn in_progress() -> Vec<Task> {
    vec![sample(
        1,
        "Map: feature title under the icon disappears after a text search",
        Status::InProgress,
        "bug",
    )]
}

pub fn testing() -> Vec<Task> {
    let mut task = sample(
        2,
        "Search panel keeps the previous query after reset",
        Status::Testing,
        "bug",
    );
    task.priority = Some(Priority::Medium);
    task.progress = Some(80);
    vec![task]
}

pub fn finished() -> Vec<Task> {
    let mut task = sample(
        3,
        "Export board state to JSON",
        Status::Finished,
        "feature",
    );
    task.priority = Some(Priority::High);
    task.progress = Some(100);
    vec![task]
}

/// Fresh copies of every sample collection.
pub fn boards() -> Boards {
    Boards {
        todos: todos(),
        in_progress: in_progress(),
        testing: testing(),
        finished: finished(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Column;
    use std::collections::HashSet;

    #[test]
    fn seed_status_matches_column() {
        let boards = boards();
        for column in Column::ALL {
            assert!(boards
                .get(column)
                .iter()
                .all(|task| task.status == column.status()));
        }
    }

    #[test]
    fn seed_ids_are_unique() {
        let boards = boards();
        let ids: Vec<_> = Column::ALL
            .iter()
            .flat_map(|column| boards.get(*column).iter().map(|task| task.id))
            .collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
        assert!(ids.iter().all(Option::is_some));
    }
}
