use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{SortKey, TaskStore, check_index, sort_tasks};
use crate::domain::task::{Task, TaskPatch};
use crate::error::TaskError;

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct FileContentsRef<'a> {
    version: u32,
    tasks: &'a [Task],
}

#[derive(Deserialize)]
struct FileContents {
    version: u32,
    tasks: Vec<Task>,
}

/// Task store backed by a single JSON file. The in-memory sequence and the
/// file contents match between operations: every mutation rewrites the whole
/// file before it returns, and a failed write changes neither.
pub struct JsonFileStore {
    path: PathBuf,
    tasks: Vec<Task>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TaskError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                storage_error(&path, format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let tasks = load_tasks(&path)?;
        Ok(Self { path, tasks })
    }

    /// Writes `tasks` to disk, then commits them as the new in-memory
    /// sequence.
    fn commit(&mut self, tasks: Vec<Task>) -> Result<(), TaskError> {
        persist(&self.path, &tasks)?;
        self.tasks = tasks;
        Ok(())
    }
}

impl TaskStore for JsonFileStore {
    fn list(&self) -> &[Task] {
        &self.tasks
    }

    fn add(&mut self, task: Task) -> Result<(), TaskError> {
        let mut staged = self.tasks.clone();
        staged.push(task);
        self.commit(staged)
    }

    fn update(&mut self, index: usize, patch: TaskPatch) -> Result<Task, TaskError> {
        check_index(index, self.tasks.len())?;
        let mut staged = self.tasks.clone();
        staged[index].apply(patch)?;
        let updated = staged[index].clone();
        self.commit(staged)?;
        Ok(updated)
    }

    fn delete(&mut self, index: usize) -> Result<Task, TaskError> {
        check_index(index, self.tasks.len())?;
        let mut staged = self.tasks.clone();
        let removed = staged.remove(index);
        self.commit(staged)?;
        Ok(removed)
    }

    fn mark_complete(&mut self, index: usize) -> Result<Task, TaskError> {
        check_index(index, self.tasks.len())?;
        let mut staged = self.tasks.clone();
        staged[index].mark_complete();
        let completed = staged[index].clone();
        self.commit(staged)?;
        Ok(completed)
    }

    fn sort(&mut self, by: SortKey) -> Result<(), TaskError> {
        let mut staged = self.tasks.clone();
        sort_tasks(&mut staged, by);
        self.commit(staged)
    }
}

fn load_tasks(path: &Path) -> Result<Vec<Task>, TaskError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        // A store that has never been persisted starts empty.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(storage_error(path, format!("failed to read: {e}"))),
    };
    let contents: FileContents = serde_json::from_str(&raw)
        .map_err(|e| storage_error(path, format!("corrupt task file: {e}")))?;
    if contents.version != FORMAT_VERSION {
        return Err(storage_error(
            path,
            format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                contents.version
            ),
        ));
    }
    Ok(contents.tasks)
}

/// Writes via a sibling temp file and renames it into place, so an
/// interrupted write never leaves a half-written task file behind.
fn persist(path: &Path, tasks: &[Task]) -> Result<(), TaskError> {
    let contents = FileContentsRef {
        version: FORMAT_VERSION,
        tasks,
    };
    let json = serde_json::to_string_pretty(&contents)
        .map_err(|e| storage_error(path, format!("failed to serialize: {e}")))?;
    let tmp = tmp_path(path);
    fs::write(&tmp, json).map_err(|e| storage_error(path, format!("failed to write: {e}")))?;
    fs::rename(&tmp, path).map_err(|e| storage_error(path, format!("failed to replace: {e}")))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn storage_error(path: &Path, message: String) -> TaskError {
    TaskError::Storage {
        path: path.to_path_buf(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;
    use time::{Date, OffsetDateTime};

    use super::*;

    fn task(title: &str, priority: u8, due: Option<Date>) -> Task {
        Task::new(title, None, priority, due).unwrap()
    }

    fn task_created_at(title: &str, unix_secs: i64) -> Task {
        let mut task = task(title, 0, None);
        task.created_at = OffsetDateTime::from_unix_timestamp(unix_secs).unwrap();
        task
    }

    fn titles(store: &JsonFileStore) -> Vec<&str> {
        store.list().iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn add_appends_at_the_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        store.add(task("first", 0, None)).unwrap();
        store.add(task("second", 0, None)).unwrap();
        assert_eq!(titles(&store), ["first", "second"]);
    }

    #[test]
    fn round_trip_across_instances_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store
            .add(Task::new("Pay rent", Some("wire by the 1st".into()), 3, Some(date!(2024 - 01 - 01))).unwrap())
            .unwrap();
        store.add(task("Buy milk", 0, None)).unwrap();
        store.mark_complete(1).unwrap();
        let before = store.list().to_vec();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list(), before.as_slice());
    }

    #[test]
    fn delete_shifts_later_indices_down() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        for title in ["a", "b", "c"] {
            store.add(task(title, 0, None)).unwrap();
        }
        let removed = store.delete(1).unwrap();
        assert_eq!(removed.title, "b");
        assert_eq!(titles(&store), ["a", "c"]);
    }

    #[test]
    fn priority_sort_is_stable() {
        // add("Buy milk", p=2), add("Pay rent", p=1, due), add("Call Bob", p=1)
        // sorted by priority must keep the two p=1 tasks in insertion order.
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        store.add(task("Buy milk", 2, None)).unwrap();
        store.add(task("Pay rent", 1, Some(date!(2024 - 01 - 01)))).unwrap();
        store.add(task("Call Bob", 1, None)).unwrap();

        store.sort(SortKey::Priority).unwrap();
        assert_eq!(titles(&store), ["Pay rent", "Call Bob", "Buy milk"]);
    }

    #[test]
    fn due_date_sort_puts_undated_tasks_last() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        store.add(task("someday", 0, None)).unwrap();
        store.add(task("rent", 0, Some(date!(2024 - 01 - 01)))).unwrap();
        store.add(task("taxes", 0, Some(date!(2024 - 04 - 15)))).unwrap();

        store.sort(SortKey::DueDate).unwrap();
        assert_eq!(titles(&store), ["rent", "taxes", "someday"]);
    }

    #[test]
    fn creation_date_sort_restores_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        store.add(task_created_at("oldest", 1_000)).unwrap();
        store.add(task_created_at("middle", 2_000)).unwrap();
        store.add(task_created_at("newest", 3_000)).unwrap();

        store.sort(SortKey::DueDate).unwrap();
        store.sort(SortKey::CreationDate).unwrap();
        assert_eq!(titles(&store), ["oldest", "middle", "newest"]);
    }

    #[test]
    fn mark_complete_twice_is_the_same_as_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        store.add(task("Buy milk", 0, None)).unwrap();

        store.mark_complete(0).unwrap();
        let once = store.list().to_vec();
        store.mark_complete(0).unwrap();
        assert_eq!(store.list(), once.as_slice());
    }

    #[test]
    fn update_patches_fields_but_never_created_at() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        store.add(task("Buy milk", 2, None)).unwrap();
        let created_at = store.list()[0].created_at;

        let updated = store
            .update(
                0,
                TaskPatch {
                    title: Some("Buy oat milk".into()),
                    description: Some("the 1L carton".into()),
                    priority: Some(4),
                    due: Some(date!(2024 - 02 - 02)),
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Buy oat milk");
        assert_eq!(updated.priority, 4);
        assert_eq!(updated.created_at, created_at);
    }

    #[test]
    fn invalid_patch_leaves_memory_and_disk_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.add(task("Buy milk", 0, None)).unwrap();
        let before = store.list().to_vec();

        let err = store.update(
            0,
            TaskPatch {
                title: Some("   ".into()),
                ..TaskPatch::default()
            },
        );
        assert!(matches!(err, Err(TaskError::Validation(_))));
        assert_eq!(store.list(), before.as_slice());
        assert_eq!(JsonFileStore::open(&path).unwrap().list(), before.as_slice());
    }

    #[test]
    fn out_of_bounds_fails_and_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.add(task("only", 0, None)).unwrap();
        let before = store.list().to_vec();

        assert!(matches!(
            store.update(1, TaskPatch::default()),
            Err(TaskError::IndexOutOfBounds { index: 1, len: 1 })
        ));
        assert!(matches!(
            store.delete(5),
            Err(TaskError::IndexOutOfBounds { index: 5, len: 1 })
        ));
        assert!(matches!(
            store.mark_complete(1),
            Err(TaskError::IndexOutOfBounds { index: 1, len: 1 })
        ));
        assert_eq!(store.list(), before.as_slice());
        assert_eq!(JsonFileStore::open(&path).unwrap().list(), before.as_slice());
    }

    #[test]
    fn corrupt_file_fails_fast_instead_of_discarding_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "not json at all").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(TaskError::Storage { .. })
        ));
    }

    #[test]
    fn unsupported_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"{"version": 2, "tasks": []}"#).unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(TaskError::Storage { .. })
        ));
    }
}
