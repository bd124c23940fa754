use super::{SortKey, TaskStore, check_index, sort_tasks};
use crate::domain::task::{Task, TaskPatch};
use crate::error::TaskError;

/// Store without a backing file, for tests and the `--memory` flag.
#[derive(Default)]
pub struct InMemoryStore {
    tasks: Vec<Task>,
}

impl InMemoryStore {
    pub fn with_seed(seed: impl IntoIterator<Item = Task>) -> Self {
        let mut store = Self::default();
        store.tasks.extend(seed);
        store
    }
}

impl TaskStore for InMemoryStore {
    fn list(&self) -> &[Task] {
        &self.tasks
    }

    fn add(&mut self, task: Task) -> Result<(), TaskError> {
        self.tasks.push(task);
        Ok(())
    }

    fn update(&mut self, index: usize, patch: TaskPatch) -> Result<Task, TaskError> {
        check_index(index, self.tasks.len())?;
        self.tasks[index].apply(patch)?;
        Ok(self.tasks[index].clone())
    }

    fn delete(&mut self, index: usize) -> Result<Task, TaskError> {
        check_index(index, self.tasks.len())?;
        Ok(self.tasks.remove(index))
    }

    fn mark_complete(&mut self, index: usize) -> Result<Task, TaskError> {
        check_index(index, self.tasks.len())?;
        self.tasks[index].mark_complete();
        Ok(self.tasks[index].clone())
    }

    fn sort(&mut self, by: SortKey) -> Result<(), TaskError> {
        sort_tasks(&mut self.tasks, by);
        Ok(())
    }
}
