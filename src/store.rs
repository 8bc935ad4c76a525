use anyhow::Result;

use crate::types::{Stage, TaskId, TaskRecord};

/// Durable task records consumed by the board.
///
/// Every call is synchronous and completes before the next input event is
/// processed. Mutations of an id that does not name a live row fail.
pub trait TaskStore {
    /// Inserts a row without a deletion marker and returns its new id.
    fn insert_task(&self, title: &str, description: &str, stage: Stage) -> Result<TaskId>;

    /// Changes the stage of a row; title and description are untouched.
    fn update_task_stage(&self, id: TaskId, stage: Stage) -> Result<()>;

    /// Changes title and description of a row; the stage is untouched.
    fn update_task_fields(&self, id: TaskId, title: &str, description: &str) -> Result<()>;

    /// Stamps the deletion marker. The row is retained.
    fn soft_delete_task(&self, id: TaskId) -> Result<()>;

    /// All rows without a deletion marker, in insertion order.
    fn list_active_tasks(&self) -> Result<Vec<TaskRecord>>;
}

impl<T: TaskStore + ?Sized> TaskStore for &T {
    fn insert_task(&self, title: &str, description: &str, stage: Stage) -> Result<TaskId> {
        (**self).insert_task(title, description, stage)
    }

    fn update_task_stage(&self, id: TaskId, stage: Stage) -> Result<()> {
        (**self).update_task_stage(id, stage)
    }

    fn update_task_fields(&self, id: TaskId, title: &str, description: &str) -> Result<()> {
        (**self).update_task_fields(id, title, description)
    }

    fn soft_delete_task(&self, id: TaskId) -> Result<()> {
        (**self).soft_delete_task(id)
    }

    fn list_active_tasks(&self) -> Result<Vec<TaskRecord>> {
        (**self).list_active_tasks()
    }
}
