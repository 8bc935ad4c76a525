use crate::types::{Stage, Task, TaskId};

/// Ordered tasks of a single stage. Every task's `position` equals its index.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Column {
    stage: Stage,
    tasks: Vec<Task>,
}

impl Column {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            tasks: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Task> {
        self.tasks.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn position_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    /// Index `id` would occupy if the column were listed in store order.
    pub fn store_order_slot(&self, id: TaskId) -> usize {
        self.tasks
            .iter()
            .position(|task| task.id > id)
            .unwrap_or(self.tasks.len())
    }

    /// Inserts `task`, clamping `position` to the end of the column.
    pub fn insert_at(&mut self, position: usize, mut task: Task) -> usize {
        debug_assert_eq!(task.stage, self.stage);
        task.stage = self.stage;

        let position = position.min(self.tasks.len());
        self.tasks.insert(position, task);
        self.renumber_from(position);
        position
    }

    pub fn push(&mut self, task: Task) -> usize {
        self.insert_at(self.tasks.len(), task)
    }

    pub fn remove_at(&mut self, position: usize) -> Option<Task> {
        if position >= self.tasks.len() {
            return None;
        }
        let removed = self.tasks.remove(position);
        self.renumber_from(position);
        Some(removed)
    }

    /// Swaps the entry at `position` for `task`, returning the old entry.
    pub fn replace_at(&mut self, position: usize, mut task: Task) -> Option<Task> {
        let slot = self.tasks.get_mut(position)?;
        debug_assert_eq!(task.stage, self.stage);
        task.stage = self.stage;
        task.position = position;
        Some(std::mem::replace(slot, task))
    }

    fn renumber_from(&mut self, start: usize) {
        for (index, task) in self.tasks.iter_mut().enumerate().skip(start) {
            task.position = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, stage: Stage) -> Task {
        Task {
            id: TaskId(id),
            title: format!("task {id}"),
            description: String::new(),
            stage,
            position: usize::MAX,
        }
    }

    fn assert_contiguous(column: &Column) {
        for (index, task) in column.iter().enumerate() {
            assert_eq!(task.position, index);
            assert_eq!(task.stage, column.stage());
        }
    }

    #[test]
    fn test_insert_at_top_renumbers_siblings() {
        let mut column = Column::new(Stage::Todo);
        column.push(task(1, Stage::Todo));
        column.push(task(2, Stage::Todo));

        let position = column.insert_at(0, task(3, Stage::Todo));

        assert_eq!(position, 0);
        let ids: Vec<i64> = column.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_contiguous(&column);
    }

    #[test]
    fn test_insert_past_end_is_clamped() {
        let mut column = Column::new(Stage::Done);
        column.push(task(1, Stage::Done));

        let position = column.insert_at(42, task(2, Stage::Done));

        assert_eq!(position, 1);
        assert_contiguous(&column);
    }

    #[test]
    fn test_remove_at_closes_the_gap() {
        let mut column = Column::new(Stage::InProgress);
        for id in 1..=4 {
            column.push(task(id, Stage::InProgress));
        }

        let removed = column.remove_at(1);

        assert_eq!(removed.map(|t| t.id), Some(TaskId(2)));
        assert_eq!(column.len(), 3);
        assert_contiguous(&column);
        assert!(column.remove_at(3).is_none());
    }

    #[test]
    fn test_replace_at_keeps_position() {
        let mut column = Column::new(Stage::Todo);
        column.push(task(1, Stage::Todo));
        column.push(task(2, Stage::Todo));

        let mut edited = task(2, Stage::Todo);
        edited.title = "renamed".to_string();
        let old = column.replace_at(1, edited);

        assert_eq!(old.map(|t| t.title), Some("task 2".to_string()));
        assert_eq!(column.get(1).map(|t| t.title.as_str()), Some("renamed"));
        assert_contiguous(&column);
        assert!(column.replace_at(5, task(9, Stage::Todo)).is_none());
    }

    #[test]
    fn test_store_order_slot_follows_ids() {
        let mut column = Column::new(Stage::Done);
        column.push(task(2, Stage::Done));
        column.push(task(5, Stage::Done));

        assert_eq!(column.store_order_slot(TaskId(1)), 0);
        assert_eq!(column.store_order_slot(TaskId(3)), 1);
        assert_eq!(column.store_order_slot(TaskId(9)), 2);
        assert_eq!(Column::new(Stage::Todo).store_order_slot(TaskId(1)), 0);
    }

    #[test]
    fn test_position_of_finds_by_id() {
        let mut column = Column::new(Stage::Todo);
        column.push(task(10, Stage::Todo));
        column.push(task(20, Stage::Todo));

        assert_eq!(column.position_of(TaskId(20)), Some(1));
        assert_eq!(column.position_of(TaskId(30)), None);
    }
}
