//! Three-column task board.
//!
//! The board owns one [`Column`] per [`Stage`], the focused column, and the
//! selection inside each column. Every mutation that has to be persisted
//! calls the store first and touches the columns only once the store call
//! has succeeded, so a failed write leaves the board exactly as it was.

mod column;

pub use self::column::Column;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::store::TaskStore;
use crate::types::{Direction, Stage, Task, TaskDraft, TaskEvent, TaskId};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BoardCommand {
    FocusNext,
    FocusPrev,
    SelectNext,
    SelectPrev,
    Move(Direction),
    DeleteSelected,
    BeginCreate,
    BeginEdit,
    Reload,
}

/// What the dispatcher has to do after the board handled a command.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BoardEffect {
    None,
    BeginCreate(Stage),
    BeginEdit(Task),
}

#[derive(Debug, Clone)]
pub struct Board {
    columns: [Column; 3],
    selected: [usize; 3],
    focused: Stage,
    loaded: bool,
    viewport: (u16, u16),
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            columns: Stage::ALL.map(Column::new),
            selected: [0; 3],
            focused: Stage::Todo,
            loaded: false,
            viewport: (0, 0),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn focused(&self) -> Stage {
        self.focused
    }

    pub fn column(&self, stage: Stage) -> &Column {
        &self.columns[stage.index()]
    }

    pub fn selected_index(&self, stage: Stage) -> Option<usize> {
        let column = self.column(stage);
        if column.is_empty() {
            None
        } else {
            Some(self.selected[stage.index()].min(column.len() - 1))
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let index = self.selected_index(self.focused)?;
        self.column(self.focused).get(index)
    }

    pub fn viewport(&self) -> (u16, u16) {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    /// Replaces every column with the store's live tasks, in store order.
    pub fn load(&mut self, store: &impl TaskStore) -> Result<()> {
        let records = store
            .list_active_tasks()
            .context("failed to read tasks from store")?;

        let mut columns = Stage::ALL.map(Column::new);
        for record in records {
            let column = &mut columns[record.stage.index()];
            let position = column.len();
            column.push(record.into_task(position));
        }

        self.columns = columns;
        for stage in Stage::ALL {
            self.clamp_selection(stage);
        }
        self.loaded = true;
        info!(tasks = self.task_count(), "board loaded");
        Ok(())
    }

    pub fn handle(&mut self, command: BoardCommand, store: &impl TaskStore) -> Result<BoardEffect> {
        match command {
            BoardCommand::FocusNext => self.focus_next(),
            BoardCommand::FocusPrev => self.focus_prev(),
            BoardCommand::SelectNext => self.select_next(),
            BoardCommand::SelectPrev => self.select_prev(),
            BoardCommand::Move(direction) => self.move_selected(direction, store)?,
            BoardCommand::DeleteSelected => self.delete_selected(store)?,
            BoardCommand::BeginCreate => return Ok(BoardEffect::BeginCreate(self.begin_create())),
            BoardCommand::BeginEdit => {
                return Ok(self
                    .begin_edit()
                    .map_or(BoardEffect::None, BoardEffect::BeginEdit));
            }
            BoardCommand::Reload => self.load(store)?,
        }
        Ok(BoardEffect::None)
    }

    pub fn focus_next(&mut self) {
        self.focused = self.focused.next_wrapping();
    }

    pub fn focus_prev(&mut self) {
        self.focused = self.focused.prev_wrapping();
    }

    pub fn select_next(&mut self) {
        let stage = self.focused;
        self.selected[stage.index()] = self.selected[stage.index()].saturating_add(1);
        self.clamp_selection(stage);
    }

    pub fn select_prev(&mut self) {
        let stage = self.focused;
        self.clamp_selection(stage);
        self.selected[stage.index()] = self.selected[stage.index()].saturating_sub(1);
    }

    /// Moves the selected task one stage along `direction`.
    ///
    /// The task lands where a fresh load would put it, keeping the
    /// destination column in store order.
    ///
    /// Stage changes clamp at both ends, so moving a Done task forward or a
    /// Todo task backward does nothing and never reaches the store.
    pub fn move_selected(&mut self, direction: Direction, store: &impl TaskStore) -> Result<()> {
        let Some(index) = self.selected_index(self.focused) else {
            return Ok(());
        };
        let Some(original) = self.column(self.focused).get(index) else {
            return Ok(());
        };

        let mut moved = original.clone();
        match direction {
            Direction::Forward => moved.advance_stage(),
            Direction::Backward => moved.retreat_stage(),
        }
        if moved.stage == original.stage {
            return Ok(());
        }

        store
            .update_task_stage(moved.id, moved.stage)
            .with_context(|| format!("failed to move task {} to {}", moved.id, moved.stage))?;

        let source = self.focused;
        let destination = moved.stage;
        self.columns[source.index()].remove_at(index);
        self.clamp_selection(source);
        let slot = self.column(destination).store_order_slot(moved.id);
        self.columns[destination.index()].insert_at(slot, moved);
        debug!(from = source.as_str(), to = destination.as_str(), "moved task");
        Ok(())
    }

    pub fn delete_selected(&mut self, store: &impl TaskStore) -> Result<()> {
        let Some(index) = self.selected_index(self.focused) else {
            return Ok(());
        };
        let Some(task) = self.column(self.focused).get(index) else {
            return Ok(());
        };
        let id = task.id;

        store
            .soft_delete_task(id)
            .with_context(|| format!("failed to delete task {id}"))?;

        let stage = self.focused;
        self.columns[stage.index()].remove_at(index);
        self.clamp_selection(stage);
        debug!(%id, "deleted task");
        Ok(())
    }

    /// Stage a new task will be created in.
    pub fn begin_create(&self) -> Stage {
        self.focused
    }

    pub fn begin_edit(&self) -> Option<Task> {
        self.selected_task().cloned()
    }

    pub fn apply(&mut self, event: TaskEvent, store: &impl TaskStore) -> Result<()> {
        match event {
            TaskEvent::Created(draft) => self.apply_created(draft, store).map(|_| ()),
            TaskEvent::Edited(task) => self.apply_edited(task, store),
        }
    }

    /// Persists `draft` and places it at the top of its stage's column.
    pub fn apply_created(&mut self, draft: TaskDraft, store: &impl TaskStore) -> Result<TaskId> {
        let id = store
            .insert_task(&draft.title, &draft.description, draft.stage)
            .context("failed to create task")?;

        let task = Task {
            id,
            title: draft.title,
            description: draft.description,
            stage: draft.stage,
            position: 0,
        };
        let stage = task.stage;
        self.columns[stage.index()].insert_at(0, task);
        self.selected[stage.index()] = 0;
        debug!(%id, stage = stage.as_str(), "created task");
        Ok(id)
    }

    /// Persists new title and description and swaps the entry in place.
    ///
    /// The carried `stage` and `position` are trusted only while they still
    /// point at the same task; otherwise the board is searched by id. The task
    /// stays in the column it was edited from.
    pub fn apply_edited(&mut self, task: Task, store: &impl TaskStore) -> Result<()> {
        let id = task.id;
        let carried = self
            .column(task.stage)
            .get(task.position)
            .filter(|current| current.id == id)
            .map(|_| (task.stage, task.position));
        let Some((stage, position)) = carried.or_else(|| self.locate(id)) else {
            bail!("task {id} is no longer on the board");
        };

        store
            .update_task_fields(id, &task.title, &task.description)
            .with_context(|| format!("failed to edit task {id}"))?;

        let edited = Task {
            stage,
            position,
            ..task
        };
        self.columns[stage.index()].replace_at(position, edited);
        debug!(%id, "edited task");
        Ok(())
    }

    fn locate(&self, id: TaskId) -> Option<(Stage, usize)> {
        Stage::ALL.into_iter().find_map(|stage| {
            self.column(stage)
                .position_of(id)
                .map(|position| (stage, position))
        })
    }

    fn clamp_selection(&mut self, stage: Stage) {
        let len = self.column(stage).len();
        let selected = &mut self.selected[stage.index()];
        *selected = (*selected).min(len.saturating_sub(1));
    }
}
