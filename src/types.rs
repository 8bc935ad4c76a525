use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Store-assigned identity of a persisted task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Todo,
    InProgress,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Todo, Stage::InProgress, Stage::Done];

    pub fn index(self) -> usize {
        match self {
            Stage::Todo => 0,
            Stage::InProgress => 1,
            Stage::Done => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Todo => "todo",
            Stage::InProgress => "in_progress",
            Stage::Done => "done",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Todo => "To Do",
            Stage::InProgress => "In Progress",
            Stage::Done => "Done",
        }
    }

    /// Next column in the focus ring; Done wraps to Todo.
    pub fn next_wrapping(self) -> Self {
        self.offset_wrapping(1)
    }

    /// Previous column in the focus ring; Todo wraps to Done.
    pub fn prev_wrapping(self) -> Self {
        self.offset_wrapping(-1)
    }

    /// Next workflow stage; Done stays Done.
    pub fn advanced(self) -> Self {
        self.offset_clamped(1)
    }

    /// Previous workflow stage; Todo stays Todo.
    pub fn retreated(self) -> Self {
        self.offset_clamped(-1)
    }

    fn offset_wrapping(self, delta: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let index = (self.index() as isize + delta).rem_euclid(len);
        Self::ALL[index as usize]
    }

    fn offset_clamped(self, delta: isize) -> Self {
        let last = Self::ALL.len() as isize - 1;
        let index = (self.index() as isize + delta).clamp(0, last);
        Self::ALL[index as usize]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "todo" | "to_do" | "0" => Ok(Stage::Todo),
            "in_progress" | "inprogress" | "doing" | "1" => Ok(Stage::InProgress),
            "done" | "2" => Ok(Stage::Done),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub stage: Stage,
    pub position: usize,
}

impl Task {
    pub fn advance_stage(&mut self) {
        self.stage = self.stage.advanced();
    }

    pub fn retreat_stage(&mut self) {
        self.stage = self.stage.retreated();
    }
}

/// A task the form has assembled but the store has not yet seen.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub stage: Stage,
}

/// Row shape returned by the store for non-deleted tasks.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub stage: Stage,
    pub inserted_at: String,
}

impl TaskRecord {
    pub fn into_task(self, position: usize) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            stage: self.stage,
            position,
        }
    }
}

/// Completion payload of the form, routed back into the board.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TaskEvent {
    Created(TaskDraft),
    Edited(Task),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    Forward,
    Backward,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_at(stage: Stage) -> Task {
        Task {
            id: TaskId(1),
            title: "Write docs".to_string(),
            description: String::new(),
            stage,
            position: 0,
        }
    }

    #[test]
    fn test_advance_stage_clamps_at_done() {
        let mut task = task_at(Stage::InProgress);
        task.advance_stage();
        assert_eq!(task.stage, Stage::Done);
        task.advance_stage();
        assert_eq!(task.stage, Stage::Done);
    }

    #[test]
    fn test_retreat_stage_clamps_at_todo() {
        let mut task = task_at(Stage::InProgress);
        task.retreat_stage();
        assert_eq!(task.stage, Stage::Todo);
        task.retreat_stage();
        assert_eq!(task.stage, Stage::Todo);
    }

    #[test]
    fn test_focus_ring_wraps_in_both_directions() {
        assert_eq!(Stage::Done.next_wrapping(), Stage::Todo);
        assert_eq!(Stage::Todo.prev_wrapping(), Stage::Done);
        assert_eq!(Stage::Todo.next_wrapping(), Stage::InProgress);
        assert_eq!(Stage::InProgress.prev_wrapping(), Stage::Todo);
    }

    #[test]
    fn test_three_steps_around_the_ring_return_home() {
        for stage in Stage::ALL {
            let mut current = stage;
            for _ in 0..Stage::ALL.len() {
                current = current.next_wrapping();
            }
            assert_eq!(current, stage);
        }
    }

    #[test]
    fn test_stage_index_round_trips() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_index(stage.index()), Some(stage));
        }
        assert_eq!(Stage::from_index(3), None);
    }

    #[test]
    fn test_stage_from_str_accepts_common_spellings() {
        assert_eq!("todo".parse(), Ok(Stage::Todo));
        assert_eq!("In Progress".parse(), Ok(Stage::InProgress));
        assert_eq!("in-progress".parse(), Ok(Stage::InProgress));
        assert_eq!("DONE".parse(), Ok(Stage::Done));
        assert_eq!("2".parse(), Ok(Stage::Done));
        assert_eq!("later".parse::<Stage>(), Err(()));
    }
}
