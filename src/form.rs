//! Modal two-field task editor.
//!
//! A form walks `TitleActive -> DescriptionActive -> Complete`, one step per
//! field submit. Reaching `Complete` yields exactly one [`TaskEvent`]; the
//! form is finished after that and ignores further input.

use crate::types::{Stage, Task, TaskDraft, TaskEvent, TaskId};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FormMode {
    Create,
    Edit { id: TaskId, position: usize },
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FormState {
    TitleActive,
    DescriptionActive,
    Complete,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormInput {
    Char(char),
    Backspace,
    Submit,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormEffect {
    None,
    Completed(TaskEvent),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Form {
    mode: FormMode,
    stage: Stage,
    title: String,
    description: String,
    state: FormState,
    viewport: (u16, u16),
}

impl Default for Form {
    fn default() -> Self {
        Self::create(Stage::Todo)
    }
}

impl Form {
    pub fn create(stage: Stage) -> Self {
        Self {
            mode: FormMode::Create,
            stage,
            title: String::new(),
            description: String::new(),
            state: FormState::TitleActive,
            viewport: (0, 0),
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            mode: FormMode::Edit {
                id: task.id,
                position: task.position,
            },
            stage: task.stage,
            title: task.title.clone(),
            description: task.description.clone(),
            state: FormState::TitleActive,
            viewport: (0, 0),
        }
    }

    pub fn with_viewport(mut self, (width, height): (u16, u16)) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_complete(&self) -> bool {
        self.state == FormState::Complete
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "New Task",
            FormMode::Edit { .. } => "Edit Task",
        }
    }

    pub fn viewport(&self) -> (u16, u16) {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
    }

    pub fn handle(&mut self, input: FormInput) -> FormEffect {
        match input {
            FormInput::Char(ch) => {
                self.insert_char(ch);
                FormEffect::None
            }
            FormInput::Backspace => {
                self.backspace();
                FormEffect::None
            }
            FormInput::Submit => self
                .submit_field()
                .map_or(FormEffect::None, FormEffect::Completed),
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        if let Some(field) = self.active_field_mut() {
            field.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.active_field_mut() {
            field.pop();
        }
    }

    /// Advances to the next field, or completes the form from the last one.
    pub fn submit_field(&mut self) -> Option<TaskEvent> {
        match self.state {
            FormState::TitleActive => {
                self.state = FormState::DescriptionActive;
                None
            }
            FormState::DescriptionActive => {
                self.state = FormState::Complete;
                Some(self.to_event())
            }
            FormState::Complete => None,
        }
    }

    fn to_event(&self) -> TaskEvent {
        match self.mode {
            FormMode::Create => TaskEvent::Created(TaskDraft {
                title: self.title.clone(),
                description: self.description.clone(),
                stage: self.stage,
            }),
            FormMode::Edit { id, position } => TaskEvent::Edited(Task {
                id,
                title: self.title.clone(),
                description: self.description.clone(),
                stage: self.stage,
                position,
            }),
        }
    }

    fn active_field_mut(&mut self) -> Option<&mut String> {
        match self.state {
            FormState::TitleActive => Some(&mut self.title),
            FormState::DescriptionActive => Some(&mut self.description),
            FormState::Complete => None,
        }
    }
}
