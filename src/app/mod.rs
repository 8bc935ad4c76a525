//! Top-level dispatcher.
//!
//! `App` owns the board, the form, and the store, and routes each message to
//! whichever of the two views is active. Recoverable store failures end up
//! as a footer notice; the in-memory state is left as it was.

use std::fmt::Display;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, warn};

use crate::board::{Board, BoardCommand, BoardEffect};
use crate::db::Database;
use crate::form::{Form, FormEffect, FormInput};
use crate::keybindings::{KeyAction, KeyContext, Keybindings};
use crate::store::TaskStore;
use crate::types::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Key(KeyEvent),
    Resize(u16, u16),
    Quit,
    FocusNext,
    FocusPrev,
    SelectNext,
    SelectPrev,
    MoveForward,
    MoveBackward,
    DeleteTask,
    NewTask,
    EditTask,
    Reload,
    SubmitField,
    InputChar(char),
    EraseChar,
}

impl From<KeyAction> for Message {
    fn from(action: KeyAction) -> Self {
        match action {
            KeyAction::Quit => Message::Quit,
            KeyAction::FocusNext => Message::FocusNext,
            KeyAction::FocusPrev => Message::FocusPrev,
            KeyAction::SelectNext => Message::SelectNext,
            KeyAction::SelectPrev => Message::SelectPrev,
            KeyAction::MoveForward => Message::MoveForward,
            KeyAction::MoveBackward => Message::MoveBackward,
            KeyAction::DeleteTask => Message::DeleteTask,
            KeyAction::NewTask => Message::NewTask,
            KeyAction::EditTask => Message::EditTask,
            KeyAction::Reload => Message::Reload,
            KeyAction::SubmitField => Message::SubmitField,
            KeyAction::EraseChar => Message::EraseChar,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ActiveView {
    Board,
    Form,
}

impl ActiveView {
    fn key_context(self) -> KeyContext {
        match self {
            ActiveView::Board => KeyContext::Board,
            ActiveView::Form => KeyContext::Form,
        }
    }
}

pub struct App<S = Database> {
    store: S,
    board: Board,
    form: Form,
    active: ActiveView,
    keybindings: Keybindings,
    notice: Option<String>,
    viewport: (u16, u16),
    should_quit: bool,
}

impl<S: TaskStore> App<S> {
    /// Builds the dispatcher and loads the board eagerly.
    ///
    /// A failed first load is not fatal: the board stays unloaded and the
    /// reload command can retry.
    pub fn new(store: S, keybindings: Keybindings) -> Self {
        let mut app = Self {
            store,
            board: Board::new(),
            form: Form::default(),
            active: ActiveView::Board,
            keybindings,
            notice: None,
            viewport: (0, 0),
            should_quit: false,
        };
        let loaded = app.board.load(&app.store);
        app.report("load tasks", loaded);
        app
    }

    pub fn update(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Key(key) => {
                self.notice = None;
                if let Some(message) = self.message_for_key(key) {
                    self.dispatch(message);
                }
            }
            Message::Resize(width, height) => {
                self.viewport = (width, height);
                self.board.set_viewport(width, height);
                self.form.set_viewport(width, height);
            }
            other => self.dispatch(other),
        }
        Ok(())
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn active_view(&self) -> ActiveView {
        self.active
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn keybindings(&self) -> &Keybindings {
        &self.keybindings
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn viewport(&self) -> (u16, u16) {
        self.viewport
    }

    fn message_for_key(&self, key: KeyEvent) -> Option<Message> {
        let context = self.active.key_context();
        if let Some(action) = self.keybindings.action_for_key(context, key) {
            return Some(action.into());
        }

        match (self.active, key.code) {
            (ActiveView::Form, KeyCode::Char(ch))
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(Message::InputChar(ch))
            }
            _ => None,
        }
    }

    fn dispatch(&mut self, message: Message) {
        if message == Message::Quit {
            self.should_quit = true;
            return;
        }

        match self.active {
            ActiveView::Board => {
                if let Some(command) = board_command(&message) {
                    self.handle_board(command);
                }
            }
            ActiveView::Form => {
                if let Some(input) = form_input(&message) {
                    self.handle_form(input);
                }
            }
        }
    }

    fn handle_board(&mut self, command: BoardCommand) {
        let result = self.board.handle(command, &self.store);
        let Some(effect) = self.report(board_action_label(command), result) else {
            return;
        };

        match effect {
            BoardEffect::None => {}
            BoardEffect::BeginCreate(stage) => {
                self.open_form(Form::create(stage));
            }
            BoardEffect::BeginEdit(task) => {
                self.open_form(Form::edit(&task));
            }
        }
    }

    fn open_form(&mut self, form: Form) {
        debug!(heading = form.heading(), "opening form");
        self.form = form.with_viewport(self.viewport);
        self.active = ActiveView::Form;
    }

    fn handle_form(&mut self, input: FormInput) {
        if let FormEffect::Completed(event) = self.form.handle(input) {
            self.active = ActiveView::Board;
            let result = self.board.apply(event, &self.store);
            self.report("save task", result);
        }
    }

    /// Logs a recoverable failure and surfaces it in the footer.
    fn report<T, E: Display>(&mut self, action: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                warn!("failed to {action}: {error:#}");
                self.notice = Some(format!("Could not {action}: {error}"));
                None
            }
        }
    }
}

fn board_command(message: &Message) -> Option<BoardCommand> {
    Some(match message {
        Message::FocusNext => BoardCommand::FocusNext,
        Message::FocusPrev => BoardCommand::FocusPrev,
        Message::SelectNext => BoardCommand::SelectNext,
        Message::SelectPrev => BoardCommand::SelectPrev,
        Message::MoveForward => BoardCommand::Move(Direction::Forward),
        Message::MoveBackward => BoardCommand::Move(Direction::Backward),
        Message::DeleteTask => BoardCommand::DeleteSelected,
        Message::NewTask => BoardCommand::BeginCreate,
        Message::EditTask => BoardCommand::BeginEdit,
        Message::Reload => BoardCommand::Reload,
        _ => return None,
    })
}

fn form_input(message: &Message) -> Option<FormInput> {
    match message {
        Message::InputChar(ch) => Some(FormInput::Char(*ch)),
        Message::EraseChar => Some(FormInput::Backspace),
        Message::SubmitField => Some(FormInput::Submit),
        _ => None,
    }
}

fn board_action_label(command: BoardCommand) -> &'static str {
    match command {
        BoardCommand::Move(_) => "move task",
        BoardCommand::DeleteSelected => "delete task",
        BoardCommand::Reload => "reload tasks",
        _ => "update board",
    }
}
