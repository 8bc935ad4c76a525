use tuirealm::ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::app::{ActiveView, App};
use crate::board::Board;
use crate::form::{Form, FormState};
use crate::keybindings::{KeyAction, KeyContext, Keybindings};
use crate::store::TaskStore;
use crate::types::Stage;

const MIN_COLUMN_WIDTH: u16 = 16;
const CARD_HEIGHT: u16 = 2;
const CARD_STRIDE: u16 = CARD_HEIGHT + 1;

pub fn render<S: TaskStore>(frame: &mut Frame<'_>, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app.board());
    render_columns(frame, chunks[1], app.board(), app.keybindings());
    render_footer(frame, chunks[2], app);

    if app.active_view() == ActiveView::Form {
        render_form(frame, app.form());
    }
}

fn render_header(frame: &mut Frame<'_>, area: Rect, board: &Board) {
    let header = Block::default()
        .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
        .title(" taskboard ")
        .title_alignment(Alignment::Left);
    let count = Block::default()
        .title(format!(" {} tasks ", board.task_count()))
        .title_alignment(Alignment::Right);

    frame.render_widget(header, area);
    frame.render_widget(count, area);
}

fn render_footer<S: TaskStore>(frame: &mut Frame<'_>, area: Rect, app: &App<S>) {
    let (text, style) = match app.notice() {
        Some(notice) => (notice.to_string(), Style::default().fg(Color::Red)),
        None => {
            let context = match app.active_view() {
                ActiveView::Board => KeyContext::Board,
                ActiveView::Form => KeyContext::Form,
            };
            let mut hints = app.keybindings().hints(context);
            if app.active_view() == ActiveView::Form {
                hints.extend(app.keybindings().hints(KeyContext::Global));
            }
            (hints.join("  "), Style::default().fg(Color::Gray))
        }
    };

    frame.render_widget(
        Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center),
        area,
    );
}

fn render_columns(frame: &mut Frame<'_>, area: Rect, board: &Board, keybindings: &Keybindings) {
    if !board.is_loaded() {
        render_placeholder(frame, area, " Loading ", &loading_message(keybindings));
        return;
    }

    let columns = Stage::ALL.len() as u16;
    if area.width < columns.saturating_mul(MIN_COLUMN_WIDTH) {
        let msg = format!(
            "Terminal too narrow for {} columns. Increase width to at least {} cells.",
            columns,
            columns.saturating_mul(MIN_COLUMN_WIDTH)
        );
        render_placeholder(frame, area, " Resize Needed ", &msg);
        return;
    }

    let column_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(Stage::ALL.map(|_| Constraint::Ratio(1, u32::from(columns))))
        .split(area);

    for (stage, chunk) in Stage::ALL.into_iter().zip(column_chunks.iter()) {
        render_column(frame, *chunk, board, stage);
    }
}

fn render_column(frame: &mut Frame<'_>, area: Rect, board: &Board, stage: Stage) {
    let column = board.column(stage);
    let is_focused = board.focused() == stage;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if is_focused {
            BorderType::Double
        } else {
            BorderType::Plain
        })
        .border_style(if is_focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        })
        .title(format!(" {} ({}) ", stage.label(), column.len()))
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if column.is_empty() {
        frame.render_widget(
            Paragraph::new("No tasks")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let selected = board.selected_index(stage);
    let visible = usize::from((inner.height / CARD_STRIDE).max(1));
    let scroll_offset = scroll_offset(selected.unwrap_or(0), visible);

    let mut y_offset = 0;
    for task in column.iter().skip(scroll_offset) {
        if y_offset + CARD_HEIGHT > inner.height {
            break;
        }

        let is_selected = is_focused && selected == Some(task.position);
        let prefix = if is_selected { "▸ " } else { "  " };
        let bg_color = if is_selected {
            Color::DarkGray
        } else {
            Color::Reset
        };

        let title = Line::from(vec![
            Span::styled(prefix, Style::default().fg(Color::Yellow)),
            Span::styled(
                task.title.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]);
        let description = Line::from(vec![
            Span::raw("  "),
            Span::styled(
                task.description.as_str(),
                Style::default().fg(Color::Gray),
            ),
        ]);

        let card_area = Rect {
            x: inner.x,
            y: inner.y + y_offset,
            width: inner.width,
            height: CARD_HEIGHT,
        };
        frame.render_widget(
            Paragraph::new(vec![title, description]).style(Style::default().bg(bg_color)),
            card_area,
        );

        y_offset += CARD_STRIDE;
    }
}

fn loading_message(keybindings: &Keybindings) -> String {
    match keybindings.display_for(KeyContext::Board, KeyAction::Reload) {
        Some(keys) if !keys.is_empty() => format!("Loading tasks…\nPress {keys} to retry."),
        _ => "Loading tasks…".to_string(),
    }
}

/// First visible card so that `selected` stays on screen.
fn scroll_offset(selected: usize, visible: usize) -> usize {
    selected.saturating_sub(visible.saturating_sub(1))
}

fn render_placeholder(frame: &mut Frame<'_>, area: Rect, title: &str, text: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), inner);
}

fn render_form(frame: &mut Frame<'_>, form: &Form) {
    let area = centered_rect(60, 40, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .title(format!(" {} · {} ", form.heading(), form.stage().label()))
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    render_input_field(
        frame,
        rows[0],
        " Title ",
        form.title(),
        form.state() == FormState::TitleActive,
    );
    render_input_field(
        frame,
        rows[1],
        " Description ",
        form.description(),
        form.state() == FormState::DescriptionActive,
    );
}

fn render_input_field(
    frame: &mut Frame<'_>,
    area: Rect,
    label: &str,
    value: &str,
    is_focused: bool,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(label)
        .style(if is_focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });
    let text = if is_focused {
        format!("{value}▏")
    } else {
        value.to_string()
    };
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tuirealm::ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::app::Message;
    use crate::db::Database;
    use crate::settings::KeybindingsConfig;

    fn draw(app: &App, width: u16, height: u16) -> Result<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height))?;
        terminal.draw(|frame| render(frame, app))?;
        Ok(terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect())
    }

    #[test]
    fn test_scroll_offset_keeps_selection_visible() {
        assert_eq!(scroll_offset(0, 4), 0);
        assert_eq!(scroll_offset(3, 4), 0);
        assert_eq!(scroll_offset(4, 4), 1);
        assert_eq!(scroll_offset(9, 1), 9);
    }

    #[test]
    fn test_loading_message_follows_reload_binding() {
        assert_eq!(
            loading_message(&Keybindings::default()),
            "Loading tasks…\nPress r to retry."
        );

        let mut config = KeybindingsConfig::default();
        config
            .board
            .insert("reload".to_string(), vec!["F5".to_string()]);
        let message = loading_message(&Keybindings::from_config(&config));
        assert_eq!(message, "Loading tasks…\nPress F5 to retry.");
    }

    #[test]
    fn test_board_shows_column_headings_and_cards() -> Result<()> {
        let db = Database::open(":memory:")?;
        db.insert_task("Buy milk", "2%", Stage::Todo)?;
        let app = App::new(db, Keybindings::default());

        let screen = draw(&app, 90, 20)?;

        assert!(screen.contains("To Do (1)"));
        assert!(screen.contains("In Progress (0)"));
        assert!(screen.contains("Done (0)"));
        assert!(screen.contains("Buy milk"));
        Ok(())
    }

    #[test]
    fn test_form_overlay_is_drawn_when_active() -> Result<()> {
        let db = Database::open(":memory:")?;
        let mut app = App::new(db, Keybindings::default());
        app.update(Message::Key(KeyEvent::new(
            KeyCode::Char('n'),
            KeyModifiers::empty(),
        )))?;

        let screen = draw(&app, 90, 30)?;

        assert!(screen.contains("New Task"));
        assert!(screen.contains("Title"));
        assert!(screen.contains("Description"));
        Ok(())
    }

    #[test]
    fn test_narrow_terminal_asks_for_resize() -> Result<()> {
        let app = App::new(Database::open(":memory:")?, Keybindings::default());
        let screen = draw(&app, 30, 10)?;
        assert!(screen.contains("Resize"));
        Ok(())
    }
}
