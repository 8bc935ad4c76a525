use std::collections::HashSet;
use std::path::Path;

use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tracing::error;

use crate::{
    db::Database,
    store::TaskStore,
    types::{Stage, TaskId, TaskRecord},
};

const SCHEMA_VERSION: &str = "cli.v1";

#[derive(Debug, Clone, Subcommand)]
pub enum RootCommand {
    /// Inspect or change tasks without opening the board
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum TaskCommand {
    List(TaskListArgs),
    Add(TaskAddArgs),
    Show(TaskIdArgs),
    Move(TaskMoveArgs),
    Delete(TaskIdArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TaskListArgs {
    #[arg(long, value_name = "STAGE", value_parser = parse_stage)]
    pub stage: Option<Stage>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskAddArgs {
    #[arg(long, value_name = "TEXT")]
    pub title: String,

    #[arg(long, value_name = "TEXT", default_value = "")]
    pub description: String,

    #[arg(long, value_name = "STAGE", value_parser = parse_stage, default_value = "todo")]
    pub stage: Stage,
}

#[derive(Debug, Clone, Args)]
pub struct TaskIdArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: i64,
}

#[derive(Debug, Clone, Args)]
pub struct TaskMoveArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: i64,

    #[arg(long, value_name = "STAGE", value_parser = parse_stage)]
    pub stage: Stage,
}

fn parse_stage(raw: &str) -> Result<Stage, String> {
    raw.parse()
        .map_err(|()| format!("unknown stage '{raw}' (expected todo, in_progress or done)"))
}

pub fn run(db_path: &Path, command: RootCommand, json_output: bool, quiet: bool) -> i32 {
    let result = Database::open(db_path)
        .map_err(|err| runtime_error(format_anyhow_error_chain(&err)))
        .and_then(|db| execute(&db, command));

    match result {
        Ok(output) => {
            print_success(output, json_output, quiet);
            0
        }
        Err(err) => {
            print_error(&err, json_output);
            err.exit_code
        }
    }
}

struct CommandOutput {
    command: &'static str,
    data: Value,
    text: String,
}

#[derive(Debug)]
struct CliError {
    exit_code: i32,
    code: &'static str,
    message: String,
}

type CliResult<T> = Result<T, CliError>;

fn execute(db: &Database, command: RootCommand) -> CliResult<CommandOutput> {
    match command {
        RootCommand::Task { command } => match command {
            TaskCommand::List(args) => task_list(db, args),
            TaskCommand::Add(args) => task_add(db, args),
            TaskCommand::Show(args) => task_show(db, args),
            TaskCommand::Move(args) => task_move(db, args),
            TaskCommand::Delete(args) => task_delete(db, args),
        },
    }
}

fn task_list(db: &Database, args: TaskListArgs) -> CliResult<CommandOutput> {
    let tasks: Vec<TaskRecord> = db
        .list_active_tasks()
        .map_err(classify_db_error)?
        .into_iter()
        .filter(|task| args.stage.is_none_or(|stage| task.stage == stage))
        .collect();

    Ok(CommandOutput {
        command: "task list",
        data: json!({ "tasks": tasks.iter().map(task_json).collect::<Vec<_>>() }),
        text: render_task_list_text(&tasks),
    })
}

fn render_task_list_text(tasks: &[TaskRecord]) -> String {
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }

    let headers = ["ID", "Stage", "Title", "Description"];
    let rows = tasks
        .iter()
        .map(|task| {
            vec![
                task.id.to_string(),
                task.stage.as_str().to_string(),
                task.title.replace('\n', " "),
                task.description.replace('\n', " "),
            ]
        })
        .collect::<Vec<_>>();

    render_text_table(&headers, &rows)
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|width| "-".repeat(*width + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let format_row = |cells: Vec<&str>| {
        format!(
            "| {} |",
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join(" | ")
        )
    };

    let mut lines = vec![border.clone(), format_row(headers.to_vec()), border.clone()];
    lines.extend(
        rows.iter()
            .map(|row| format_row(row.iter().map(String::as_str).collect())),
    );
    lines.push(border);
    lines.join("\n")
}

fn task_add(db: &Database, args: TaskAddArgs) -> CliResult<CommandOutput> {
    let title = args.title.trim();
    if title.is_empty() {
        return Err(usage_error("TITLE_REQUIRED", "title cannot be empty"));
    }

    let id = db
        .insert_task(title, &args.description, args.stage)
        .map_err(classify_db_error)?;
    let created = lookup_task(db, id)?;

    Ok(CommandOutput {
        command: "task add",
        data: json!({ "task": task_json(&created) }),
        text: format!("created task {} in {}", created.id, created.stage.as_str()),
    })
}

fn task_show(db: &Database, args: TaskIdArgs) -> CliResult<CommandOutput> {
    let task = lookup_task(db, TaskId(args.id))?;
    let text = format!(
        "{} [{}] {}\n{}",
        task.id,
        task.stage.as_str(),
        task.title,
        task.description
    );

    Ok(CommandOutput {
        command: "task show",
        data: json!({ "task": task_json(&task) }),
        text: text.trim_end().to_string(),
    })
}

fn task_move(db: &Database, args: TaskMoveArgs) -> CliResult<CommandOutput> {
    let id = TaskId(args.id);
    let existing = lookup_task(db, id)?;

    if existing.stage != args.stage {
        db.update_task_stage(id, args.stage)
            .map_err(classify_db_error)?;
    }
    let moved = lookup_task(db, id)?;

    Ok(CommandOutput {
        command: "task move",
        data: json!({ "task": task_json(&moved) }),
        text: format!("moved task {} to {}", moved.id, moved.stage.as_str()),
    })
}

fn task_delete(db: &Database, args: TaskIdArgs) -> CliResult<CommandOutput> {
    let id = TaskId(args.id);
    let existing = lookup_task(db, id)?;
    db.soft_delete_task(id).map_err(classify_db_error)?;

    Ok(CommandOutput {
        command: "task delete",
        data: json!({ "task": task_json(&existing), "deleted": true }),
        text: format!("deleted task {}", existing.id),
    })
}

fn lookup_task(db: &Database, id: TaskId) -> CliResult<TaskRecord> {
    db.get_task(id).map_err(|err| {
        let is_missing = err
            .chain()
            .any(|cause| matches!(
                cause.downcast_ref::<rusqlite::Error>(),
                Some(rusqlite::Error::QueryReturnedNoRows)
            ));
        if is_missing {
            not_found_error("TASK_NOT_FOUND", format!("task {id} not found"))
        } else {
            classify_db_error(err)
        }
    })
}

fn task_json(task: &TaskRecord) -> Value {
    json!({
        "id": task.id,
        "title": task.title,
        "description": task.description,
        "stage": task.stage,
        "inserted_at": task.inserted_at,
    })
}

fn usage_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 2,
        code,
        message: message.into(),
    }
}

fn not_found_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 3,
        code,
        message: message.into(),
    }
}

fn runtime_error(message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 5,
        code: "RUNTIME_ERROR",
        message: message.into(),
    }
}

fn classify_db_error(err: anyhow::Error) -> CliError {
    runtime_error(format_anyhow_error_chain(&err))
}

fn print_success(output: CommandOutput, json_output: bool, quiet: bool) {
    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "command": output.command,
            "data": output.data
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => println!("{value}"),
            Err(_) => println!("{payload}"),
        }
        return;
    }

    if quiet {
        return;
    }

    if output.text.is_empty() {
        println!("ok");
    } else {
        println!("{}", output.text);
    }
}

fn print_error(err: &CliError, json_output: bool) {
    error!(code = err.code, message = %err.message, "cli command failed");

    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "error": {
                "code": err.code,
                "message": err.message
            }
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => eprintln!("{value}"),
            Err(_) => eprintln!("{payload}"),
        }
        return;
    }

    eprintln!("error[{}]: {}", err.code, err.message);
}

fn format_anyhow_error_chain(err: &anyhow::Error) -> String {
    let mut seen = HashSet::new();
    err.chain()
        .map(|cause| cause.to_string())
        .filter(|text| seen.insert(text.clone()))
        .collect::<Vec<_>>()
        .join(": ")
}
