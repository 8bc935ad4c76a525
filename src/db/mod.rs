use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{Connection, params, types::Type};
use tracing::debug;

use crate::store::TaskStore;
use crate::types::{Stage, TaskId, TaskRecord};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();

        if path_ref != Path::new(":memory:")
            && let Some(parent) = path_ref.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create parent directories for {}",
                    path_ref.display()
                )
            })?;
        }

        let conn = Connection::open(path_ref)
            .with_context(|| format!("failed to open sqlite db at {}", path_ref.display()))?;

        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    stage INTEGER NOT NULL,
                    inserted_at TEXT NOT NULL,
                    deleted_at TEXT
                );",
            )
            .context("failed to create tasks table")
    }

    /// Looks up a live row; soft-deleted rows are reported as missing.
    pub fn get_task(&self, id: TaskId) -> Result<TaskRecord> {
        self.conn
            .query_row(
                "SELECT id, title, description, stage, inserted_at
                 FROM tasks WHERE id = ?1 AND deleted_at IS NULL",
                params![id.0],
                map_task_row,
            )
            .with_context(|| format!("task {id} not found"))
    }

    fn expect_single_row(changed: usize, id: TaskId, action: &str) -> Result<()> {
        if changed == 0 {
            bail!("failed to {action}: task {id} not found");
        }
        Ok(())
    }
}

impl TaskStore for Database {
    fn insert_task(&self, title: &str, description: &str, stage: Stage) -> Result<TaskId> {
        self.conn
            .execute(
                "INSERT INTO tasks (title, description, stage, inserted_at) VALUES (?1, ?2, ?3, ?4)",
                params![title, description, stage.index() as i64, now_iso()],
            )
            .context("failed to insert task")?;

        let id = TaskId(self.conn.last_insert_rowid());
        debug!(%id, stage = stage.as_str(), "inserted task");
        Ok(id)
    }

    fn update_task_stage(&self, id: TaskId, stage: Stage) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE tasks SET stage = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                params![stage.index() as i64, id.0],
            )
            .context("failed to update task stage")?;
        Self::expect_single_row(changed, id, "update task stage")?;
        debug!(%id, stage = stage.as_str(), "updated task stage");
        Ok(())
    }

    fn update_task_fields(&self, id: TaskId, title: &str, description: &str) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE tasks SET title = ?1, description = ?2 WHERE id = ?3 AND deleted_at IS NULL",
                params![title, description, id.0],
            )
            .context("failed to update task fields")?;
        Self::expect_single_row(changed, id, "update task fields")?;
        debug!(%id, "updated task fields");
        Ok(())
    }

    fn soft_delete_task(&self, id: TaskId) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE tasks SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                params![now_iso(), id.0],
            )
            .context("failed to delete task")?;
        Self::expect_single_row(changed, id, "delete task")?;
        debug!(%id, "soft-deleted task");
        Ok(())
    }

    fn list_active_tasks(&self) -> Result<Vec<TaskRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, stage, inserted_at
             FROM tasks WHERE deleted_at IS NULL ORDER BY id ASC",
        )?;

        let tasks = stmt
            .query_map(params![], map_task_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to load tasks")?;
        Ok(tasks)
    }
}

fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: TaskId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        stage: parse_stage_column(row.get::<_, i64>(3)?, 3)?,
        inserted_at: row.get(4)?,
    })
}

fn parse_stage_column(value: i64, idx: usize) -> rusqlite::Result<Stage> {
    usize::try_from(value)
        .ok()
        .and_then(Stage::from_index)
        .ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Integer,
                format!("unknown stage value {value}").into(),
            )
        })
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use rusqlite::params;
    use tempfile::TempDir;

    use super::Database;
    use crate::store::TaskStore;
    use crate::types::{Stage, TaskId};

    #[test]
    fn test_open_creates_database_file() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("nested").join("tasks.sqlite");
        let _db = Database::open(&path)?;
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_insert_assigns_increasing_ids() -> Result<()> {
        let db = Database::open(":memory:")?;
        let first = db.insert_task("Buy milk", "2%", Stage::Todo)?;
        let second = db.insert_task("Walk dog", "", Stage::Done)?;

        assert!(first.0 >= 0);
        assert!(second > first);

        let tasks = db.list_active_tasks()?;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, first);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].description, "2%");
        assert_eq!(tasks[0].stage, Stage::Todo);
        assert_eq!(tasks[1].stage, Stage::Done);
        Ok(())
    }

    #[test]
    fn test_update_stage_leaves_fields_alone() -> Result<()> {
        let db = Database::open(":memory:")?;
        let id = db.insert_task("Review PR", "frontend", Stage::InProgress)?;

        db.update_task_stage(id, Stage::Done)?;

        let task = db.get_task(id)?;
        assert_eq!(task.stage, Stage::Done);
        assert_eq!(task.title, "Review PR");
        assert_eq!(task.description, "frontend");
        Ok(())
    }

    #[test]
    fn test_update_fields_leaves_stage_alone() -> Result<()> {
        let db = Database::open(":memory:")?;
        let id = db.insert_task("Draft", "", Stage::InProgress)?;

        db.update_task_fields(id, "Final", "polished")?;

        let task = db.get_task(id)?;
        assert_eq!(task.title, "Final");
        assert_eq!(task.description, "polished");
        assert_eq!(task.stage, Stage::InProgress);
        Ok(())
    }

    #[test]
    fn test_soft_delete_retains_row_but_hides_it() -> Result<()> {
        let db = Database::open(":memory:")?;
        let kept = db.insert_task("Keep", "", Stage::Todo)?;
        let gone = db.insert_task("Gone", "", Stage::Todo)?;

        db.soft_delete_task(gone)?;

        let ids: Vec<TaskId> = db.list_active_tasks()?.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![kept]);
        assert!(db.get_task(gone).is_err());

        let deleted_at: Option<String> = db.conn.query_row(
            "SELECT deleted_at FROM tasks WHERE id = ?1",
            params![gone.0],
            |row| row.get(0),
        )?;
        assert!(deleted_at.is_some());
        Ok(())
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() -> Result<()> {
        let db = Database::open(":memory:")?;
        let first = db.insert_task("One", "", Stage::Todo)?;
        db.soft_delete_task(first)?;
        let second = db.insert_task("Two", "", Stage::Todo)?;
        assert!(second > first);
        Ok(())
    }

    #[test]
    fn test_mutations_of_missing_rows_fail() -> Result<()> {
        let db = Database::open(":memory:")?;
        let id = db.insert_task("Once", "", Stage::Todo)?;
        db.soft_delete_task(id)?;

        assert!(db.soft_delete_task(id).is_err());
        assert!(db.update_task_stage(id, Stage::Done).is_err());
        assert!(db.update_task_fields(TaskId(999), "x", "y").is_err());
        Ok(())
    }

    #[test]
    fn test_unknown_stage_value_is_a_read_error() -> Result<()> {
        let db = Database::open(":memory:")?;
        db.conn.execute(
            "INSERT INTO tasks (title, description, stage, inserted_at) VALUES ('x', '', 7, 'now')",
            params![],
        )?;
        assert!(db.list_active_tasks().is_err());
        Ok(())
    }

    #[test]
    fn test_reopen_keeps_tasks() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("tasks.sqlite");
        let id = Database::open(&path)?.insert_task("Persist", "me", Stage::InProgress)?;

        let reopened = Database::open(&path)?;
        let task = reopened.get_task(id)?;
        assert_eq!(task.title, "Persist");
        assert_eq!(task.stage, Stage::InProgress);
        Ok(())
    }
}
