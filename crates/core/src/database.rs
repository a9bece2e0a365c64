use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{named_params, Connection, Row};
use tracing::warn;

use crate::config::AppConfig;
use crate::error::{Result, TaskError};
use crate::model::{NewTask, Priority, Task, TaskStatus};
use crate::parser::{format_timestamp, parse_stored_timestamp};

const TASK_COLUMNS: &str =
    "id, title, reason, startTime, endTime, recurrence, priority, status, createdAt";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn initialize(config: &AppConfig) -> Result<Self> {
        let conn = Connection::open(config.db_path())?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Every readable task by start time. Rows that cannot be decoded are
    /// logged and skipped so one damaged row does not hide the rest.
    pub fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY startTime ASC, id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            match map_task(row) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    let id: Option<i64> = row.get(0).ok();
                    warn!(task_id = ?id, error = %err, "skipping unreadable task row");
                }
            }
        }
        Ok(tasks)
    }

    pub fn fetch_task(&self, id: i64) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? LIMIT 1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_task(row)?)),
            None => Ok(None),
        }
    }

    /// Insert a validated task and return its AUTOINCREMENT id.
    pub fn insert_task(&self, task: &NewTask) -> Result<i64> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO tasks (title, reason, startTime, endTime, recurrence, priority, status, createdAt)
             VALUES (:title, :reason, :start, :end, :recurrence, :priority, :status, :created)",
            named_params![
                ":title": &task.title,
                ":reason": task.reason.as_deref(),
                ":start": format_timestamp(&task.start_time),
                ":end": format_timestamp(&task.end_time),
                ":recurrence": task.recurrence.as_deref(),
                ":priority": task.priority.unwrap_or_default().as_str(),
                ":status": TaskStatus::Pending.as_str(),
                ":created": format_timestamp(&now),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Overwrite every mutable column of an existing row. Returns the number of rows touched.
    pub fn update_task(&self, task: &Task) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE tasks SET
                title = :title,
                reason = :reason,
                startTime = :start,
                endTime = :end,
                recurrence = :recurrence,
                priority = :priority,
                status = :status
             WHERE id = :id",
            named_params![
                ":title": &task.title,
                ":reason": task.reason.as_deref(),
                ":start": format_timestamp(&task.start_time),
                ":end": format_timestamp(&task.end_time),
                ":recurrence": task.recurrence.as_deref(),
                ":priority": task.priority.as_str(),
                ":status": task.status.as_str(),
                ":id": task.id,
            ],
        )?;
        Ok(changed)
    }

    pub fn update_status(&self, id: i64, status: TaskStatus) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE tasks SET status = :status WHERE id = :id",
            named_params![":status": status.as_str(), ":id": id],
        )?;
        Ok(changed)
    }

    pub fn delete_task(&self, id: i64) -> Result<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = :id", named_params![":id": id])?;
        Ok(changed)
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                reason TEXT,
                startTime TEXT,
                endTime TEXT,
                recurrence TEXT,
                priority TEXT NOT NULL DEFAULT 'Medium',
                status TEXT NOT NULL DEFAULT 'pending',
                createdAt TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
             );
             CREATE INDEX IF NOT EXISTS idx_tasks_start ON tasks(startTime);
            ",
        )?;
        Ok(())
    }
}

fn map_task(row: &Row<'_>) -> Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        reason: row.get(2)?,
        start_time: required_timestamp(row, 3)?,
        end_time: required_timestamp(row, 4)?,
        recurrence: row.get(5)?,
        priority: row
            .get::<_, Option<String>>(6)?
            .map(|raw| raw.parse::<Priority>().map_err(|err| decode_failure(6, err)))
            .transpose()?
            .unwrap_or_default(),
        status: row
            .get::<_, Option<String>>(7)?
            .map(|raw| raw.parse::<TaskStatus>().map_err(|err| decode_failure(7, err)))
            .transpose()?
            .unwrap_or_default(),
        created_at: required_timestamp(row, 8)?,
    })
}

fn required_timestamp(row: &Row<'_>, index: usize) -> Result<DateTime<Utc>> {
    let raw: Option<String> = row.get(index)?;
    match raw {
        Some(raw) => parse_stored_timestamp(&raw)
            .ok_or_else(|| decode_failure(index, format!("unreadable timestamp '{raw}'"))),
        None => Err(TaskError::Store(rusqlite::Error::InvalidColumnType(
            index,
            column_name(index).to_string(),
            Type::Null,
        ))),
    }
}

/// A stored value that does not decode is store corruption, not bad input.
fn decode_failure(index: usize, reason: impl ToString) -> TaskError {
    TaskError::Store(rusqlite::Error::FromSqlConversionFailure(
        index,
        Type::Text,
        reason.to_string().into(),
    ))
}

fn column_name(index: usize) -> &'static str {
    TASK_COLUMNS.split(", ").nth(index).unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn temp_config() -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        (config, dir)
    }

    fn new_task(title: &str, hour: u32) -> NewTask {
        NewTask::new(
            title,
            Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, hour + 1, 0, 0).unwrap(),
        )
    }

    #[test]
    fn insert_and_fetch_roundtrip() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");

        let mut input = new_task("Write report", 9);
        input.reason = Some("Quarter close".into());
        input.priority = Some(Priority::High);
        let id = db.insert_task(&input).expect("insert");

        let task = db.fetch_task(id).expect("fetch").expect("task exists");
        assert_eq!(task.title, "Write report");
        assert_eq!(task.reason.as_deref(), Some("Quarter close"));
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.start_time, input.start_time);
        assert_eq!(task.end_time, input.end_time);
    }

    #[test]
    fn fetch_orders_by_start_time() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");
        let late = db.insert_task(&new_task("Late", 15)).unwrap();
        let early = db.insert_task(&new_task("Early", 8)).unwrap();
        let middle = db.insert_task(&new_task("Middle", 11)).unwrap();

        let ids: Vec<i64> = db.fetch_tasks().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![early, middle, late]);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");
        let first = db.insert_task(&new_task("First", 9)).unwrap();
        assert_eq!(db.delete_task(first).unwrap(), 1);
        let second = db.insert_task(&new_task("Second", 9)).unwrap();
        assert!(second > first);
        assert_eq!(db.delete_task(first).unwrap(), 0);
    }

    #[test]
    fn status_update_reports_changes() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");
        let id = db.insert_task(&new_task("Review", 10)).unwrap();

        assert_eq!(db.update_status(id, TaskStatus::Completed).unwrap(), 1);
        assert_eq!(db.update_status(id + 100, TaskStatus::Completed).unwrap(), 0);
        let task = db.fetch_task(id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn legacy_rows_fall_back_to_column_defaults() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");
        db.conn
            .execute(
                "INSERT INTO tasks (title, startTime, endTime) VALUES ('Legacy', '2024-01-01T09:00:00.000Z', '2024-01-01T10:00:00.000Z')",
                [],
            )
            .unwrap();

        let tasks = db.fetch_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].priority, Priority::Medium);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
    }

    #[test]
    fn unreadable_rows_are_skipped_on_list_and_fail_as_store_errors() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("initialize db");
        let good = db.insert_task(&new_task("Readable", 9)).unwrap();
        db.conn
            .execute_batch(
                "INSERT INTO tasks (title, startTime, endTime) VALUES ('No times', NULL, NULL);
                 INSERT INTO tasks (title, startTime, endTime) VALUES ('Garbled', 'soon', 'later');
                 INSERT INTO tasks (title, startTime, endTime, priority) VALUES ('Odd priority', '2024-01-01T08:00:00.000Z', '2024-01-01T09:00:00.000Z', 'Urgent');",
            )
            .unwrap();

        let ids: Vec<i64> = db.fetch_tasks().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![good]);

        for id in [good + 1, good + 2, good + 3] {
            let err = db.fetch_task(id).unwrap_err();
            assert!(matches!(err, TaskError::Store(_)), "{err:?}");
            assert_eq!(err.status_code(), 500);
        }
    }
}
