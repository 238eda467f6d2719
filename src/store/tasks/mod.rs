use super::Database;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: `pending`, `Pending` and `PENDING` all parse.
impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(format!(
                "Invalid status '{}'. Must be PENDING or COMPLETED.",
                s
            )),
        }
    }
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: i64,
    #[serde(skip)]
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// Trim and reject empty titles.
pub fn normalize_title(title: &str) -> Result<String, String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Title is required.".to_string());
    }
    Ok(trimmed.to_string())
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const TASK_COLUMNS: &str = "id, owner_id, title, description, status, created_at, updated_at";

/// Every task operation is scoped to `owner_id`; another owner's task behaves
/// exactly like a missing one.
impl Database {
    pub fn create_task(&self, owner_id: &str, title: &str, description: &str) -> Result<Task> {
        let title = normalize_title(title).map_err(anyhow::Error::msg)?;
        let now = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (owner_id, title, description, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![owner_id, title, description, TaskStatus::Pending, now],
        )?;
        Ok(Task {
            id: conn.last_insert_rowid(),
            owner_id: owner_id.to_string(),
            title,
            description: description.to_string(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_tasks(&self, owner_id: &str, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        let mut rows = Vec::new();
        if let Some(status) = status {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 AND status = ?2 ORDER BY id"
            ))?;
            for task in stmt.query_map(params![owner_id, status], task_from_row)? {
                rows.push(task?);
            }
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY id"
            ))?;
            for task in stmt.query_map(params![owner_id], task_from_row)? {
                rows.push(task?);
            }
        }
        Ok(rows)
    }

    pub fn get_task(&self, owner_id: &str, task_id: i64) -> Result<Option<Task>> {
        let conn = self.lock()?;
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner_id = ?2"),
                params![task_id, owner_id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Apply `update`. An empty title is ignored rather than stored.
    ///
    /// Only the supplied columns are written, in a single statement, so a
    /// concurrent toggle is never overwritten with a stale status.
    pub fn update_task(
        &self,
        owner_id: &str,
        task_id: i64,
        update: &TaskUpdate,
    ) -> Result<Option<Task>> {
        let title = update
            .title
            .as_deref()
            .and_then(|t| normalize_title(t).ok());
        let conn = self.lock()?;
        let task = conn
            .query_row(
                &format!(
                    "UPDATE tasks SET title = COALESCE(?1, title),
                        description = COALESCE(?2, description),
                        status = COALESCE(?3, status),
                        updated_at = ?4
                     WHERE id = ?5 AND owner_id = ?6
                     RETURNING {TASK_COLUMNS}"
                ),
                params![
                    title,
                    update.description,
                    update.status,
                    Utc::now(),
                    task_id,
                    owner_id
                ],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Flip PENDING and COMPLETED in place.
    pub fn toggle_task(&self, owner_id: &str, task_id: i64) -> Result<Option<Task>> {
        let conn = self.lock()?;
        let task = conn
            .query_row(
                &format!(
                    "UPDATE tasks SET status = CASE status
                        WHEN 'PENDING' THEN 'COMPLETED' ELSE 'PENDING' END,
                        updated_at = ?1
                     WHERE id = ?2 AND owner_id = ?3
                     RETURNING {TASK_COLUMNS}"
                ),
                params![Utc::now(), task_id, owner_id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn delete_task(&self, owner_id: &str, task_id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
            params![task_id, owner_id],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests;
