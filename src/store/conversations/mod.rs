use super::Database;
use crate::errors::TaskpilotError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

const DEFAULT_TITLE: &str = "New conversation";

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: i64,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(format!("unknown message role '{}'", other)),
        }
    }
}

impl ToSql for MessageRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for MessageRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence contract the agent loop depends on.
///
/// Conversations are created lazily and owned by exactly one user; messages
/// are append-only and come back in creation order.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Resolve an existing conversation for `owner_id`, or create one titled
    /// `seed_title` when no id is given.
    async fn get_or_create(
        &self,
        conversation_id: Option<i64>,
        owner_id: &str,
        seed_title: &str,
    ) -> Result<Conversation, TaskpilotError>;

    /// Append a message. Empty content is skipped and yields `None`.
    async fn append_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<Option<i64>, TaskpilotError>;

    async fn load_history(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, TaskpilotError>;

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, TaskpilotError>;
}

fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

impl Database {
    pub fn get_conversation(&self, conversation_id: i64) -> Result<Option<Conversation>> {
        let conn = self.lock()?;
        let conversation = conn
            .query_row(
                "SELECT id, owner_id, title, created_at, updated_at
                 FROM conversations WHERE id = ?1",
                params![conversation_id],
                conversation_from_row,
            )
            .optional()?;
        Ok(conversation)
    }

    fn resolve_conversation(
        &self,
        conversation_id: Option<i64>,
        owner_id: &str,
        seed_title: &str,
    ) -> Result<Conversation> {
        if let Some(id) = conversation_id {
            let conversation = self
                .get_conversation(id)?
                .ok_or_else(|| TaskpilotError::NotFound(id.to_string()))?;
            if conversation.owner_id != owner_id {
                return Err(TaskpilotError::AccessDenied {
                    conversation_id: id,
                }
                .into());
            }
            return Ok(conversation);
        }

        let title = if seed_title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            seed_title
        };
        let now = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO conversations (owner_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![owner_id, title, now],
        )?;
        let id = conn.last_insert_rowid();
        debug!("created conversation {} for {}", id, owner_id);
        Ok(Conversation {
            id,
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    fn insert_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<Option<i64>> {
        if content.trim().is_empty() {
            debug!(
                "skipping empty {} message for conversation {}",
                role.as_str(),
                conversation_id
            );
            return Ok(None);
        }

        let now = Utc::now();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO messages (conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, role, content, now],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![now, conversation_id],
        )?;
        tx.commit()?;
        Ok(Some(id))
    }

    fn select_history(&self, conversation_id: i64) -> Result<Vec<StoredMessage>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages WHERE conversation_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![conversation_id], |row| {
                Ok(StoredMessage {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn select_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, title, created_at, updated_at
             FROM conversations WHERE owner_id = ?1
             ORDER BY updated_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![owner_id], conversation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl ConversationStore for Database {
    async fn get_or_create(
        &self,
        conversation_id: Option<i64>,
        owner_id: &str,
        seed_title: &str,
    ) -> Result<Conversation, TaskpilotError> {
        self.resolve_conversation(conversation_id, owner_id, seed_title)
            .map_err(TaskpilotError::from_anyhow)
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<Option<i64>, TaskpilotError> {
        Ok(self.insert_message(conversation_id, role, content)?)
    }

    async fn load_history(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, TaskpilotError> {
        Ok(self.select_history(conversation_id)?)
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, TaskpilotError> {
        Ok(self.select_conversations(owner_id)?)
    }
}

#[cfg(test)]
mod tests;
