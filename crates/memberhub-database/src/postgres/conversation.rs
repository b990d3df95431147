//! PostgreSQL [`ConversationStore`].
//!
//! Unread counters live in `conversation_participants`; the append path
//! locks the conversation row, inserts the message and bumps every other
//! participant's counter inside one transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use memberhub_core::AppError;
use memberhub_core::result::AppResult;
use memberhub_core::types::{ConversationId, PageRequest, PageResponse, UserId};
use memberhub_entity::conversation::{Conversation, DirectKey, Message, ReadReceipt};
use memberhub_entity::conversation::model::preview;

use super::error::map_sqlx;
use crate::traits::ConversationStore;

const CONVERSATION_COLUMNS: &str = "c.id, c.is_group, c.last_message_id, c.last_message_at, \
     c.last_message_preview, c.created_at, c.updated_at";

/// Conversation store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    /// Create a store over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_conversation(
        &self,
        direct_key: Option<&DirectKey>,
        conversation: Conversation,
    ) -> AppResult<Conversation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(map_sqlx("Failed to begin transaction"))?;

        let inserted = sqlx::query(
            "INSERT INTO conversations (id, is_group, direct_key, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) ON CONFLICT DO NOTHING",
        )
        .bind(conversation.id)
        .bind(conversation.is_group)
        .bind(direct_key.map(|k| k.to_string()))
        .bind(conversation.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx("Failed to insert conversation"))?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::conflict(match direct_key {
                Some(key) => format!("Direct conversation {key} already exists"),
                None => format!("Conversation {} already exists", conversation.id),
            }));
        }

        for (position, user) in conversation.participants.iter().enumerate() {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, user_id, position, unread_count) \
                 VALUES ($1, $2, $3, 0)",
            )
            .bind(conversation.id)
            .bind(*user)
            .bind(position as i16)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx("Failed to insert participant"))?;
        }

        tx.commit()
            .await
            .map_err(map_sqlx("Failed to commit conversation"))?;
        Ok(conversation)
    }
}

/// Load the conversations for `rows`, attaching participants and counters.
async fn assemble(conn: &mut PgConnection, rows: Vec<PgRow>) -> AppResult<Vec<Conversation>> {
    let ids: Vec<Uuid> = rows
        .iter()
        .map(|r| r.try_get::<Uuid, _>("id"))
        .collect::<Result<_, _>>()
        .map_err(map_sqlx("Failed to decode conversation id"))?;

    let participant_rows = sqlx::query(
        "SELECT conversation_id, user_id, unread_count FROM conversation_participants \
         WHERE conversation_id = ANY($1) ORDER BY conversation_id, position",
    )
    .bind(ids.as_slice())
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx("Failed to load participants"))?;

    let mut members: HashMap<Uuid, Vec<(UserId, u32)>> = HashMap::new();
    for row in participant_rows {
        let conversation_id: Uuid = row
            .try_get("conversation_id")
            .map_err(map_sqlx("Failed to decode participant"))?;
        let user: UserId = row
            .try_get("user_id")
            .map_err(map_sqlx("Failed to decode participant"))?;
        let unread: i32 = row
            .try_get("unread_count")
            .map_err(map_sqlx("Failed to decode participant"))?;
        members
            .entry(conversation_id)
            .or_default()
            .push((user, u32::try_from(unread).unwrap_or(0)));
    }

    rows.into_iter()
        .zip(ids)
        .map(|(row, id)| conversation_from_row(&row, members.remove(&id).unwrap_or_default()))
        .collect()
}

fn conversation_from_row(row: &PgRow, members: Vec<(UserId, u32)>) -> AppResult<Conversation> {
    let decode = || map_sqlx("Failed to decode conversation");
    Ok(Conversation {
        id: row.try_get::<ConversationId, _>("id").map_err(decode())?,
        participants: members.iter().map(|(u, _)| *u).collect(),
        is_group: row.try_get("is_group").map_err(decode())?,
        last_message_id: row.try_get("last_message_id").map_err(decode())?,
        last_message_at: row.try_get("last_message_at").map_err(decode())?,
        last_message_preview: row.try_get("last_message_preview").map_err(decode())?,
        unread_counts: members.into_iter().collect(),
        created_at: row.try_get("created_at").map_err(decode())?,
        updated_at: row.try_get("updated_at").map_err(decode())?,
    })
}

async fn load_one(conn: &mut PgConnection, id: ConversationId) -> AppResult<Option<Conversation>> {
    let row = sqlx::query(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_sqlx("Failed to load conversation"))?;

    match row {
        Some(row) => Ok(assemble(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

fn message_from_row(row: &PgRow, read_by: Vec<ReadReceipt>) -> AppResult<Message> {
    let decode = || map_sqlx("Failed to decode message");
    Ok(Message {
        id: row.try_get("id").map_err(decode())?,
        conversation_id: row.try_get("conversation_id").map_err(decode())?,
        sender_id: row.try_get("sender_id").map_err(decode())?,
        content: row.try_get("content").map_err(decode())?,
        created_at: row.try_get("created_at").map_err(decode())?,
        seq: row.try_get("seq").map_err(decode())?,
        read_by,
    })
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn find_direct(&self, key: &DirectKey) -> AppResult<Option<Conversation>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(map_sqlx("Failed to acquire connection"))?;
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.direct_key = $1"
        ))
        .bind(key.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx("Failed to find direct conversation"))?;

        match row {
            Some(row) => Ok(assemble(&mut *conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_direct(
        &self,
        key: &DirectKey,
        conversation: Conversation,
    ) -> AppResult<Conversation> {
        self.insert_conversation(Some(key), conversation).await
    }

    async fn insert_group(&self, conversation: Conversation) -> AppResult<Conversation> {
        self.insert_conversation(None, conversation).await
    }

    async fn get(&self, id: ConversationId) -> AppResult<Option<Conversation>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(map_sqlx("Failed to acquire connection"))?;
        load_one(&mut *conn, id).await
    }

    async fn list_for_user(
        &self,
        user: UserId,
        page: PageRequest,
    ) -> AppResult<PageResponse<Conversation>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(map_sqlx("Failed to acquire connection"))?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM conversation_participants WHERE user_id = $1",
        )
        .bind(user)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx("Failed to count conversations"))?;

        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c \
             JOIN conversation_participants p ON p.conversation_id = c.id \
             WHERE p.user_id = $1 \
             ORDER BY COALESCE(c.last_message_at, c.created_at) DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(user)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *conn)
        .await
        .map_err(map_sqlx("Failed to list conversations"))?;

        let items = assemble(&mut *conn, rows).await?;
        Ok(PageResponse::new(items, page, total as u64))
    }

    async fn append_message(&self, mut message: Message) -> AppResult<(Message, Conversation)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(map_sqlx("Failed to begin transaction"))?;

        let locked: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
            "SELECT last_message_at FROM conversations WHERE id = $1 FOR UPDATE",
        )
        .bind(message.conversation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx("Failed to lock conversation"))?;
        let Some(last_message_at) = locked else {
            return Err(AppError::not_found(format!(
                "Conversation {} not found",
                message.conversation_id
            )));
        };
        if let Some(last) = last_message_at {
            message.created_at = message.created_at.max(last);
        }

        message.seq = sqlx::query_scalar(
            "INSERT INTO messages (id, conversation_id, sender_id, content, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING seq",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx("Failed to insert message"))?;

        sqlx::query(
            "UPDATE conversations SET last_message_id = $2, last_message_at = $3, \
             last_message_preview = $4, updated_at = $3 WHERE id = $1",
        )
        .bind(message.conversation_id)
        .bind(message.id)
        .bind(message.created_at)
        .bind(preview(&message.content))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx("Failed to update conversation"))?;

        let bumped = sqlx::query(
            "UPDATE conversation_participants SET unread_count = unread_count + 1 \
             WHERE conversation_id = $1 AND user_id <> $2",
        )
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx("Failed to increment unread counters"))?;

        let conversation = load_one(&mut *tx, message.conversation_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Conversation {} not found", message.conversation_id))
            })?;

        tx.commit()
            .await
            .map_err(map_sqlx("Failed to commit message"))?;

        debug!(
            conversation_id = %message.conversation_id,
            seq = message.seq,
            counters = bumped.rows_affected(),
            "Message appended"
        );
        Ok((message, conversation))
    }

    async fn mark_read(
        &self,
        id: ConversationId,
        user: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<(Conversation, u64)>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(map_sqlx("Failed to begin transaction"))?;

        // Same row lock as the append path: no message can land between
        // the counter reset and the receipts.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM conversations WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx("Failed to lock conversation"))?;
        if locked.is_none() {
            return Ok(None);
        }

        let updated = sqlx::query(
            "UPDATE conversation_participants SET unread_count = 0 \
             WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx("Failed to reset unread counter"))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let high_water: Option<i64> =
            sqlx::query_scalar("SELECT MAX(seq) FROM messages WHERE conversation_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx("Failed to read message high-water mark"))?;

        let receipts = match high_water {
            Some(upto) => sqlx::query(
                "INSERT INTO message_reads (message_id, user_id, read_at) \
                 SELECT m.id, $2, $3 FROM messages m \
                 WHERE m.conversation_id = $1 AND m.sender_id <> $2 AND m.seq <= $4 \
                 ON CONFLICT (message_id, user_id) DO NOTHING",
            )
            .bind(id)
            .bind(user)
            .bind(at)
            .bind(upto)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx("Failed to record read receipts"))?
            .rows_affected(),
            None => 0,
        };

        sqlx::query("UPDATE conversations SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx("Failed to touch conversation"))?;

        let conversation = load_one(&mut *tx, id).await?;
        tx.commit()
            .await
            .map_err(map_sqlx("Failed to commit conversation read"))?;
        Ok(conversation.map(|c| (c, receipts)))
    }

    async fn list_messages(
        &self,
        id: ConversationId,
        page: PageRequest,
    ) -> AppResult<PageResponse<Message>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(map_sqlx("Failed to acquire connection"))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx("Failed to count messages"))?;

        let rows = sqlx::query(
            "SELECT id, conversation_id, sender_id, content, created_at, seq FROM messages \
             WHERE conversation_id = $1 ORDER BY created_at DESC, seq DESC LIMIT $2 OFFSET $3",
        )
        .bind(id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *conn)
        .await
        .map_err(map_sqlx("Failed to list messages"))?;

        let ids: Vec<Uuid> = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id"))
            .collect::<Result<_, _>>()
            .map_err(map_sqlx("Failed to decode message id"))?;

        let receipt_rows = sqlx::query(
            "SELECT message_id, user_id, read_at FROM message_reads WHERE message_id = ANY($1) \
             ORDER BY read_at",
        )
        .bind(ids.as_slice())
        .fetch_all(&mut *conn)
        .await
        .map_err(map_sqlx("Failed to load read receipts"))?;

        let mut receipts: HashMap<Uuid, Vec<ReadReceipt>> = HashMap::new();
        for row in receipt_rows {
            let decode = || map_sqlx("Failed to decode read receipt");
            let message_id: Uuid = row.try_get("message_id").map_err(decode())?;
            receipts.entry(message_id).or_default().push(ReadReceipt {
                user_id: row.try_get("user_id").map_err(decode())?,
                read_at: row.try_get("read_at").map_err(decode())?,
            });
        }

        let items = rows
            .iter()
            .zip(ids)
            .map(|(row, id)| message_from_row(row, receipts.remove(&id).unwrap_or_default()))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PageResponse::new(items, page, total as u64))
    }
}
