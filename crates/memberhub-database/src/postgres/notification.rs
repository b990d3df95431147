//! PostgreSQL [`NotificationStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use memberhub_core::AppError;
use memberhub_core::result::AppResult;
use memberhub_core::types::{NotificationId, PageRequest, PageResponse, UserId};
use memberhub_entity::notification::{Notification, NotificationReference, ReferenceKind};

use super::error::map_sqlx;
use crate::traits::NotificationStore;

const COLUMNS: &str = "id, recipient_id, sender_id, kind, title, message, reference_kind, \
     reference_id, read_at, created_at";

/// Notification store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    /// Create a store over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn notification_from_row(row: &PgRow) -> AppResult<Notification> {
    let decode = || map_sqlx("Failed to decode notification");
    let kind: String = row.try_get("kind").map_err(decode())?;
    let kind = kind
        .parse()
        .map_err(|e: AppError| AppError::database(format!("Corrupt notification row: {}", e.message)))?;

    let reference_kind: Option<String> = row.try_get("reference_kind").map_err(decode())?;
    let reference_id: Option<Uuid> = row.try_get("reference_id").map_err(decode())?;
    let reference = match (reference_kind, reference_id) {
        (Some(kind), Some(id)) => {
            let kind: ReferenceKind = kind.parse().map_err(|e: AppError| {
                AppError::database(format!("Corrupt notification reference: {}", e.message))
            })?;
            Some(NotificationReference::from_parts(kind, id))
        }
        _ => None,
    };

    Ok(Notification::restore(
        row.try_get("id").map_err(decode())?,
        row.try_get("recipient_id").map_err(decode())?,
        row.try_get("sender_id").map_err(decode())?,
        kind,
        row.try_get("title").map_err(decode())?,
        row.try_get("message").map_err(decode())?,
        reference,
        row.try_get("read_at").map_err(decode())?,
        row.try_get("created_at").map_err(decode())?,
    ))
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, notification: Notification) -> AppResult<Notification> {
        sqlx::query(
            "INSERT INTO notifications (id, recipient_id, sender_id, kind, title, message, \
             reference_kind, reference_id, is_read, read_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(notification.id)
        .bind(notification.recipient_id)
        .bind(notification.sender_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.reference.map(|r| r.kind().as_str()))
        .bind(notification.reference.map(|r| r.id()))
        .bind(notification.is_read())
        .bind(notification.read_at())
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx("Failed to insert notification"))?;
        Ok(notification)
    }

    async fn get(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM notifications WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx("Failed to load notification"))?;
        row.as_ref().map(notification_from_row).transpose()
    }

    async fn list_for_recipient(
        &self,
        recipient: UserId,
        page: PageRequest,
        unread_only: bool,
    ) -> AppResult<PageResponse<Notification>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications \
             WHERE recipient_id = $1 AND ($2 = FALSE OR is_read = FALSE)",
        )
        .bind(recipient)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx("Failed to count notifications"))?;

        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE recipient_id = $1 AND ($2 = FALSE OR is_read = FALSE) \
             ORDER BY is_read ASC, created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(recipient)
        .bind(unread_only)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx("Failed to list notifications"))?;

        let items = rows
            .iter()
            .map(notification_from_row)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PageResponse::new(items, page, total as u64))
    }

    async fn count_unread(&self, recipient: UserId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx("Failed to count unread notifications"))?;
        Ok(count as u64)
    }

    async fn mark_read(
        &self,
        recipient: UserId,
        id: NotificationId,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $3 \
             WHERE id = $1 AND recipient_id = $2 AND is_read = FALSE",
        )
        .bind(id)
        .bind(recipient)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx("Failed to mark notification read"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient: UserId, at: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 \
             WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx("Failed to mark all notifications read"))?;
        Ok(result.rows_affected())
    }

    async fn purge(
        &self,
        read_before: DateTime<Utc>,
        unread_before: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications \
             WHERE (is_read = TRUE AND created_at < $1) \
                OR (is_read = FALSE AND created_at < $2)",
        )
        .bind(read_before)
        .bind(unread_before)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx("Failed to purge notifications"))?;
        Ok(result.rows_affected())
    }
}
