use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifier_core::{
    Notification, NotificationFilter, NotificationRepository, NotifierError, NotifierResult,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, instrument};

use crate::database::mapping::MappingHelpers;

const NOTIFICATION_COLUMNS: &str = "id, severity, recipient_id, content, created_at, expires_at, sender_type, sender_id, recognized";

pub struct SqliteNotificationRepository {
    pool: SqlitePool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    #[instrument(skip(self, notification), fields(recipient_id = %notification.recipient_id))]
    async fn create(&self, notification: &Notification) -> NotifierResult<Notification> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO notifications (severity, recipient_id, content, created_at, expires_at, sender_type, sender_id, recognized)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(notification.severity)
        .bind(&notification.recipient_id)
        .bind(&notification.content)
        .bind(MappingHelpers::to_millis(notification.created_at))
        .bind(MappingHelpers::opt_to_millis(notification.expires_at))
        .bind(notification.sender_type)
        .bind(&notification.sender_id)
        .bind(notification.recognized)
        .fetch_one(&self.pool)
        .await?;

        let created = MappingHelpers::row_to_notification(&row)?;
        debug!("创建通知成功: ID {}, 接收者: {}", created.id, created.recipient_id);
        Ok(created)
    }

    #[instrument(skip(self), fields(notification_id = %id))]
    async fn get_by_id(&self, id: i64) -> NotifierResult<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(MappingHelpers::row_to_notification)
            .transpose()
    }

    #[instrument(skip(self, filter))]
    async fn list(&self, filter: &NotificationFilter) -> NotifierResult<Vec<Notification>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE 1 = 1"
        ));

        if let Some(recipient_id) = &filter.recipient_id {
            query
                .push(" AND recipient_id = ")
                .push_bind(recipient_id.clone());
        }
        if let Some(sender_type) = filter.sender_type {
            query.push(" AND sender_type = ").push_bind(sender_type);
        }
        if let Some(recognized) = filter.recognized {
            query.push(" AND recognized = ").push_bind(recognized);
        }
        if let Some(from) = filter.created_from {
            query
                .push(" AND created_at >= ")
                .push_bind(MappingHelpers::to_millis(from));
        }
        if let Some(until) = filter.created_until {
            query
                .push(" AND created_at < ")
                .push_bind(MappingHelpers::to_millis(until));
        }

        query.push(" ORDER BY created_at ASC, id ASC");

        // SQLite 只允许在 LIMIT 之后出现 OFFSET
        if filter.limit.is_some() || filter.offset.is_some() {
            query
                .push(" LIMIT ")
                .push_bind(filter.limit.unwrap_or(-1))
                .push(" OFFSET ")
                .push_bind(filter.offset.unwrap_or(0));
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(MappingHelpers::row_to_notification).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_recipient_created_between(
        &self,
        recipient_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> NotifierResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE recipient_id = ?1 AND created_at >= ?2 AND created_at < ?3
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(recipient_id)
        .bind(MappingHelpers::to_millis(since))
        .bind(MappingHelpers::to_millis(until))
        .fetch_all(&self.pool)
        .await?;

        debug!("接收者 {} 在时间窗口内有 {} 条通知", recipient_id, rows.len());
        rows.iter().map(MappingHelpers::row_to_notification).collect()
    }

    #[instrument(skip(self), fields(notification_id = %id))]
    async fn mark_recognized(&self, id: i64, recognized: bool) -> NotifierResult<()> {
        let result = sqlx::query("UPDATE notifications SET recognized = ?1 WHERE id = ?2")
            .bind(recognized)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NotifierError::NotificationNotFound { id });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(notification_id = %id))]
    async fn delete(&self, id: i64) -> NotifierResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("删除通知 {}: 影响 {} 行", id, result.rows_affected());
        Ok(())
    }
}
