//! SQLite 仓储共用的行映射工具
//!
//! 时间戳以毫秒级 Unix 时间 (INTEGER) 存储，订阅属性以 JSON 对象字符串 (TEXT) 存储。

use chrono::{DateTime, TimeZone, Utc};
use notifier_core::{
    Notification, NotifierError, NotifierResult, Subscription, SubscriptionProperties,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub struct MappingHelpers;

impl MappingHelpers {
    pub fn to_millis(at: DateTime<Utc>) -> i64 {
        at.timestamp_millis()
    }

    pub fn opt_to_millis(at: Option<DateTime<Utc>>) -> Option<i64> {
        at.map(Self::to_millis)
    }

    pub fn from_millis(millis: i64) -> NotifierResult<DateTime<Utc>> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| NotifierError::DatabaseOperation(format!("无效的时间戳: {millis}")))
    }

    pub fn opt_from_millis(millis: Option<i64>) -> NotifierResult<Option<DateTime<Utc>>> {
        millis.map(Self::from_millis).transpose()
    }

    pub fn row_to_notification(row: &SqliteRow) -> NotifierResult<Notification> {
        Ok(Notification {
            id: row.try_get("id")?,
            severity: row.try_get("severity")?,
            recipient_id: row.try_get("recipient_id")?,
            content: row.try_get("content")?,
            created_at: Self::from_millis(row.try_get("created_at")?)?,
            expires_at: Self::opt_from_millis(row.try_get("expires_at")?)?,
            sender_type: row.try_get("sender_type")?,
            sender_id: row.try_get("sender_id")?,
            recognized: row.try_get("recognized")?,
        })
    }

    pub fn row_to_subscription(row: &SqliteRow) -> NotifierResult<Subscription> {
        let properties: String = row.try_get("properties")?;

        Ok(Subscription {
            id: row.try_get("id")?,
            subscription_name: row.try_get("subscription_name")?,
            recipient_id: row.try_get("recipient_id")?,
            properties: SubscriptionProperties::from_json(&properties)?,
            frequency: row.try_get("frequency")?,
            fired_last: Self::opt_from_millis(row.try_get("fired_last")?)?,
            fires_next: Self::opt_from_millis(row.try_get("fires_next")?)?,
            disabled: row.try_get("disabled")?,
            created_at: Self::from_millis(row.try_get("created_at")?)?,
        })
    }
}
