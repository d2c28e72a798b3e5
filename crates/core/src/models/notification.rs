use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{NotifierError, NotifierResult};

/// 通知
///
/// 发给某个接收者的一条不可变消息。创建之后只有 `recognized`
/// （已读标记）允许被修改。
///
/// # 字段说明
///
/// - `id`: 由存储层生成的唯一标识
/// - `severity`: 严重级别（INFO/WARN/ERROR）
/// - `recipient_id`: 接收者标识，可以是用户ID或系统用户ID
/// - `content`: 通知正文
/// - `created_at`: 创建时间，订阅的时间窗口据此筛选
/// - `expires_at`: 可选的过期时间
/// - `sender_type`: 发送方类型（USER/SYSTEM）
/// - `sender_id`: 发送方标识
/// - `recognized`: 已读标记
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub severity: Severity,
    pub recipient_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub sender_type: SenderType,
    pub sender_id: String,
    #[serde(default)]
    pub recognized: bool,
}

impl Notification {
    /// 创建新通知，创建时间取当前时间（毫秒精度）
    pub fn new(
        recipient_id: impl Into<String>,
        content: impl Into<String>,
        severity: Severity,
        sender_type: SenderType,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            id: 0, // 将由存储层生成
            severity,
            recipient_id: recipient_id.into(),
            content: content.into(),
            created_at: Utc::now().trunc_subsecs(3),
            expires_at: None,
            sender_type,
            sender_id: sender_id.into(),
            recognized: false,
        }
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// 内容和接收者必须存在
    pub fn validate(&self) -> NotifierResult<()> {
        if self.recipient_id.trim().is_empty() {
            return Err(NotifierError::validation("通知接收者不能为空"));
        }
        if self.content.trim().is_empty() {
            return Err(NotifierError::validation("通知内容不能为空"));
        }
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// 通知严重级别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "ERROR")]
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = NotifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Severity::Info),
            "WARN" => Ok(Severity::Warn),
            "ERROR" => Ok(Severity::Error),
            _ => Err(NotifierError::InvalidEnumValue {
                kind: "severity",
                value: s.to_string(),
            }),
        }
    }
}

/// 发送方类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SenderType {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "SYSTEM")]
    System,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::User => "USER",
            SenderType::System => "SYSTEM",
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SenderType {
    type Err = NotifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(SenderType::User),
            "SYSTEM" => Ok(SenderType::System),
            _ => Err(NotifierError::InvalidEnumValue {
                kind: "sender_type",
                value: s.to_string(),
            }),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for Severity {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Severity {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(s.parse::<Severity>()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Severity {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

impl sqlx::Type<sqlx::Sqlite> for SenderType {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for SenderType {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(s.parse::<SenderType>()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for SenderType {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

/// 通知过滤器
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub recipient_id: Option<String>,
    pub sender_type: Option<SenderType>,
    pub recognized: Option<bool>,
    /// 创建时间下界（含）
    pub created_from: Option<DateTime<Utc>>,
    /// 创建时间上界（不含）
    pub created_until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        if let Some(recipient_id) = &self.recipient_id {
            if &notification.recipient_id != recipient_id {
                return false;
            }
        }
        if let Some(sender_type) = self.sender_type {
            if notification.sender_type != sender_type {
                return false;
            }
        }
        if let Some(recognized) = self.recognized {
            if notification.recognized != recognized {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if notification.created_at < from {
                return false;
            }
        }
        if let Some(until) = self.created_until {
            if notification.created_at >= until {
                return false;
            }
        }
        true
    }
}
