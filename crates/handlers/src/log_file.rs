//! 日志文件处理器
//!
//! 把通知按行追加到订阅指定的文件中，文件第一次创建时写入表头：
//!
//! ```text
//! severity;content;createdAt;senderType;senderId;expiresAt
//! ```

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use notifier_core::config::LogFileHandlerConfig;
use notifier_core::{
    HandlerProperties, Notification, NotifierError, NotifierResult, Subscription,
    SubscriptionHandler, SubscriptionProperties,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, trace};

pub const LOGFILE_HANDLER_NAME: &str = "logfile";
pub const FILENAME_KEY: &str = "filename";

const HEADER: &str = "severity;content;createdAt;senderType;senderId;expiresAt\n";

pub struct LogFileHandler {
    base_directory: Option<PathBuf>,
}

impl LogFileHandler {
    pub fn new(config: &LogFileHandlerConfig) -> Self {
        Self {
            base_directory: config.base_directory.as_ref().map(PathBuf::from),
        }
    }

    /// 解析目标文件路径
    ///
    /// 配置了基础目录时，相对路径基于该目录解析，且结果不得离开该目录。
    fn resolve_path(&self, filename: &str) -> NotifierResult<PathBuf> {
        if filename.trim().is_empty() {
            return Err(NotifierError::InvalidSubscriptionProperties(format!(
                "{FILENAME_KEY} 不能为空"
            )));
        }

        let path = Path::new(filename);
        let Some(base) = &self.base_directory else {
            return Ok(path.to_path_buf());
        };

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(NotifierError::InvalidSubscriptionProperties(format!(
                "文件路径不能包含 '..': {filename}"
            )));
        }

        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };

        if !resolved.starts_with(base) {
            return Err(NotifierError::InvalidSubscriptionProperties(format!(
                "文件路径不在允许的目录 {} 中: {filename}",
                base.display()
            )));
        }
        Ok(resolved)
    }

    fn format_line(notification: &Notification) -> String {
        format!(
            "{};{};{};{};{};{}\n",
            notification.severity,
            sanitize(&notification.content),
            format_time(notification.created_at),
            notification.sender_type,
            sanitize(&notification.sender_id),
            notification
                .expires_at
                .map(format_time)
                .unwrap_or_default()
        )
    }

    async fn append(&self, path: &Path, notifications: &[Notification]) -> NotifierResult<()> {
        let is_new = !tokio::fs::try_exists(path).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        if is_new {
            trace!("创建通知文件: {}", path.display());
            file.write_all(HEADER.as_bytes()).await?;
        }

        let lines: String = notifications.iter().map(Self::format_line).collect();
        file.write_all(lines.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 一条通知占一行
fn sanitize(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

#[async_trait]
impl SubscriptionHandler for LogFileHandler {
    fn name(&self) -> &str {
        LOGFILE_HANDLER_NAME
    }

    fn properties(&self) -> HandlerProperties {
        HandlerProperties::create(LOGFILE_HANDLER_NAME)
            .add_property(FILENAME_KEY, "The local filename the notifications are written to.")
    }

    fn check_subscription(&self, subscription: &Subscription) -> bool {
        match subscription.properties.get(FILENAME_KEY) {
            Some(filename) => self.resolve_path(filename).is_ok(),
            None => false,
        }
    }

    async fn configure(&self) -> bool {
        match &self.base_directory {
            Some(base) => match tokio::fs::create_dir_all(base).await {
                Ok(()) => true,
                Err(e) => {
                    error!("无法创建通知文件目录 {}: {}", base.display(), e);
                    false
                }
            },
            None => true,
        }
    }

    async fn handle_notifications(
        &self,
        notifications: &[Notification],
        properties: &SubscriptionProperties,
    ) -> NotifierResult<bool> {
        properties.require(&[FILENAME_KEY])?;
        let filename = properties.get(FILENAME_KEY).unwrap_or_default();
        let path = self.resolve_path(filename)?;

        if let Err(e) = self.append(&path, notifications).await {
            error!("写入通知文件 {} 失败: {}", path.display(), e);
            return Err(e);
        }

        debug!("已写入 {} 条通知到 {}", notifications.len(), path.display());
        Ok(true)
    }
}
