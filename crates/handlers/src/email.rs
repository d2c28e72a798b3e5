//! 邮件处理器
//!
//! 通过SMTP把一批通知汇总成一封邮件发送给订阅中配置的地址。
//! `details` 属性决定正文内容：`FULL` 列出每条通知，`SHORT` 只给出数量。

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use notifier_core::config::EmailHandlerConfig;
use notifier_core::{
    HandlerProperties, Notification, NotifierError, NotifierResult, Subscription,
    SubscriptionHandler, SubscriptionProperties,
};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

pub const EMAIL_HANDLER_NAME: &str = "email";
pub const EMAIL_KEY: &str = "email";
pub const DETAILS_KEY: &str = "details";

/// 邮件正文的详细程度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Details {
    Full,
    Short,
}

impl FromStr for Details {
    type Err = NotifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL" => Ok(Details::Full),
            "SHORT" => Ok(Details::Short),
            _ => Err(NotifierError::InvalidEnumValue {
                kind: "details",
                value: s.to_string(),
            }),
        }
    }
}

/// 邮件发送接口
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: Message) -> NotifierResult<()>;

    /// 测试与邮件服务器的连接
    async fn test_connection(&self) -> NotifierResult<bool>;
}

/// 基于 lettre 异步SMTP传输的发送实现
pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailSender {
    pub fn new(config: &EmailHandlerConfig) -> NotifierResult<Self> {
        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host).map_err(
                |e| NotifierError::config_error(format!("SMTP中继配置错误: {e}")),
            )?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };
        builder = builder.port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, message: Message) -> NotifierResult<()> {
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| NotifierError::delivery(format!("SMTP发送失败: {e}")))
    }

    async fn test_connection(&self) -> NotifierResult<bool> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| NotifierError::delivery(format!("SMTP连接测试失败: {e}")))
    }
}

pub struct EmailHandler {
    config: EmailHandlerConfig,
    sender: OnceCell<Arc<dyn MailSender>>,
}

impl EmailHandler {
    /// SMTP传输在 `configure` 时才建立
    pub fn new(config: EmailHandlerConfig) -> Self {
        Self {
            config,
            sender: OnceCell::new(),
        }
    }

    /// 使用给定的发送实现，`configure` 不再创建SMTP传输
    pub fn with_sender(config: EmailHandlerConfig, sender: Arc<dyn MailSender>) -> Self {
        Self {
            config,
            sender: OnceCell::new_with(Some(sender)),
        }
    }

    fn compose_body(details: Details, notifications: &[Notification]) -> String {
        let mut body = format!(
            "You have {} new notification(s).\n",
            notifications.len()
        );

        if details == Details::Full {
            body.push('\n');
            for notification in notifications {
                let _ = writeln!(
                    body,
                    "[{}] {} {} {}: {}",
                    notification.severity,
                    notification
                        .created_at
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                    notification.sender_type,
                    notification.sender_id,
                    notification.content
                );
            }
        }
        body
    }

    fn build_message(
        &self,
        to: &str,
        details: Details,
        notifications: &[Notification],
    ) -> NotifierResult<Message> {
        let from: Mailbox = self
            .config
            .from_address
            .parse()
            .map_err(|e| NotifierError::config_error(format!("发件人地址无效: {e}")))?;
        let to: Mailbox = to.parse().map_err(|e| {
            NotifierError::InvalidSubscriptionProperties(format!("收件人地址无效: {e}"))
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.config.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(Self::compose_body(details, notifications))
            .map_err(|e| NotifierError::delivery(format!("构建邮件失败: {e}")))
    }
}

#[async_trait]
impl SubscriptionHandler for EmailHandler {
    fn name(&self) -> &str {
        EMAIL_HANDLER_NAME
    }

    fn properties(&self) -> HandlerProperties {
        HandlerProperties::create(EMAIL_HANDLER_NAME)
            .add_property(
                EMAIL_KEY,
                "The user email address the notifications are sent to.",
            )
            .add_property(
                DETAILS_KEY,
                "The detail level of the email content, which is either FULL (list of notifications) or SHORT (number of notifications).",
            )
    }

    fn check_subscription(&self, subscription: &Subscription) -> bool {
        let properties = &subscription.properties;
        let valid_address = properties
            .get(EMAIL_KEY)
            .is_some_and(|email| email.parse::<Address>().is_ok());
        let valid_details = properties
            .get(DETAILS_KEY)
            .is_some_and(|details| details.parse::<Details>().is_ok());
        valid_address && valid_details
    }

    async fn configure(&self) -> bool {
        if !self.config.enabled {
            warn!("邮件处理器未启用");
            return false;
        }
        if let Err(e) = self.config.validate() {
            error!("邮件处理器配置无效: {}", e);
            return false;
        }

        let sender = match self
            .sender
            .get_or_try_init(|| async {
                SmtpMailSender::new(&self.config).map(|s| Arc::new(s) as Arc<dyn MailSender>)
            })
            .await
        {
            Ok(sender) => sender,
            Err(e) => {
                error!("创建SMTP传输失败: {}", e);
                return false;
            }
        };

        if self.config.verify_connection {
            match sender.test_connection().await {
                Ok(true) => info!("SMTP服务器 {} 连接正常", self.config.smtp_host),
                Ok(false) => {
                    warn!("SMTP服务器 {} 拒绝连接", self.config.smtp_host);
                    return false;
                }
                Err(e) => {
                    warn!("{}", e);
                    return false;
                }
            }
        }
        true
    }

    async fn handle_notifications(
        &self,
        notifications: &[Notification],
        properties: &SubscriptionProperties,
    ) -> NotifierResult<bool> {
        properties.require(&[EMAIL_KEY, DETAILS_KEY])?;
        let to = properties.get(EMAIL_KEY).unwrap_or_default();
        let details: Details = properties.get(DETAILS_KEY).unwrap_or_default().parse()?;

        let sender = self
            .sender
            .get()
            .ok_or_else(|| NotifierError::Internal("邮件处理器尚未配置".to_string()))?;

        let message = self.build_message(to, details, notifications)?;
        sender.send(message).await?;

        debug!("已发送 {} 条通知到 {}", notifications.len(), to);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use notifier_core::{SenderType, Severity};
    use notifier_testing_utils::{NotificationBuilder, SubscriptionBuilder};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<Message>>,
        reachable: bool,
    }

    #[async_trait]
    impl MailSender for RecordingSender {
        async fn send(&self, message: Message) -> NotifierResult<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn test_connection(&self) -> NotifierResult<bool> {
            Ok(self.reachable)
        }
    }

    fn enabled_config() -> EmailHandlerConfig {
        EmailHandlerConfig {
            enabled: true,
            from_address: "notifier@example.org".to_string(),
            ..Default::default()
        }
    }

    fn notifications() -> Vec<Notification> {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap();
        vec![
            NotificationBuilder::new()
                .with_recipient("alice")
                .with_severity(Severity::Warn)
                .with_content("quota at 90 percent")
                .with_sender(SenderType::System, "quota")
                .created_at(at)
                .build(),
            NotificationBuilder::new()
                .with_recipient("alice")
                .with_content("shared a dataset")
                .with_sender(SenderType::User, "bob")
                .created_at(at)
                .build(),
        ]
    }

    #[tokio::test]
    async fn test_full_details_lists_notifications() {
        let sender = Arc::new(RecordingSender {
            reachable: true,
            ..Default::default()
        });
        let handler = EmailHandler::with_sender(enabled_config(), sender.clone());
        assert!(handler.configure().await);

        let properties = SubscriptionProperties::new()
            .with(EMAIL_KEY, "alice@example.org")
            .with(DETAILS_KEY, "FULL");
        assert!(handler
            .handle_notifications(&notifications(), &properties)
            .await
            .unwrap());

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let recipients: Vec<String> = sent[0].envelope().to().iter().map(|a| a.to_string()).collect();
        assert_eq!(recipients, vec!["alice@example.org"]);

        let raw = String::from_utf8(sent[0].formatted()).unwrap();
        assert!(raw.contains("Subject: New Notifications from KITDM Instance"));
        assert!(raw.contains("You have 2 new notification(s)."));
        assert!(raw.contains("[WARN] 2024-06-01T07:30:00Z SYSTEM quota: quota at 90 percent"));
    }

    #[test]
    fn test_short_body_only_counts() {
        let body = EmailHandler::compose_body(Details::Short, &notifications());
        assert_eq!(body, "You have 2 new notification(s).\n");
    }

    #[tokio::test]
    async fn test_configure_fails_when_disabled_or_unreachable() {
        let disabled = EmailHandler::with_sender(
            EmailHandlerConfig::default(),
            Arc::new(RecordingSender::default()),
        );
        assert!(!disabled.configure().await);

        let unreachable =
            EmailHandler::with_sender(enabled_config(), Arc::new(RecordingSender::default()));
        assert!(!unreachable.configure().await);

        let mut unverified = enabled_config();
        unverified.verify_connection = false;
        let handler = EmailHandler::with_sender(unverified, Arc::new(RecordingSender::default()));
        assert!(handler.configure().await);
    }

    #[tokio::test]
    async fn test_invalid_recipient_address_is_an_error() {
        let handler = EmailHandler::with_sender(
            enabled_config(),
            Arc::new(RecordingSender::default()),
        );
        let properties = SubscriptionProperties::new()
            .with(EMAIL_KEY, "not-an-address")
            .with(DETAILS_KEY, "SHORT");

        let result = handler
            .handle_notifications(&notifications(), &properties)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_check_subscription() {
        let handler = EmailHandler::new(enabled_config());

        let valid = SubscriptionBuilder::new()
            .with_handler(EMAIL_HANDLER_NAME)
            .with_property(EMAIL_KEY, "alice@example.org")
            .with_property(DETAILS_KEY, "SHORT")
            .build();
        assert!(handler.check_subscription(&valid));

        let bad_details = SubscriptionBuilder::new()
            .with_property(EMAIL_KEY, "alice@example.org")
            .with_property(DETAILS_KEY, "VERBOSE")
            .build();
        assert!(!handler.check_subscription(&bad_details));

        let bad_address = SubscriptionBuilder::new()
            .with_property(EMAIL_KEY, "alice")
            .with_property(DETAILS_KEY, "FULL")
            .build();
        assert!(!handler.check_subscription(&bad_address));

        let missing = SubscriptionBuilder::new()
            .with_property(EMAIL_KEY, "alice@example.org")
            .build();
        assert!(!handler.check_subscription(&missing));
    }
}
