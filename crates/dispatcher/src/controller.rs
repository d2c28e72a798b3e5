use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tracing::{debug, info};

use notifier_core::{
    HandlerDescriptor, NewSubscription, Notification, NotificationFilter, NotificationRepository,
    NotifierError, NotifierResult, Subscription, SubscriptionFilter, SubscriptionPatch,
    SubscriptionRepository,
};

use crate::registry::HandlerRegistry;

/// 订阅管理
///
/// 创建和更新时根据已注册的处理器校验订阅，调度引擎本身从不创建或删除订阅。
pub struct SubscriptionController {
    registry: Arc<HandlerRegistry>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
}

impl SubscriptionController {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            registry,
            subscription_repo,
        }
    }

    fn validate(&self, subscription: &Subscription) -> NotifierResult<()> {
        let handler = self
            .registry
            .candidate(&subscription.subscription_name)
            .ok_or_else(|| NotifierError::UnknownHandler {
                name: subscription.subscription_name.clone(),
            })?;

        if subscription.recipient_id.trim().is_empty() {
            return Err(NotifierError::validation("订阅接收者不能为空"));
        }

        if !handler.check_subscription(subscription) {
            return Err(NotifierError::InvalidSubscriptionProperties(format!(
                "订阅属性不满足处理器 {} 的要求",
                subscription.subscription_name
            )));
        }

        Ok(())
    }

    /// 创建订阅，调度字段和创建时间都取当前时间
    pub async fn create(&self, request: NewSubscription) -> NotifierResult<Subscription> {
        let subscription = request.into_subscription(Utc::now().trunc_subsecs(3));
        self.validate(&subscription)?;

        let created = self.subscription_repo.create(&subscription).await?;
        info!(
            "创建订阅 {}: 处理器 {}, 接收者 {}, 频率 {}",
            created.id, created.subscription_name, created.recipient_id, created.frequency
        );
        Ok(created)
    }

    /// 部分更新订阅
    ///
    /// 修改处理器名称、接收者或属性后会重新校验。
    pub async fn update(&self, id: i64, patch: SubscriptionPatch) -> NotifierResult<Subscription> {
        let mut subscription = self.get(id).await?;

        let needs_validation = patch.subscription_name.is_some()
            || patch.recipient_id.is_some()
            || patch.properties.is_some();

        if let Some(subscription_name) = patch.subscription_name {
            subscription.subscription_name = subscription_name;
        }
        if let Some(recipient_id) = patch.recipient_id {
            subscription.recipient_id = recipient_id;
        }
        if let Some(properties) = patch.properties {
            subscription.properties = properties;
        }
        if let Some(frequency) = patch.frequency {
            subscription.frequency = frequency;
        }
        if let Some(disabled) = patch.disabled {
            subscription.disabled = disabled;
        }

        if needs_validation {
            self.validate(&subscription)?;
        }

        self.subscription_repo.update(&subscription).await?;
        debug!("更新订阅 {}", id);
        Ok(subscription)
    }

    pub async fn get(&self, id: i64) -> NotifierResult<Subscription> {
        self.subscription_repo
            .get_by_id(id)
            .await?
            .ok_or(NotifierError::SubscriptionNotFound { id })
    }

    pub async fn list(&self, filter: &SubscriptionFilter) -> NotifierResult<Vec<Subscription>> {
        self.subscription_repo.list(filter).await
    }

    /// 删除不存在的订阅不是错误
    pub async fn delete(&self, id: i64) -> NotifierResult<()> {
        self.subscription_repo.delete(id).await?;
        info!("删除订阅 {}", id);
        Ok(())
    }

    pub fn handler_descriptors(&self) -> Vec<HandlerDescriptor> {
        self.registry.descriptors()
    }
}

/// 通知管理
pub struct NotificationController {
    notification_repo: Arc<dyn NotificationRepository>,
}

impl NotificationController {
    pub fn new(notification_repo: Arc<dyn NotificationRepository>) -> Self {
        Self { notification_repo }
    }

    /// 创建通知，创建时间取当前时间，已读标记重置为 false
    pub async fn create(&self, mut notification: Notification) -> NotifierResult<Notification> {
        notification.validate()?;
        notification.id = 0;
        notification.created_at = Utc::now().trunc_subsecs(3);
        notification.recognized = false;

        let created = self.notification_repo.create(&notification).await?;
        debug!(
            "创建通知 {}: 接收者 {}, 级别 {}",
            created.id, created.recipient_id, created.severity
        );
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> NotifierResult<Notification> {
        self.notification_repo
            .get_by_id(id)
            .await?
            .ok_or(NotifierError::NotificationNotFound { id })
    }

    pub async fn list(&self, filter: &NotificationFilter) -> NotifierResult<Vec<Notification>> {
        self.notification_repo.list(filter).await
    }

    pub async fn mark_recognized(&self, id: i64, recognized: bool) -> NotifierResult<()> {
        self.notification_repo.mark_recognized(id, recognized).await
    }

    pub async fn delete(&self, id: i64) -> NotifierResult<()> {
        self.notification_repo.delete(id).await
    }
}
