use std::sync::Arc;

use chrono::{DateTime, Utc};
use notifier_core::{Notification, NotificationRepository, NotifierResult, Subscription};

/// 收集订阅时间窗口内的通知
///
/// 窗口为左闭右开区间 `[window_start, tick_start)`，其中 `window_start`
/// 是订阅最近一次成功投递的时间。连续成功的窗口首尾相接，
/// 创建时间恰好等于调度时刻的通知归入下一个窗口，不会丢失。
pub struct NotificationAccumulator {
    notification_repo: Arc<dyn NotificationRepository>,
}

impl NotificationAccumulator {
    pub fn new(notification_repo: Arc<dyn NotificationRepository>) -> Self {
        Self { notification_repo }
    }

    pub async fn collect(
        &self,
        subscription: &Subscription,
        tick_start: DateTime<Utc>,
    ) -> NotifierResult<Vec<Notification>> {
        let since = subscription.window_start();
        if since >= tick_start {
            return Ok(Vec::new());
        }

        self.notification_repo
            .find_by_recipient_created_between(&subscription.recipient_id, since, tick_start)
            .await
    }
}
