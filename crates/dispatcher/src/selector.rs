use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use notifier_core::{NotifierResult, Subscription, SubscriptionRepository};
use tracing::debug;

/// 同一接收者的到期订阅
#[derive(Debug, Clone)]
pub struct RecipientBatch {
    pub recipient_id: String,
    pub subscriptions: Vec<Subscription>,
}

/// 到期订阅选择器
pub struct DueSubscriptionSelector {
    subscription_repo: Arc<dyn SubscriptionRepository>,
}

impl DueSubscriptionSelector {
    pub fn new(subscription_repo: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscription_repo }
    }

    /// 查询使用已认可处理器且在 `now` 到期的订阅，并按接收者分组
    ///
    /// 处理器名称为空时直接返回，不访问存储。
    pub async fn select(
        &self,
        handler_names: &[String],
        now: DateTime<Utc>,
    ) -> NotifierResult<Vec<RecipientBatch>> {
        if handler_names.is_empty() {
            return Ok(Vec::new());
        }

        let due = self
            .subscription_repo
            .find_due(handler_names, now)
            .await?;
        debug!("找到 {} 个到期订阅", due.len());

        Ok(group_by_recipient(due))
    }
}

/// 按接收者分组，去掉禁用的订阅
///
/// 分组顺序为接收者第一次出现的顺序，组内保持输入顺序。
pub fn group_by_recipient(subscriptions: Vec<Subscription>) -> Vec<RecipientBatch> {
    let mut batches: Vec<RecipientBatch> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for subscription in subscriptions {
        if subscription.is_disabled() {
            debug!("订阅 {} 已禁用，跳过", subscription.id);
            continue;
        }

        match positions.get(&subscription.recipient_id) {
            Some(&i) => batches[i].subscriptions.push(subscription),
            None => {
                positions.insert(subscription.recipient_id.clone(), batches.len());
                batches.push(RecipientBatch {
                    recipient_id: subscription.recipient_id.clone(),
                    subscriptions: vec![subscription],
                });
            }
        }
    }

    batches
}
