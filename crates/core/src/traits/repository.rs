//! 数据仓储层接口定义
//!
//! 此模块定义了通知服务持久化层的抽象接口：
//! - 通知仓储接口 (NotificationRepository)
//! - 订阅仓储接口 (SubscriptionRepository)
//!
//! 调度引擎只依赖其中两个查询和一个批量写入：
//! `find_by_recipient_created_between`、`find_due` 和 `save_all`，
//! 其余方法服务于通知和订阅的管理接口。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use notifier_core::traits::SubscriptionRepository;
//!
//! async fn due_now(repo: &dyn SubscriptionRepository) -> NotifierResult<()> {
//!     let names = vec!["email".to_string(), "logfile".to_string()];
//!     let due = repo.find_due(&names, Utc::now()).await?;
//!     println!("到期订阅数量: {}", due.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Notification, NotificationFilter, Subscription, SubscriptionFilter};
use crate::NotifierResult;

/// 通知仓储接口
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// 创建通知，返回带有存储层生成ID的记录
    async fn create(&self, notification: &Notification) -> NotifierResult<Notification>;

    async fn get_by_id(&self, id: i64) -> NotifierResult<Option<Notification>>;

    /// 按过滤条件查询，结果按创建时间和ID升序
    async fn list(&self, filter: &NotificationFilter) -> NotifierResult<Vec<Notification>>;

    /// 查询某接收者在 `[since, until)` 时间窗口内创建的通知
    ///
    /// 结果按创建时间升序，创建时间相同时按ID升序。
    async fn find_by_recipient_created_between(
        &self,
        recipient_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> NotifierResult<Vec<Notification>>;

    /// 修改已读标记，这是通知创建后唯一允许的修改
    async fn mark_recognized(&self, id: i64, recognized: bool) -> NotifierResult<()>;

    async fn delete(&self, id: i64) -> NotifierResult<()>;
}

/// 订阅仓储接口
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> NotifierResult<Subscription>;

    async fn get_by_id(&self, id: i64) -> NotifierResult<Option<Subscription>>;

    async fn list(&self, filter: &SubscriptionFilter) -> NotifierResult<Vec<Subscription>>;

    /// 全量更新订阅
    async fn update(&self, subscription: &Subscription) -> NotifierResult<()>;

    async fn delete(&self, id: i64) -> NotifierResult<()>;

    /// 查询到期订阅
    ///
    /// 返回处理器名称属于 `handler_names` 且 `fires_next` 为空或不晚于 `now`
    /// 的订阅，按ID升序。禁用的订阅同样会返回，由调用方过滤。
    /// `handler_names` 为空时返回空列表。无法解析的单条记录会被记录并跳过，
    /// 不影响其他订阅。
    async fn find_due(
        &self,
        handler_names: &[String],
        now: DateTime<Utc>,
    ) -> NotifierResult<Vec<Subscription>>;

    /// 批量保存调度字段
    ///
    /// 只写入 `fired_last` 和 `fires_next`，其它字段保持存储中的值。
    async fn save_all(&self, subscriptions: &[Subscription]) -> NotifierResult<()>;
}
