//! 订阅处理器接口定义
//!
//! 订阅处理器是把一批通知投递给接收者的具体方式，例如发送邮件或写入日志文件。
//! 每个处理器以唯一名称标识，订阅通过 `subscription_name` 引用处理器。
//!
//! ## 生命周期
//!
//! 1. 启动时由处理器工厂按配置创建，注册到处理器注册表
//! 2. 第一次调度时调用 [`SubscriptionHandler::configure`]，失败的处理器在进程生命周期内被排除
//! 3. 每次到期调度调用 [`SubscriptionHandler::handle_notifications`]
//!
//! ## 实现示例
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use notifier_core::traits::SubscriptionHandler;
//!
//! pub struct ConsoleHandler;
//!
//! #[async_trait]
//! impl SubscriptionHandler for ConsoleHandler {
//!     fn name(&self) -> &str {
//!         "console"
//!     }
//!
//!     fn properties(&self) -> HandlerProperties {
//!         HandlerProperties::create("console")
//!     }
//!
//!     fn check_subscription(&self, _subscription: &Subscription) -> bool {
//!         true
//!     }
//!
//!     async fn configure(&self) -> bool {
//!         true
//!     }
//!
//!     async fn handle_notifications(
//!         &self,
//!         notifications: &[Notification],
//!         _properties: &SubscriptionProperties,
//!     ) -> NotifierResult<bool> {
//!         for notification in notifications {
//!             println!("{}", notification.content);
//!         }
//!         Ok(true)
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::models::{HandlerProperties, Notification, Subscription, SubscriptionProperties};
use crate::NotifierResult;

#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    /// 处理器的唯一名称
    fn name(&self) -> &str;

    /// 声明订阅需要提供的属性
    fn properties(&self) -> HandlerProperties;

    /// 校验订阅属性是否满足处理器要求
    fn check_subscription(&self, subscription: &Subscription) -> bool;

    /// 一次性的自我配置，返回 `false` 表示处理器不可用
    async fn configure(&self) -> bool;

    /// 投递一批通知
    ///
    /// 返回 `Ok(true)` 表示投递成功；`Ok(false)` 或错误都视为投递失败，
    /// 同一时间窗口会在下一个到期周期重试。
    async fn handle_notifications(
        &self,
        notifications: &[Notification],
        properties: &SubscriptionProperties,
    ) -> NotifierResult<bool>;
}
