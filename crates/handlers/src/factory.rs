use std::sync::Arc;

use notifier_core::config::HandlersConfig;
use notifier_core::SubscriptionHandler;
use tracing::info;

use crate::email::EmailHandler;
use crate::log_file::LogFileHandler;

/// 根据配置创建候选处理器列表
///
/// 这里只负责创建，处理器是否可用要等到第一次调度时由注册表调用
/// `configure` 决定。
pub struct HandlerFactory;

impl HandlerFactory {
    pub fn from_config(config: &HandlersConfig) -> Vec<Arc<dyn SubscriptionHandler>> {
        let mut handlers: Vec<Arc<dyn SubscriptionHandler>> = Vec::new();

        if config.email.enabled {
            info!(
                "Created email handler (smtp: {}:{})",
                config.email.smtp_host, config.email.smtp_port
            );
            handlers.push(Arc::new(EmailHandler::new(config.email.clone())));
        }

        if config.logfile.enabled {
            info!("Created logfile handler");
            handlers.push(Arc::new(LogFileHandler::new(&config.logfile)));
        }

        info!("共创建 {} 个订阅处理器", handlers.len());
        handlers
    }
}
