use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use notifier_core::{AppConfig, NotificationRepository, SubscriptionRepository};
use notifier_dispatcher::{
    run_dispatch_loop, HandlerRegistry, NotificationController, SubscriptionController,
    SubscriptionProcessor, TickSummary,
};
use notifier_handlers::HandlerFactory;
use notifier_infrastructure::{
    DatabaseManager, MetricsCollector, SqliteNotificationRepository, SqliteSubscriptionRepository,
};
use tokio::sync::broadcast;
use tracing::info;

/// 主应用程序
///
/// 负责组装存储、处理器注册表和订阅处理器，并驱动调度循环。
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    registry: Arc<HandlerRegistry>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
    processor: Arc<SubscriptionProcessor>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化通知订阅分发服务");

        let database = DatabaseManager::new(&config.database)
            .await
            .context("连接数据库失败")?;
        database.migrate().await.context("执行数据库迁移失败")?;
        database
            .health_check()
            .await
            .context("数据库健康检查失败")?;

        if config.observability.metrics_enabled {
            install_metrics_exporter(&config.observability.metrics_bind_address)?;
        }

        let subscription_repo: Arc<dyn SubscriptionRepository> =
            Arc::new(SqliteSubscriptionRepository::new(database.pool().clone()));
        let notification_repo: Arc<dyn NotificationRepository> =
            Arc::new(SqliteNotificationRepository::new(database.pool().clone()));

        let registry = Arc::new(HandlerRegistry::new(HandlerFactory::from_config(
            &config.handlers,
        )));

        let processor = Arc::new(SubscriptionProcessor::new(
            Arc::clone(&registry),
            Arc::clone(&subscription_repo),
            Arc::clone(&notification_repo),
            Arc::new(MetricsCollector::new()),
            Duration::from_secs(config.dispatcher.delivery_timeout_seconds),
        ));

        Ok(Self {
            config,
            database,
            registry,
            subscription_repo,
            notification_repo,
            processor,
        })
    }

    pub fn processor(&self) -> &Arc<SubscriptionProcessor> {
        &self.processor
    }

    pub fn subscription_controller(&self) -> SubscriptionController {
        SubscriptionController::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.subscription_repo),
        )
    }

    pub fn notification_controller(&self) -> NotificationController {
        NotificationController::new(Arc::clone(&self.notification_repo))
    }

    /// 只执行一次调度周期
    pub async fn run_once(&self) -> TickSummary {
        self.processor.tick().await
    }

    /// 运行调度循环直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        if !self.config.dispatcher.enabled {
            info!("调度器已在配置中禁用，等待关闭信号");
            let mut shutdown_rx = shutdown_rx;
            let _ = shutdown_rx.recv().await;
            return Ok(());
        }

        let interval = Duration::from_secs(self.config.dispatcher.schedule_interval_seconds);
        run_dispatch_loop(Arc::clone(&self.processor), interval, shutdown_rx).await;

        info!("调度服务已停止");
        Ok(())
    }

    pub async fn close(&self) {
        self.database.close().await;
    }
}

fn install_metrics_exporter(bind_address: &str) -> Result<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("无效的指标监听地址: {bind_address}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("安装Prometheus指标导出器失败")?;

    info!("Prometheus指标导出器监听于 {}", addr);
    Ok(())
}
