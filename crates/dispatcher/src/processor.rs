use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, SubsecRound, Utc};
use notifier_core::{NotificationRepository, NotifierError, Subscription, SubscriptionRepository};
use notifier_infrastructure::{DispatchTracer, MetricsCollector, StructuredLogger};
use tokio::sync::Mutex;
use tracing::{debug, Instrument};

use crate::accumulator::NotificationAccumulator;
use crate::registry::{EndorsedHandlers, HandlerRegistry};
use crate::reschedule;
use crate::selector::{DueSubscriptionSelector, RecipientBatch};

/// 投递失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// 处理器返回 `false`
    Rejected,
    /// 处理器返回错误
    Error(String),
    /// 投递超时
    Timeout { seconds: u64 },
    /// 查询通知失败
    Lookup(String),
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Rejected => "rejected",
            FailureReason::Error(_) => "error",
            FailureReason::Timeout { .. } => "timeout",
            FailureReason::Lookup(_) => "lookup",
        }
    }

    fn describe(&self) -> String {
        match self {
            FailureReason::Rejected => "处理器拒绝了本次投递".to_string(),
            FailureReason::Error(e) => format!("处理器返回错误: {e}"),
            FailureReason::Timeout { seconds } => {
                NotifierError::DeliveryTimeout { seconds: *seconds }.to_string()
            }
            FailureReason::Lookup(e) => format!("查询通知失败: {e}"),
        }
    }
}

/// 单个订阅在一次调度周期中的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dispatched { notification_count: usize },
    /// 窗口内没有通知，调度字段不变
    SkippedEmpty,
    /// 查询之后调度时间已被推迟
    SkippedNotDue,
    /// 订阅引用的处理器未被认可
    SkippedUnknownHandler,
    Failed(FailureReason),
}

/// 一次调度周期的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub recipients: usize,
    pub dispatched: usize,
    pub failed: usize,
    pub skipped_empty: usize,
    pub skipped_other: usize,
    /// 上一个周期仍在运行，本周期被跳过
    pub overlapped: bool,
}

impl TickSummary {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Dispatched { .. } => self.dispatched += 1,
            DispatchOutcome::SkippedEmpty => self.skipped_empty += 1,
            DispatchOutcome::SkippedNotDue | DispatchOutcome::SkippedUnknownHandler => {
                self.skipped_other += 1
            }
            DispatchOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// 订阅处理器
///
/// 每个调度周期：
///
/// 1. 认可处理器（只在第一次周期真正执行）
/// 2. 查询使用已认可处理器的到期订阅，按接收者分组
/// 3. 对每个订阅收集窗口内的通知并投递，成功后推进调度时间
/// 4. 每个接收者处理完后用一次 `save_all` 持久化其订阅
///
/// 单个订阅或接收者的失败只会被记录，不会中断本周期的其余工作。
pub struct SubscriptionProcessor {
    registry: Arc<HandlerRegistry>,
    selector: DueSubscriptionSelector,
    accumulator: NotificationAccumulator,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    metrics: Arc<MetricsCollector>,
    delivery_timeout: Duration,
    tick_guard: Mutex<()>,
}

impl SubscriptionProcessor {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
        metrics: Arc<MetricsCollector>,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            selector: DueSubscriptionSelector::new(Arc::clone(&subscription_repo)),
            accumulator: NotificationAccumulator::new(notification_repo),
            subscription_repo,
            metrics,
            delivery_timeout,
            tick_guard: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// 以当前时间（毫秒精度）执行一次调度周期
    pub async fn tick(&self) -> TickSummary {
        self.tick_at(Utc::now().trunc_subsecs(3)).await
    }

    /// 以给定的周期开始时间执行一次调度周期
    ///
    /// 前一个周期尚未结束时立即返回 `overlapped` 汇总，不做任何工作。
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickSummary {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            StructuredLogger::log_tick_overlapped();
            self.metrics.record_tick_skipped();
            return TickSummary {
                overlapped: true,
                ..Default::default()
            };
        };

        self.run_tick(now)
            .instrument(DispatchTracer::tick_span(now))
            .await
    }

    async fn run_tick(&self, now: DateTime<Utc>) -> TickSummary {
        let start_time = Instant::now();
        let mut summary = TickSummary::default();

        let endorsed = self.registry.endorse().await;
        if endorsed.is_empty() {
            self.registry.warn_no_handlers_once();
            return summary;
        }

        let batches = match self.selector.select(&endorsed.names(), now).await {
            Ok(batches) => batches,
            Err(e) => {
                StructuredLogger::log_system_error("dispatcher", "find_due_subscriptions", &e);
                return summary;
            }
        };

        for batch in batches {
            let span = DispatchTracer::recipient_span(&batch.recipient_id, batch.subscriptions.len());
            self.process_recipient(endorsed, batch, now, &mut summary)
                .instrument(span)
                .await;
        }

        let duration = start_time.elapsed();
        self.metrics.record_tick_duration(duration.as_secs_f64());
        StructuredLogger::log_tick_completed(
            summary.recipients,
            summary.dispatched,
            summary.failed,
            summary.skipped_empty,
            summary.skipped_other,
            duration.as_millis() as u64,
        );

        summary
    }

    async fn process_recipient(
        &self,
        endorsed: &EndorsedHandlers,
        mut batch: RecipientBatch,
        now: DateTime<Utc>,
        summary: &mut TickSummary,
    ) {
        summary.recipients += 1;

        for subscription in batch.subscriptions.iter_mut() {
            let span = DispatchTracer::dispatch_span(subscription.id, &subscription.subscription_name);
            let outcome = self
                .dispatch(endorsed, subscription, now)
                .instrument(span)
                .await;
            summary.record(&outcome);
        }

        if let Err(e) = self.subscription_repo.save_all(&batch.subscriptions).await {
            StructuredLogger::log_system_error("dispatcher", "save_subscriptions", &e);
        }
    }

    /// 处理单个订阅，只有投递成功才会修改订阅的调度字段
    pub async fn dispatch(
        &self,
        endorsed: &EndorsedHandlers,
        subscription: &mut Subscription,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        if !subscription.is_due(now) {
            debug!("订阅 {} 尚未到期，跳过", subscription.id);
            return DispatchOutcome::SkippedNotDue;
        }

        let Some(handler) = endorsed.get(&subscription.subscription_name) else {
            debug!(
                "订阅 {} 的处理器 {} 未被认可，跳过",
                subscription.id, subscription.subscription_name
            );
            return DispatchOutcome::SkippedUnknownHandler;
        };

        let notifications = match self.accumulator.collect(subscription, now).await {
            Ok(notifications) => notifications,
            Err(e) => return self.fail(subscription, FailureReason::Lookup(e.to_string())),
        };

        if notifications.is_empty() {
            debug!("订阅 {} 的时间窗口内没有通知", subscription.id);
            return DispatchOutcome::SkippedEmpty;
        }

        let delivery = tokio::time::timeout(
            self.delivery_timeout,
            handler.handle_notifications(&notifications, &subscription.properties),
        )
        .await;

        match delivery {
            Ok(Ok(true)) => {
                reschedule::apply(subscription, now);
                self.metrics
                    .record_dispatch(&subscription.subscription_name, notifications.len());
                StructuredLogger::log_subscription_dispatched(
                    subscription.id,
                    &subscription.subscription_name,
                    &subscription.recipient_id,
                    notifications.len(),
                    subscription.fires_next,
                );
                DispatchOutcome::Dispatched {
                    notification_count: notifications.len(),
                }
            }
            Ok(Ok(false)) => self.fail(subscription, FailureReason::Rejected),
            Ok(Err(e)) => self.fail(subscription, FailureReason::Error(e.to_string())),
            Err(_) => self.fail(
                subscription,
                FailureReason::Timeout {
                    seconds: self.delivery_timeout.as_secs(),
                },
            ),
        }
    }

    fn fail(&self, subscription: &Subscription, reason: FailureReason) -> DispatchOutcome {
        self.metrics
            .record_dispatch_failure(&subscription.subscription_name, reason.as_str());
        StructuredLogger::log_dispatch_failed(
            subscription.id,
            &subscription.subscription_name,
            &subscription.recipient_id,
            &reason.describe(),
        );
        DispatchOutcome::Failed(reason)
    }
}
