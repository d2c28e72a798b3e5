use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::processor::SubscriptionProcessor;

/// 按固定间隔运行调度周期，直到收到关闭信号
///
/// 第一个周期立即执行。周期内的工作不会被关闭信号中断，
/// 循环只在两个周期之间退出。落后的周期直接丢弃，不会补跑。
pub async fn run_dispatch_loop(
    processor: Arc<SubscriptionProcessor>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("订阅调度循环启动，间隔 {} 秒", interval.as_secs());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let summary = processor.tick().await;
                debug!(
                    "调度周期结束: 接收者 {}, 投递 {}, 失败 {}",
                    summary.recipients, summary.dispatched, summary.failed
                );
            }
            _ = shutdown_rx.recv() => {
                info!("订阅调度循环收到关闭信号");
                break;
            }
        }
    }
}
