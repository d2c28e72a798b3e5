//! Metrics collector for the notification dispatch service
//!
//! Counters and histograms are reported through the `metrics` facade; the
//! binary installs a Prometheus recorder when metrics are enabled, otherwise
//! every call here is a no-op.

use metrics::{counter, histogram, Counter, Histogram};
use tracing::debug;

pub struct MetricsCollector {
    tick_duration: Histogram,
    ticks_skipped_total: Counter,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            tick_duration: histogram!("notifier_tick_duration_seconds"),
            ticks_skipped_total: counter!("notifier_ticks_skipped_total"),
        }
    }

    /// Record a successful delivery of `notification_count` notifications
    pub fn record_dispatch(&self, handler: &str, notification_count: usize) {
        counter!("notifier_dispatch_total", "handler" => handler.to_string()).increment(1);
        counter!(
            "notifier_notifications_delivered_total",
            "handler" => handler.to_string()
        )
        .increment(notification_count as u64);
    }

    /// Record a failed dispatch; `reason` is one of "rejected", "error", "timeout", "lookup"
    pub fn record_dispatch_failure(&self, handler: &str, reason: &str) {
        counter!(
            "notifier_dispatch_failures_total",
            "handler" => handler.to_string(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    pub fn record_tick_duration(&self, duration_seconds: f64) {
        self.tick_duration.record(duration_seconds);
        debug!(duration_seconds = duration_seconds, "Tick duration recorded");
    }

    /// A tick was skipped because the previous one was still running
    pub fn record_tick_skipped(&self) {
        self.ticks_skipped_total.increment(1);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
